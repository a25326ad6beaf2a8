use std::collections::HashSet;
use tracing::debug;

use crate::config::RoutingConfig;

/// How text reaches a target language from the detected source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Source and target are the same language; no translation needed.
    Identity,
    /// A direct translation capability exists for the pair.
    Direct,
    /// No direct model, but source->pivot and pivot->target both exist.
    /// Never more than one pivot hop.
    Pivot(String),
    /// No path; the caller skips this target language.
    Unavailable,
}

/// Static language capability graph, built once at startup and read-only
/// thereafter. Decisions depend only on this table; a model that turns
/// out to be unreachable at synthesis time is a synthesis failure, not a
/// routing failure.
pub struct LanguageGraph {
    pivot: String,
    direct: HashSet<(String, String)>,
    supported: HashSet<String>,
}

impl LanguageGraph {
    pub fn from_config(config: &RoutingConfig) -> Self {
        let mut direct = HashSet::new();
        for pair in &config.direct_pairs {
            if let Some((src, tgt)) = pair.split_once('-') {
                direct.insert((src.to_string(), tgt.to_string()));
            }
        }

        let supported: HashSet<String> = config
            .languages
            .iter()
            .map(|l| l.code.clone())
            .collect();

        Self {
            pivot: config.pivot_language.clone(),
            direct,
            supported,
        }
    }

    pub fn pivot_language(&self) -> &str {
        &self.pivot
    }

    fn has_direct(&self, source: &str, target: &str) -> bool {
        // Every supported source reaches the pivot through the ASR
        // engine's built-in translate task.
        if target == self.pivot && self.supported.contains(source) {
            return true;
        }
        self.direct.contains(&(source.to_string(), target.to_string()))
    }

    pub fn route(&self, source: &str, target: &str) -> RouteDecision {
        if source == target {
            return RouteDecision::Identity;
        }

        if !self.supported.contains(target) {
            debug!("Target language {} is not in the capability table", target);
            return RouteDecision::Unavailable;
        }

        if self.has_direct(source, target) {
            return RouteDecision::Direct;
        }

        if self.has_direct(source, &self.pivot) && self.has_direct(&self.pivot, target) {
            return RouteDecision::Pivot(self.pivot.clone());
        }

        RouteDecision::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn graph() -> LanguageGraph {
        LanguageGraph::from_config(&Config::default().routing)
    }

    #[test]
    fn test_identity_route() {
        assert_eq!(graph().route("en", "en"), RouteDecision::Identity);
        assert_eq!(graph().route("ml", "ml"), RouteDecision::Identity);
    }

    #[test]
    fn test_direct_to_pivot_via_asr() {
        // Any supported source translates into the pivot directly
        assert_eq!(graph().route("ml", "en"), RouteDecision::Direct);
        assert_eq!(graph().route("ta", "en"), RouteDecision::Direct);
    }

    #[test]
    fn test_direct_from_pivot() {
        assert_eq!(graph().route("en", "hi"), RouteDecision::Direct);
        assert_eq!(graph().route("en", "ta"), RouteDecision::Direct);
    }

    #[test]
    fn test_pivot_route_between_non_pivot_languages() {
        assert_eq!(graph().route("ml", "hi"), RouteDecision::Pivot("en".to_string()));
        assert_eq!(graph().route("ta", "ml"), RouteDecision::Pivot("en".to_string()));
    }

    #[test]
    fn test_unavailable_for_unknown_target() {
        assert_eq!(graph().route("en", "fr"), RouteDecision::Unavailable);
        assert_eq!(graph().route("ml", "zz"), RouteDecision::Unavailable);
    }

    #[test]
    fn test_routing_is_deterministic() {
        let g = graph();
        assert_eq!(g.route("ml", "hi"), g.route("ml", "hi"));
        assert_eq!(g.route("en", "ml"), g.route("en", "ml"));
    }
}
