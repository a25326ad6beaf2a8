//! Dubflow - Automated Video Dubbing Pipeline
//!
//! Main entry point. Wires configuration, logging, and the dubbing
//! pipeline behind a small set of subcommands.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dubflow::cli::{parse_language_list, Args, Commands};
use dubflow::config::Config;
use dubflow::media::AudioEngineFactory;
use dubflow::pipeline::{DubOptions, DubPipeline};
use dubflow::transcribe::TranscriberFactory;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Dub { input, target_langs, output_dir, source_lang, keep_workspace, embed_tracks } => {
            info!("Dubbing video file: {}", input.display());

            let options = DubOptions {
                target_languages: target_langs.as_deref().map(parse_language_list).unwrap_or_default(),
                source_language: source_lang,
                keep_workspace,
                embed_tracks,
            };
            let output_dir = output_dir.unwrap_or_else(|| std::path::PathBuf::from("."));

            let pipeline = DubPipeline::new(config)?;
            let manifest = pipeline.run(&input, &output_dir, &options).await?;
            println!(
                "Produced {} tracks for {} (manifest run {})",
                manifest.tracks.len(),
                input.display(),
                manifest.run_id
            );
        }
        Commands::Batch { input_dir, target_langs, output_dir, embed_tracks } => {
            info!("Dubbing directory: {}", input_dir.display());

            let options = DubOptions {
                target_languages: target_langs.as_deref().map(parse_language_list).unwrap_or_default(),
                source_language: None,
                keep_workspace: false,
                embed_tracks,
            };
            let output_dir = output_dir.unwrap_or_else(|| std::path::PathBuf::from("."));

            let pipeline = DubPipeline::new(config)?;
            let succeeded = pipeline.run_directory(&input_dir, &output_dir, &options).await?;
            println!("Dubbed {} video files", succeeded);
        }
        Commands::Extract { input, output } => {
            info!("Extracting audio from: {}", input.display());

            let engine = AudioEngineFactory::create_engine(config.media.clone());
            engine.check_availability()?;
            engine.extract_audio(&input, &output).await?;
            println!("Audio written to {}", output.display());
        }
        Commands::Transcribe { input, output, language } => {
            info!("Transcribing: {}", input.display());

            let transcriber = TranscriberFactory::create_default(config.transcriber.clone());
            let mut transcript = transcriber.transcribe(&input, language.as_deref()).await?;
            transcript.sanitize();

            let json = serde_json::to_string_pretty(&transcript)?;
            tokio::fs::write(&output, json).await?;
            println!(
                "Transcript ({}, {} segments) written to {}",
                transcript.language,
                transcript.segments.len(),
                output.display()
            );
        }
    }

    info!("Dubflow run completed");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let dubflow_dir = std::env::current_dir()?.join(".dubflow");
    let log_dir = dubflow_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "dubflow.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
