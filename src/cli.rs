use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dub a single video into one or more target languages
    Dub {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Target languages (comma-separated); defaults to every
        /// supported language not detected in the source
        #[arg(short, long)]
        target_langs: Option<String>,

        /// Output directory for dubbed files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Source language; skips auto-detection
        #[arg(short, long)]
        source_lang: Option<String>,

        /// Keep the intermediate workspace for inspection
        #[arg(long)]
        keep_workspace: bool,

        /// Also produce one video carrying every audio track
        #[arg(long)]
        embed_tracks: bool,
    },

    /// Dub every video file in a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Target languages (comma-separated); defaults to every
        /// supported language not detected in the source
        #[arg(short, long)]
        target_langs: Option<String>,

        /// Output directory for dubbed files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Also produce one video per input carrying every audio track
        #[arg(long)]
        embed_tracks: bool,
    },

    /// Extract audio from a video file
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Transcribe a media file to a timestamped JSON transcript
    Transcribe {
        /// Input audio or video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output transcript file
        #[arg(short, long)]
        output: PathBuf,

        /// Source language hint
        #[arg(short, long)]
        language: Option<String>,
    },
}

/// Split a comma-separated language list into codes.
pub fn parse_language_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
