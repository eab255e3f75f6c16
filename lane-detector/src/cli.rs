use std::path::PathBuf;

use clap::Parser;

/// Detects and tracks lane lines in a road video and writes an annotated copy.
#[derive(Parser, Debug)]
#[command(name = "lane-detector", version, about)]
pub struct Cli {
    /// Input video file
    #[arg(required_unless_present = "dump_config")]
    pub input: Option<PathBuf>,

    /// Annotated output video file
    #[arg(required_unless_present = "dump_config")]
    pub output: Option<PathBuf>,

    /// YAML config, missing keys fall back to the defaults
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Stop after this many input frames
    #[arg(long, value_name = "N")]
    pub max_frames: Option<u64>,

    /// Show annotated frames while processing, ESC stops
    #[arg(long)]
    pub preview: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the effective config as YAML and exit
    #[arg(long)]
    pub dump_config: bool,
}
