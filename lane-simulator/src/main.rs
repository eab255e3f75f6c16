mod synthetic_road;

use std::path::PathBuf;

use clap::Parser;
use synthetic_road::{RoadSettings, SyntheticRoad};
use video_stream::VideoSink;

/// Writes a synthetic road clip with a lane change, for exercising lane-detector.
#[derive(Parser, Debug)]
#[command(name = "lane-simulator", version, about)]
struct Cli {
    /// Output video file
    output: PathBuf,

    #[arg(long, default_value_t = 300)]
    frames: u64,

    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Frame where the markings jump sideways
    #[arg(long, default_value_t = 150)]
    shift_at: u64,

    /// Size of the jump in pixels, negative moves left
    #[arg(long, default_value_t = 250, allow_hyphen_values = true)]
    shift: i32,

    /// Max random offset of the marking endpoints per frame
    #[arg(long, default_value_t = 3)]
    jitter: i32,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let settings = RoadSettings {
        shift_at: cli.shift_at,
        shift: cli.shift,
        jitter: cli.jitter,
        seed: cli.seed,
        ..RoadSettings::default()
    };
    let mut sink = VideoSink::create(&cli.output, cli.fps, settings.frame_size)?;
    let mut road = SyntheticRoad::new(settings)?;

    log::info!(
        "Generating {} frames, shift of {}px at frame {}",
        cli.frames,
        road.settings().shift,
        road.settings().shift_at
    );

    while road.frame_index() < cli.frames {
        let frame = road.next_frame()?;
        sink.write_frame(&frame)?;
    }

    let written = sink.finish()?;
    log::info!("Wrote {written} frames to {}", cli.output.display());

    Ok(())
}

fn setup_logging() {
    simple_log::quick!();
}
