mod cli;

use std::time::Instant;

use clap::Parser;
use cli::Cli;
use lane_vision::{FrameResult, LaneConfig, LanePipeline};
use opencv::highgui::{imshow, wait_key};
use video_stream::{VideoSink, VideoSource};

const PROGRESS_EVERY: u64 = 100;
const PREVIEW_WINDOW: &str = "lane-detector";
const KEY_ESC: i32 = 27;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            LaneConfig::load(path)?
        }
        None => LaneConfig::default(),
    };

    if cli.dump_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let (Some(input), Some(output)) = (&cli.input, &cli.output) else {
        anyhow::bail!("INPUT and OUTPUT are required unless --dump-config is given");
    };

    let mut source = VideoSource::open(input)?;
    let mut sink = VideoSink::create(output, source.fps(), source.frame_size())?;
    let mut pipeline = LanePipeline::new(config)?;
    let batch_size = pipeline.config().pipeline.batch_size;

    log::info!("Starting lane detection");
    let started = Instant::now();
    let mut stopped_early = false;

    'frames: loop {
        let mut batch = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            if cli.max_frames.is_some_and(|max| source.frames_read() >= max) {
                break;
            }
            match source.read_frame()? {
                Some(frame) => batch.push(frame),
                None => break,
            }
        }
        if batch.is_empty() {
            break;
        }

        let results = if batch_size == 1 {
            vec![pipeline.process_frame(&batch[0])?]
        } else {
            pipeline.process_batch(batch)?
        };

        for result in results {
            sink.write_frame(&result.frame)?;

            if cli.preview && !show_preview(&result)? {
                log::info!("Preview closed, stopping");
                stopped_early = true;
                break 'frames;
            }

            let done = pipeline.frames_processed();
            if done % PROGRESS_EVERY == 0 {
                match source.frame_count() {
                    Some(total) => log::info!("Processed {done}/{total} frames"),
                    None => log::info!("Processed {done} frames"),
                }
            }
        }
    }

    let frames = sink.finish()?;
    let elapsed = started.elapsed().as_secs_f64();
    log::info!(
        "Done{}: {frames} frames, {} lane changes in {elapsed:.1}s ({:.1} fps)",
        if stopped_early { " (stopped early)" } else { "" },
        pipeline.lane_changes(),
        frames as f64 / elapsed.max(f64::EPSILON)
    );

    Ok(())
}

// false once the user asked to quit
fn show_preview(result: &FrameResult) -> anyhow::Result<bool> {
    imshow(PREVIEW_WINDOW, &result.frame)?;
    Ok(wait_key(1)? != KEY_ESC)
}

fn setup_logging(verbose: bool) {
    if verbose {
        simple_log::quick!("debug");
    } else {
        simple_log::quick!("info");
    }
}
