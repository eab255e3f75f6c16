use std::{fs, path::Path};

use anyhow::{bail, Context};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::{
        VideoCapture, VideoWriter, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT,
        CAP_PROP_FRAME_WIDTH,
    },
};

/// Decoded frames of a video file, in order. Size and frame rate are read once
/// when the file is opened.
pub struct VideoSource {
    capture: VideoCapture,
    fps: f64,
    frame_size: Size,
    frame_count: Option<u64>,
    frames_read: u64,
}

impl VideoSource {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_str().with_context(|| format!("Non UTF-8 video path {}", path.display()))?;

        let capture = VideoCapture::from_file(path_str, CAP_ANY)?;
        if !capture.is_opened()? {
            bail!("Failed to open video {}", path.display());
        }

        let fps = VideoCaptureTraitConst::get(&capture, CAP_PROP_FPS)?;
        let width = VideoCaptureTraitConst::get(&capture, CAP_PROP_FRAME_WIDTH)? as i32;
        let height = VideoCaptureTraitConst::get(&capture, CAP_PROP_FRAME_HEIGHT)? as i32;
        let frame_count = VideoCaptureTraitConst::get(&capture, CAP_PROP_FRAME_COUNT)?;

        if width <= 0 || height <= 0 {
            bail!("Video {} reports invalid frame size {width}x{height}", path.display());
        }
        if fps <= 0.0 {
            bail!("Video {} reports invalid frame rate {fps}", path.display());
        }

        log::info!("Opened {}: {width}x{height} @ {fps:.2} fps, {frame_count} frames", path.display());
        if frame_count <= 0.0 {
            log::warn!("Container doesn't report a frame count, progress will be shown without a total");
        }

        Ok(VideoSource {
            capture,
            fps,
            frame_size: Size::new(width, height),
            frame_count: (frame_count > 0.0).then_some(frame_count as u64),
            frames_read: 0,
        })
    }

    /// Next frame, or `None` at the end of the stream. A frame that doesn't
    /// match the declared size is treated as a broken stream.
    pub fn read_frame(&mut self) -> anyhow::Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !VideoCaptureTrait::read(&mut self.capture, &mut frame)? || frame.empty() {
            log::debug!("End of input after {} frames", self.frames_read);
            return Ok(None);
        }

        check_frame_size(self.frame_size, frame.size()?, self.frames_read)?;

        self.frames_read += 1;
        Ok(Some(frame))
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frame_size(&self) -> Size {
        self.frame_size
    }

    pub fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

// A decoded frame whose size differs from the stream header means the stream is broken
fn check_frame_size(expected: Size, got: Size, index: u64) -> anyhow::Result<()> {
    if got != expected {
        bail!(
            "Malformed frame {index}: got {}x{}, expected {}x{}",
            got.width,
            got.height,
            expected.width,
            expected.height
        );
    }

    Ok(())
}

/// Encoded output with a fixed frame size and rate. `.avi` files get MJPG,
/// everything else mp4v.
pub struct VideoSink {
    writer: VideoWriter,
    frame_size: Size,
    frames_written: u64,
}

impl VideoSink {
    pub fn create(path: impl AsRef<Path>, fps: f64, frame_size: Size) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let path_str = path.to_str().with_context(|| format!("Non UTF-8 video path {}", path.display()))?;

        let is_avi = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("avi"));
        let fourcc = if is_avi {
            VideoWriter::fourcc('M', 'J', 'P', 'G')?
        } else {
            VideoWriter::fourcc('m', 'p', '4', 'v')?
        };
        let writer = VideoWriter::new(path_str, fourcc, fps, frame_size, true)?;
        if !writer.is_opened()? {
            bail!("Failed to create video {}", path.display());
        }

        log::info!(
            "Writing {} at {}x{} @ {fps:.2} fps",
            path.display(),
            frame_size.width,
            frame_size.height
        );

        Ok(VideoSink {
            writer,
            frame_size,
            frames_written: 0,
        })
    }

    pub fn write_frame(&mut self, frame: &Mat) -> anyhow::Result<()> {
        let size = frame.size()?;
        if size != self.frame_size {
            bail!(
                "Refusing to write {}x{} frame into {}x{} video",
                size.width,
                size.height,
                self.frame_size.width,
                self.frame_size.height
            );
        }
        VideoWriterTrait::write(&mut self.writer, frame)?;
        self.frames_written += 1;

        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn finish(mut self) -> anyhow::Result<u64> {
        self.writer.release()?;
        Ok(self.frames_written)
    }
}
