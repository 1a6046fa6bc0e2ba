//! Command line parsing into a validated [`CaptureConfig`].

use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use clap::{Parser, ValueEnum};

use crate::{
    device::{HandTrackingConfig, MirrorMode, SimConfig},
    pipeline::{LoopSettings, SessionOptions},
    presentation::{SurfaceId, SurfaceLayout},
    types::{PixelFormat, StreamKind, StreamSpec},
};

const MAX_SIM_HANDS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Synthetic depth camera with simulated hands and gestures.
    Sim,
    /// Plain webcam; color stream only.
    Webcam,
}

/// Width, height and frame rate of one stream, written `WxH@FPS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamMode {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl StreamMode {
    fn spec(self, kind: StreamKind) -> StreamSpec {
        StreamSpec::new(kind, self.width, self.height, self.fps)
    }
}

pub fn parse_stream_mode(value: &str) -> Result<StreamMode> {
    let (size, fps) = value
        .split_once('@')
        .ok_or_else(|| anyhow!("expected WxH@FPS, got {value:?}"))?;
    let (width, height) = size
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WxH@FPS, got {value:?}"))?;
    let mode = StreamMode {
        width: width.trim().parse()?,
        height: height.trim().parse()?,
        fps: fps.trim().parse()?,
    };
    if mode.width == 0 || mode.height == 0 || mode.fps == 0 {
        bail!("stream mode {value:?} must have non-zero size and frame rate");
    }
    Ok(mode)
}

/// Depth camera capture with hand tracking overlays.
#[derive(Debug, Parser)]
#[command(name = "hand-capture", version, about)]
pub struct Cli {
    /// Camera backend to capture from.
    #[arg(long, value_enum, default_value_t = Backend::Sim)]
    pub backend: Backend,
    /// Color stream mode.
    #[arg(long, value_name = "WxH@FPS", default_value = "1920x1080@30", value_parser = parse_stream_mode)]
    pub color: StreamMode,
    /// Depth stream mode.
    #[arg(long, value_name = "WxH@FPS", default_value = "640x480@30", value_parser = parse_stream_mode)]
    pub depth: StreamMode,
    /// Infrared stream mode.
    #[arg(long, value_name = "WxH@FPS", default_value = "640x480@30", value_parser = parse_stream_mode)]
    pub ir: StreamMode,
    #[arg(long = "no-color", action = clap::ArgAction::SetTrue)]
    pub no_color: bool,
    #[arg(long = "no-depth", action = clap::ArgAction::SetTrue)]
    pub no_depth: bool,
    #[arg(long = "no-ir", action = clap::ArgAction::SetTrue)]
    pub no_ir: bool,
    /// Disable hand tracking, segmentation and gestures.
    #[arg(long = "no-hands", action = clap::ArgAction::SetTrue)]
    pub no_hands: bool,
    /// Disable horizontal mirroring of all streams.
    #[arg(long = "no-mirror", action = clap::ArgAction::SetTrue)]
    pub no_mirror: bool,
    /// Sleep between capture iterations.
    #[arg(long = "interval-ms", value_name = "MS", default_value_t = 30)]
    pub interval_ms: u64,
    /// Webcam index for the webcam backend.
    #[arg(long = "camera-index", value_name = "N", default_value_t = 0)]
    pub camera_index: u32,
    /// Number of simulated hands (0-2).
    #[arg(long = "sim-hands", value_name = "N", default_value_t = 1)]
    pub sim_hands: usize,
    /// Period of simulated gestures; 0 disables them.
    #[arg(long = "sim-gesture-ms", value_name = "MS", default_value_t = 1500)]
    pub sim_gesture_ms: u64,
    /// Debug logging unless RUST_LOG says otherwise.
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
}

#[derive(Clone, Debug)]
pub struct CaptureConfig {
    pub backend: Backend,
    pub streams: Vec<StreamSpec>,
    pub hands: bool,
    pub mirror: MirrorMode,
    pub interval: Duration,
    pub camera_index: u32,
    pub sim_hands: usize,
    pub sim_gesture_interval: Option<Duration>,
}

impl TryFrom<Cli> for CaptureConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let streams: Vec<StreamSpec> = [
            (StreamKind::Color, cli.color, cli.no_color),
            (StreamKind::Depth, cli.depth, cli.no_depth),
            (StreamKind::Ir, cli.ir, cli.no_ir),
        ]
        .into_iter()
        .filter(|(_, _, disabled)| !disabled)
        .map(|(kind, mode, _)| mode.spec(kind))
        .collect();

        if streams.is_empty() {
            bail!("at least one of the color, depth and infrared streams must be enabled");
        }

        let hands = !cli.no_hands;
        if hands && cli.no_depth {
            bail!("hand tracking needs the depth stream; pass --no-hands to disable it");
        }

        if cli.backend == Backend::Webcam && !cfg!(feature = "camera-nokhwa") {
            bail!("the webcam backend was not compiled in (feature camera-nokhwa)");
        }

        if cli.sim_hands > MAX_SIM_HANDS {
            bail!("--sim-hands must be between 0 and {MAX_SIM_HANDS}");
        }

        Ok(Self {
            backend: cli.backend,
            streams,
            hands,
            mirror: if cli.no_mirror {
                MirrorMode::Disabled
            } else {
                MirrorMode::Horizontal
            },
            interval: Duration::from_millis(cli.interval_ms),
            camera_index: cli.camera_index,
            sim_hands: cli.sim_hands,
            sim_gesture_interval: (cli.sim_gesture_ms > 0)
                .then(|| Duration::from_millis(cli.sim_gesture_ms)),
        })
    }
}

impl CaptureConfig {
    pub fn stream(&self, kind: StreamKind) -> Option<StreamSpec> {
        self.streams.iter().copied().find(|spec| spec.kind == kind)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            streams: self.streams.clone(),
            hands: self.hands.then(HandTrackingConfig::default),
            mirror: self.mirror,
        }
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            interval: self.interval,
        }
    }

    pub fn sim_config(&self) -> SimConfig {
        SimConfig {
            hands: self.sim_hands,
            gesture_interval: self.sim_gesture_interval,
            ..SimConfig::default()
        }
    }

    /// One surface per enabled stream, plus segmentation and skeleton
    /// surfaces at depth resolution when hands are tracked.
    pub fn surface_layouts(&self) -> Vec<SurfaceLayout> {
        let mut layouts: Vec<SurfaceLayout> = self
            .streams
            .iter()
            .map(|spec| {
                SurfaceLayout::new(
                    SurfaceId::for_stream(spec.kind),
                    spec.width,
                    spec.height,
                    spec.kind.target_format(),
                )
            })
            .collect();

        if let Some(depth) = self.stream(StreamKind::Depth).filter(|_| self.hands) {
            layouts.push(SurfaceLayout::new(
                SurfaceId::Segmentation,
                depth.width,
                depth.height,
                PixelFormat::Y8,
            ));
            layouts.push(SurfaceLayout::new(
                SurfaceId::Skeleton,
                depth.width,
                depth.height,
                PixelFormat::Rgb32,
            ));
        }
        layouts
    }
}
