use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use hand_capture::{
    config::{Backend, CaptureConfig, Cli},
    device::{DepthCamera, SimulatedCamera},
    gesture::{self, GESTURE_NAMES, GestureDispatcher, GestureHandlers},
    pipeline::{self, CameraSession},
    presentation::{self, CanvasSurface, SurfaceId},
    types::GestureEvent,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let config = CaptureConfig::try_from(cli)?;
    log::info!(
        "starting {:?} backend with {} stream(s), hands {}",
        config.backend,
        config.streams.len(),
        if config.hands { "on" } else { "off" }
    );

    let (presenter, commands) = presentation::channel();
    let (gesture_tx, gesture_rx) = gesture::gesture_channel();

    let camera = open_backend(&config)?;
    let session = CameraSession::open(camera, &config.session_options(), gesture_tx)
        .context("failed to start camera session")?;

    let mut handlers = GestureHandlers::new();
    for name in GESTURE_NAMES {
        handlers.register(
            name,
            Box::new(move |event: &GestureEvent| log::info!("{name} ({:?} ago)", event.arrived.elapsed())),
        );
    }
    let dispatcher = gesture::spawn_dispatcher(
        GestureDispatcher::new(presenter.clone(), handlers),
        gesture_rx,
    );

    let capture = pipeline::start_capture(session, presenter, config.loop_settings());
    let stop = capture.stop_signal();
    ctrlc::set_handler(move || {
        log::info!("close requested");
        stop.request();
    })
    .context("failed to install ctrl-c handler")?;

    log::info!("capturing, press Ctrl+C to stop");
    let mut surface = CanvasSurface::new(&config.surface_layouts(), gesture::indicator_ids());
    let stats = presentation::run_presentation(&mut surface, &commands);

    capture.join();
    match dispatcher.join() {
        Ok(dispatcher) => log::info!(
            "gesture dispatcher saw {} transitions, last {:?}",
            dispatcher.transitions(),
            dispatcher.state().name()
        ),
        Err(_) => log::error!("gesture dispatcher panicked"),
    }

    for id in [SurfaceId::Color, SurfaceId::Depth, SurfaceId::Ir, SurfaceId::Skeleton] {
        let counters = surface.counters(id);
        log::info!(
            "{id:?}: {} replacements, {} markers, {} clears",
            counters.replacements,
            counters.markers,
            counters.clears
        );
    }
    log::info!(
        "presentation applied {} commands, label {:?}",
        stats.applied,
        surface.label()
    );
    Ok(())
}

fn open_backend(config: &CaptureConfig) -> Result<Box<dyn DepthCamera>> {
    match config.backend {
        Backend::Sim => Ok(Box::new(SimulatedCamera::new(config.sim_config()))),
        #[cfg(feature = "camera-nokhwa")]
        Backend::Webcam => Ok(Box::new(hand_capture::device::WebcamCamera::new(
            config.camera_index,
        ))),
        #[cfg(not(feature = "camera-nokhwa"))]
        Backend::Webcam => anyhow::bail!("the webcam backend was not compiled in"),
    }
}
