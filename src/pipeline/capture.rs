use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use super::{
    hands::HandExtractor,
    overlay::OverlayRenderer,
    session::CameraSession,
    stream_buffer,
};
use crate::{
    device::{DeviceError, FrameLease},
    presentation::{Presenter, SurfaceId},
    types::StreamKind,
};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(30);

/// Shared close request; set from any thread, observed by the capture loop.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LoopSettings {
    pub interval: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// What one iteration pushed to the presentation owner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub streams_updated: Vec<StreamKind>,
    pub hands: usize,
    pub mask: bool,
    pub color_markers: usize,
    pub skeleton_markers: usize,
}

/// Turns one held frame into surface commands.
pub struct FrameProcessor {
    presenter: Presenter,
    extractor: HandExtractor,
    overlay: OverlayRenderer,
}

impl FrameProcessor {
    pub fn new(presenter: Presenter) -> Self {
        Self {
            overlay: OverlayRenderer::new(presenter.clone()),
            extractor: HandExtractor::new(),
            presenter,
        }
    }

    /// Acquires a frame, publishes every stream and the hand overlays, then
    /// releases the frame. Individual stream failures only skip that stream.
    pub fn process(&mut self, session: &mut CameraSession) -> Result<FrameReport, DeviceError> {
        let CameraSession {
            camera,
            streams,
            hand_output,
            mapper,
            ..
        } = session;

        let mut report = FrameReport::default();
        let mut frame = FrameLease::acquire(camera.as_mut(), true)?;

        for spec in streams.iter() {
            let Some(image) = frame.sample(spec.kind) else {
                log::debug!("no {} sample in this frame", spec.kind);
                continue;
            };
            match stream_buffer::copy_out(image, spec.kind.target_format()) {
                Ok(buffer) => {
                    self.presenter
                        .replace_buffer(SurfaceId::for_stream(spec.kind), buffer);
                    report.streams_updated.push(spec.kind);
                }
                Err(err) => log::debug!("skipping {} stream: {err}", spec.kind),
            }
        }

        if let Some(output) = hand_output.as_mut() {
            match self.extractor.extract(output.as_mut()) {
                Ok(mut hands) => {
                    report.hands = hands.hands.len();
                    if let Some(mask) = hands.mask.take() {
                        report.mask = true;
                        self.presenter
                            .replace_buffer(SurfaceId::Segmentation, mask.into_buffer());
                    }
                    let counts = self.overlay.render(&hands, mapper.as_ref());
                    report.color_markers = counts.color_markers;
                    report.skeleton_markers = counts.skeleton_markers;
                }
                Err(err) => log::debug!("hand data unavailable: {err}"),
            }
        }

        drop(frame);
        Ok(report)
    }
}

#[derive(Debug)]
pub struct CaptureLoop {
    stop: StopSignal,
    handle: Option<thread::JoinHandle<()>>,
}

impl CaptureLoop {
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Waits for the worker to exit on its own.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("capture thread panicked");
            }
        }
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop.request();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Runs the frame loop on a worker thread. When the stop signal is observed
/// the worker closes the session and then asks the presentation owner to
/// shut down.
pub fn start_capture(session: CameraSession, presenter: Presenter, settings: LoopSettings) -> CaptureLoop {
    let stop = StopSignal::new();
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || run_capture(session, presenter, stop_flag, settings));

    CaptureLoop {
        stop,
        handle: Some(handle),
    }
}

fn run_capture(mut session: CameraSession, presenter: Presenter, stop: StopSignal, settings: LoopSettings) {
    log::info!(
        "capture loop started on {} every {:?}",
        session.device_name(),
        settings.interval
    );
    let mut processor = FrameProcessor::new(presenter.clone());
    let started = Instant::now();
    let mut iterations = 0u64;

    while !stop.is_requested() {
        match processor.process(&mut session) {
            Ok(report) => log::trace!("frame {iterations}: {report:?}"),
            Err(err) => log::warn!("frame acquisition failed: {err}"),
        }
        iterations += 1;
        thread::sleep(settings.interval);
    }

    log::info!(
        "capture loop stopping after {iterations} frames in {:?}",
        started.elapsed()
    );
    session.close();
    presenter.request_shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::{DeviceEvent, HandTrackingConfig, MirrorMode, SimConfig, SimulatedCamera},
        gesture,
        pipeline::session::SessionOptions,
        presentation::{self, SurfaceCommand},
        types::StreamSpec,
    };

    fn session(config: SimConfig, hands: bool) -> (CameraSession, crate::device::DeviceLog) {
        let camera = SimulatedCamera::new(SimConfig {
            frame_interval: Duration::ZERO,
            gesture_interval: None,
            record_events: true,
            ..config
        });
        let log = camera.log();
        let options = SessionOptions {
            streams: vec![
                StreamSpec::new(StreamKind::Color, 64, 48, 30),
                StreamSpec::new(StreamKind::Depth, 32, 24, 30),
                StreamSpec::new(StreamKind::Ir, 32, 24, 30),
            ],
            hands: hands.then(HandTrackingConfig::default),
            mirror: MirrorMode::Horizontal,
        };
        let (tx, _rx) = gesture::gesture_channel();
        let session = CameraSession::open(Box::new(camera), &options, tx).unwrap();
        (session, log)
    }

    #[test]
    fn frame_updates_every_stream() {
        let (mut session, _log) = session(SimConfig::default(), false);
        let (presenter, rx) = presentation::channel();
        let mut processor = FrameProcessor::new(presenter);

        let report = processor.process(&mut session).unwrap();
        assert_eq!(
            report.streams_updated,
            vec![StreamKind::Color, StreamKind::Depth, StreamKind::Ir]
        );
        let replaced = rx
            .try_iter()
            .filter(|command| matches!(command, SurfaceCommand::ReplaceBuffer { .. }))
            .count();
        assert_eq!(replaced, 3);
    }

    #[test]
    fn frames_are_released_before_the_next_acquire() {
        let (mut session, log) = session(SimConfig::default(), true);
        let (presenter, _rx) = presentation::channel();
        let mut processor = FrameProcessor::new(presenter);
        for _ in 0..3 {
            processor.process(&mut session).unwrap();
        }

        let frames: Vec<DeviceEvent> = log
            .snapshot()
            .into_iter()
            .filter(|event| {
                matches!(event, DeviceEvent::FrameAcquired(_) | DeviceEvent::FrameReleased(_))
            })
            .collect();
        assert_eq!(frames.len(), 6);
        for pair in frames.chunks(2) {
            assert!(matches!(pair[0], DeviceEvent::FrameAcquired(_)));
            assert!(matches!(pair[1], DeviceEvent::FrameReleased(_)));
        }
    }

    #[test]
    fn stop_closes_session_then_requests_shutdown() {
        let (session, log) = session(SimConfig::default(), true);
        let (presenter, rx) = presentation::channel();
        let capture = start_capture(
            session,
            presenter,
            LoopSettings {
                interval: Duration::from_millis(1),
            },
        );
        capture.stop_signal().request();
        capture.join();

        let commands: Vec<SurfaceCommand> = rx.try_iter().collect();
        let shutdowns = commands
            .iter()
            .filter(|command| **command == SurfaceCommand::Shutdown)
            .count();
        assert_eq!(shutdowns, 1);
        assert_eq!(commands.last(), Some(&SurfaceCommand::Shutdown));
        assert_eq!(log.snapshot().last(), Some(&DeviceEvent::SessionDisposed));
    }
}
