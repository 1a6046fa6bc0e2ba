use crossbeam_channel::Sender;
use thiserror::Error;

use super::projection::ProjectionMapper;
use crate::{
    device::{DepthCamera, DeviceError, GestureCallback, HandOutput, HandTrackingConfig, MirrorMode},
    gesture,
    types::{GestureEvent, StreamKind, StreamSpec},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("camera initialization failed with status {status}")]
    Init { status: i32 },
    #[error("failed to {step}: {source}")]
    Configure {
        step: &'static str,
        #[source]
        source: DeviceError,
    },
}

fn configure(step: &'static str) -> impl FnOnce(DeviceError) -> SessionError {
    move |source| SessionError::Configure { step, source }
}

#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub streams: Vec<StreamSpec>,
    pub hands: Option<HandTrackingConfig>,
    pub mirror: MirrorMode,
}

/// Owns the device and every handle derived from it.
pub struct CameraSession {
    pub(super) camera: Box<dyn DepthCamera>,
    pub(super) streams: Vec<StreamSpec>,
    pub(super) hand_output: Option<Box<dyn HandOutput>>,
    pub(super) mapper: Option<ProjectionMapper>,
    closed: bool,
}

impl CameraSession {
    /// Enables streams and hand tracking, then starts the device. On failure
    /// everything configured so far is released before returning.
    pub fn open(
        camera: Box<dyn DepthCamera>,
        options: &SessionOptions,
        gestures: Sender<GestureEvent>,
    ) -> Result<Self, SessionError> {
        let mut session = Self {
            camera,
            streams: Vec::new(),
            hand_output: None,
            mapper: None,
            closed: false,
        };

        if let Err(err) = session.configure(options, gestures) {
            log::error!("failed to open {}: {err}", session.camera.name());
            session.close();
            return Err(err);
        }

        log::info!(
            "opened {} with {} stream(s), hand tracking {}",
            session.camera.name(),
            session.streams.len(),
            if session.has_hand_tracking() { "on" } else { "off" }
        );
        Ok(session)
    }

    fn configure(
        &mut self,
        options: &SessionOptions,
        gestures: Sender<GestureEvent>,
    ) -> Result<(), SessionError> {
        for spec in &options.streams {
            self.camera
                .enable_stream(*spec)
                .map_err(configure("enable stream"))?;
            log::info!(
                "enabled {} stream {}x{}@{}",
                spec.kind,
                spec.width,
                spec.height,
                spec.fps
            );
            self.streams.push(*spec);
        }

        if let Some(config) = options.hands {
            let on_gesture: GestureCallback =
                Box::new(move |name: &str| gesture::forward_gesture(&gestures, name));
            self.camera
                .enable_hand_tracking(config, on_gesture)
                .map_err(configure("enable hand tracking"))?;
            self.hand_output = Some(
                self.camera
                    .create_hand_output()
                    .map_err(configure("create hand output"))?,
            );
        }

        let status = self.camera.init();
        if status < 0 {
            return Err(SessionError::Init { status });
        }

        self.camera
            .set_mirror_mode(options.mirror)
            .map_err(configure("set mirror mode"))?;

        // Projected joints only land on the color view.
        if self.hand_output.is_some() && self.has_stream(StreamKind::Color) {
            let projection = self
                .camera
                .create_projection()
                .map_err(configure("create projection"))?;
            self.mapper = Some(ProjectionMapper::new(projection));
        }
        Ok(())
    }

    pub fn device_name(&self) -> &str {
        self.camera.name()
    }

    pub fn streams(&self) -> &[StreamSpec] {
        &self.streams
    }

    fn has_stream(&self, kind: StreamKind) -> bool {
        self.streams.iter().any(|spec| spec.kind == kind)
    }

    pub fn has_hand_tracking(&self) -> bool {
        self.hand_output.is_some()
    }

    /// Releases the projection, the hand output, then the device, in that order.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        drop(self.mapper.take());
        drop(self.hand_output.take());
        self.camera.close();
        self.camera.dispose_manager();
        self.camera.dispose_session();
        log::info!("closed {}", self.camera.name());
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.close();
    }
}
