//! Depth camera capabilities consumed by the capture pipeline.
//!
//! Backends implement [`DepthCamera`] plus the image, hand and projection
//! traits. The pipeline never touches backend types directly.

#[cfg(feature = "camera-nokhwa")]
mod decode;
pub mod sim;
#[cfg(feature = "camera-nokhwa")]
pub mod webcam;

use thiserror::Error;

use crate::types::{JointData, JointKind, PixelFormat, Point2, Point3, StreamKind, StreamSpec};

pub use sim::{DeviceEvent, DeviceLog, SimConfig, SimulatedCamera};
#[cfg(feature = "camera-nokhwa")]
pub use webcam::WebcamCamera;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device reported status {0}")]
    Status(i32),
    #[error("{0} stream is not supported by this device")]
    UnsupportedStream(StreamKind),
    #[error("{0} is not supported by this device")]
    Unsupported(&'static str),
    #[error("no frame is available")]
    NoFrame,
    #[error("image access failed for {0:?}")]
    Access(PixelFormat),
    #[error("image data is not mapped")]
    NoPlane,
    #[error("image buffer too small: got {got}, expected {expected}")]
    ShortBuffer { got: usize, expected: usize },
    #[error("hand {0} is not available")]
    NoHand(usize),
    #[error("joint {0:?} is not tracked")]
    JointNotTracked(JointKind),
    #[error("projection mapping failed")]
    Projection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirrorMode {
    Disabled,
    Horizontal,
}

/// Full-skeleton hand tracking options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandTrackingConfig {
    pub segmentation: bool,
    pub all_gestures: bool,
}

impl Default for HandTrackingConfig {
    fn default() -> Self {
        Self {
            segmentation: true,
            all_gestures: true,
        }
    }
}

/// Invoked by the hand module on its own thread with the fired gesture name.
pub type GestureCallback = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Mapped pixel data, valid only while image access is held.
#[derive(Clone, Copy, Debug)]
pub struct ImagePlane<'a> {
    pub pitch: usize,
    pub data: &'a [u8],
}

pub trait StreamImage {
    fn info(&self) -> ImageInfo;
    fn begin_access(&mut self, format: PixelFormat) -> Result<(), DeviceError>;
    fn plane(&self) -> Option<ImagePlane<'_>>;
    fn end_access(&mut self);
}

/// Read access window on a [`StreamImage`]; released on drop.
pub struct ImageAccess<'a> {
    image: &'a mut dyn StreamImage,
}

impl<'a> ImageAccess<'a> {
    pub fn acquire(image: &'a mut dyn StreamImage, format: PixelFormat) -> Result<Self, DeviceError> {
        image.begin_access(format)?;
        Ok(Self { image })
    }

    pub fn info(&self) -> ImageInfo {
        self.image.info()
    }

    pub fn plane(&self) -> Option<ImagePlane<'_>> {
        self.image.plane()
    }
}

impl Drop for ImageAccess<'_> {
    fn drop(&mut self) {
        self.image.end_access();
    }
}

pub trait TrackedHand {
    fn segmentation_image(&mut self) -> Result<&mut dyn StreamImage, DeviceError>;
    fn tracked_joint(&self, kind: JointKind) -> Result<JointData, DeviceError>;
}

pub trait HandOutput: Send {
    /// Refreshes hand data for the frame currently held.
    fn update(&mut self) -> Result<(), DeviceError>;
    fn hand_count(&self) -> usize;
    /// Hands ordered by tracking time, oldest first.
    fn hand_by_time(&mut self, index: usize) -> Result<&mut dyn TrackedHand, DeviceError>;
}

pub trait Projection: Send {
    fn map_depth_to_color(&self, depth: &[Point3], color: &mut [Point2]) -> Result<(), DeviceError>;
}

pub trait DepthCamera: Send {
    fn name(&self) -> &str;
    fn enable_stream(&mut self, spec: StreamSpec) -> Result<(), DeviceError>;
    fn enable_hand_tracking(
        &mut self,
        config: HandTrackingConfig,
        on_gesture: GestureCallback,
    ) -> Result<(), DeviceError>;
    /// Starts the pipeline; negative status codes are errors.
    fn init(&mut self) -> i32;
    fn set_mirror_mode(&mut self, mode: MirrorMode) -> Result<(), DeviceError>;
    fn create_hand_output(&mut self) -> Result<Box<dyn HandOutput>, DeviceError>;
    fn create_projection(&mut self) -> Result<Box<dyn Projection>, DeviceError>;
    /// Blocks until the next synchronized frame when `wait` is set.
    fn acquire_frame(&mut self, wait: bool) -> Result<(), DeviceError>;
    fn sample(&mut self, kind: StreamKind) -> Option<&mut dyn StreamImage>;
    fn release_frame(&mut self);
    fn close(&mut self);
    fn dispose_manager(&mut self);
    fn dispose_session(&mut self);
}

/// The single in-flight frame; releasing happens on drop.
pub struct FrameLease<'a> {
    camera: &'a mut dyn DepthCamera,
}

impl<'a> FrameLease<'a> {
    pub fn acquire(camera: &'a mut dyn DepthCamera, wait: bool) -> Result<Self, DeviceError> {
        camera.acquire_frame(wait)?;
        Ok(Self { camera })
    }

    pub fn sample(&mut self, kind: StreamKind) -> Option<&mut dyn StreamImage> {
        self.camera.sample(kind)
    }
}

impl Drop for FrameLease<'_> {
    fn drop(&mut self) {
        self.camera.release_frame();
    }
}
