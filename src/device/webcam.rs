//! Plain UVC webcam backend.
//!
//! Offers the color stream only. Frames are grabbed, decoded, mirrored and
//! scaled on a dedicated thread that owns the `nokhwa` camera, then handed over
//! through a one-slot channel.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
};

use super::{
    DepthCamera, DeviceError, GestureCallback, HandOutput, HandTrackingConfig, ImageInfo,
    ImagePlane, MirrorMode, Projection, StreamImage, decode,
};
use crate::types::{PixelFormat, StreamKind, StreamSpec};

const STATUS_NO_STREAM: i32 = -101;
const STATUS_OPEN_FAILED: i32 = -102;
const STATUS_FRAME_HELD: i32 = -301;
const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

// Built-in cameras often reject YUYV even though it is reported.
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

fn requested_formats(spec: StreamSpec) -> [RequestedFormat<'static>; 4] {
    [
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new_from(
            spec.width,
            spec.height,
            FrameFormat::MJPEG,
            spec.fps,
        ))),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestResolution,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

fn build_camera(index: &CameraIndex, spec: StreamSpec) -> Result<Camera> {
    let mut last_err = None;

    for requested in requested_formats(spec) {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
}

struct Grabber {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    frames: Receiver<Vec<u8>>,
}

impl Grabber {
    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct GrabberLink {
    ready: Sender<Result<String, String>>,
    frames: Sender<Vec<u8>>,
    mirror: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

fn run_grabber(index: CameraIndex, spec: StreamSpec, link: GrabberLink) {
    let GrabberLink {
        ready,
        frames,
        mirror,
        stop,
    } = link;
    let mut camera = match build_camera(&index, spec) {
        Ok(camera) => camera,
        Err(err) => {
            let _ = ready.send(Err(format!("{err:?}")));
            return;
        }
    };
    let format = camera.camera_format();
    log::info!(
        "webcam streaming {}x{} {:?} at {} fps",
        format.width(),
        format.height(),
        format.format(),
        format.frame_rate()
    );
    let _ = ready.send(Ok(camera.info().human_name()));

    while !stop.load(Ordering::Relaxed) {
        let started = Instant::now();
        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(err) => {
                log::warn!("webcam frame read failed after {:?}: {err:?}", started.elapsed());
                continue;
            }
        };

        let resolution = buffer.resolution();
        let color = decode::decode_frame(
            buffer.source_frame_format(),
            buffer.buffer(),
            resolution.width_x,
            resolution.height_y,
            mirror.load(Ordering::Relaxed),
        )
        .and_then(|frame| decode::fit_to(frame, spec.width, spec.height));
        let color = match color {
            Ok(color) => color,
            Err(err) => {
                log::warn!("failed to convert webcam frame: {err:?}");
                continue;
            }
        };

        // Drop the frame while the previous one is still pending.
        if let Err(TrySendError::Disconnected(_)) = frames.try_send(color) {
            break;
        }
    }
}

struct WebcamImage {
    info: ImageInfo,
    data: Vec<u8>,
    accessed: bool,
}

impl StreamImage for WebcamImage {
    fn info(&self) -> ImageInfo {
        self.info
    }

    fn begin_access(&mut self, format: PixelFormat) -> Result<(), DeviceError> {
        if format != PixelFormat::Rgb32 || self.accessed || self.data.is_empty() {
            return Err(DeviceError::Access(format));
        }
        self.accessed = true;
        Ok(())
    }

    fn plane(&self) -> Option<ImagePlane<'_>> {
        self.accessed.then(|| ImagePlane {
            pitch: self.info.width as usize * 4,
            data: &self.data,
        })
    }

    fn end_access(&mut self) {
        self.accessed = false;
    }
}

pub struct WebcamCamera {
    index: CameraIndex,
    name: String,
    color: Option<StreamSpec>,
    mirror: Arc<AtomicBool>,
    grabber: Option<Grabber>,
    image: Option<WebcamImage>,
    in_flight: bool,
}

impl WebcamCamera {
    pub fn new(index: u32) -> Self {
        Self {
            index: CameraIndex::Index(index),
            name: format!("webcam {index}"),
            color: None,
            mirror: Arc::new(AtomicBool::new(false)),
            grabber: None,
            image: None,
            in_flight: false,
        }
    }

    fn next_frame(&self, wait: bool) -> Result<Vec<u8>, DeviceError> {
        let grabber = self.grabber.as_ref().ok_or(DeviceError::NoFrame)?;
        if wait {
            grabber
                .frames
                .recv_timeout(FRAME_TIMEOUT)
                .map_err(|_| DeviceError::NoFrame)
        } else {
            grabber.frames.try_recv().map_err(|_| DeviceError::NoFrame)
        }
    }

    fn stop_grabber(&mut self) {
        if let Some(mut grabber) = self.grabber.take() {
            grabber.stop();
        }
    }
}

impl DepthCamera for WebcamCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn enable_stream(&mut self, spec: StreamSpec) -> Result<(), DeviceError> {
        if spec.kind != StreamKind::Color {
            return Err(DeviceError::UnsupportedStream(spec.kind));
        }
        self.color = Some(spec);
        Ok(())
    }

    fn enable_hand_tracking(
        &mut self,
        _config: HandTrackingConfig,
        _on_gesture: GestureCallback,
    ) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("hand tracking"))
    }

    fn init(&mut self) -> i32 {
        let Some(spec) = self.color else {
            log::error!("webcam needs the color stream enabled");
            return STATUS_NO_STREAM;
        };

        let (ready_tx, ready_rx) = bounded(1);
        let (frame_tx, frame_rx) = bounded(1);
        let stop = Arc::new(AtomicBool::new(false));
        let link = GrabberLink {
            ready: ready_tx,
            frames: frame_tx,
            mirror: self.mirror.clone(),
            stop: stop.clone(),
        };
        let index = self.index.clone();
        let handle = thread::spawn(move || run_grabber(index, spec, link));

        let mut grabber = Grabber {
            stop,
            handle: Some(handle),
            frames: frame_rx,
        };
        match ready_rx.recv() {
            Ok(Ok(name)) => {
                self.name = name;
                self.grabber = Some(grabber);
                self.image = Some(WebcamImage {
                    info: ImageInfo {
                        width: spec.width,
                        height: spec.height,
                        format: PixelFormat::Rgb32,
                    },
                    data: Vec::new(),
                    accessed: false,
                });
                0
            }
            Ok(Err(err)) => {
                log::error!("failed to open webcam: {err}");
                grabber.stop();
                STATUS_OPEN_FAILED
            }
            Err(_) => {
                log::error!("webcam thread exited before reporting");
                grabber.stop();
                STATUS_OPEN_FAILED
            }
        }
    }

    fn set_mirror_mode(&mut self, mode: MirrorMode) -> Result<(), DeviceError> {
        self.mirror
            .store(mode == MirrorMode::Horizontal, Ordering::Relaxed);
        Ok(())
    }

    fn create_hand_output(&mut self) -> Result<Box<dyn HandOutput>, DeviceError> {
        Err(DeviceError::Unsupported("hand tracking"))
    }

    fn create_projection(&mut self) -> Result<Box<dyn Projection>, DeviceError> {
        Err(DeviceError::Unsupported("depth to color projection"))
    }

    fn acquire_frame(&mut self, wait: bool) -> Result<(), DeviceError> {
        if self.in_flight {
            return Err(DeviceError::Status(STATUS_FRAME_HELD));
        }
        let frame = self.next_frame(wait)?;
        let image = self.image.as_mut().ok_or(DeviceError::NoFrame)?;
        image.data = frame;
        self.in_flight = true;
        Ok(())
    }

    fn sample(&mut self, kind: StreamKind) -> Option<&mut dyn StreamImage> {
        if !self.in_flight || kind != StreamKind::Color {
            return None;
        }
        self.image.as_mut().map(|image| image as &mut dyn StreamImage)
    }

    fn release_frame(&mut self) {
        self.in_flight = false;
    }

    fn close(&mut self) {
        self.stop_grabber();
        self.image = None;
    }

    fn dispose_manager(&mut self) {}

    fn dispose_session(&mut self) {}
}

impl Drop for WebcamCamera {
    fn drop(&mut self) {
        self.stop_grabber();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_color_stream_is_accepted() {
        let mut camera = WebcamCamera::new(0);
        assert_eq!(
            camera.enable_stream(StreamSpec::new(StreamKind::Depth, 640, 480, 30)),
            Err(DeviceError::UnsupportedStream(StreamKind::Depth))
        );
        assert!(
            camera
                .enable_stream(StreamSpec::new(StreamKind::Color, 640, 480, 30))
                .is_ok()
        );
        assert!(
            camera
                .enable_hand_tracking(HandTrackingConfig::default(), Box::new(|_: &str| {}))
                .is_err()
        );
    }

    #[test]
    fn init_without_color_fails_before_opening() {
        let mut camera = WebcamCamera::new(0);
        assert_eq!(camera.init(), STATUS_NO_STREAM);
        assert_eq!(camera.acquire_frame(false), Err(DeviceError::NoFrame));
    }

    #[test]
    fn mirror_mode_reaches_the_grabber_flag() {
        let mut camera = WebcamCamera::new(0);
        let flag = camera.mirror.clone();
        camera.set_mirror_mode(MirrorMode::Horizontal).unwrap();
        assert!(flag.load(Ordering::Relaxed));
        camera.set_mirror_mode(MirrorMode::Disabled).unwrap();
        assert!(!flag.load(Ordering::Relaxed));
    }
}
