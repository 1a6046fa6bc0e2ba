//! Simulated depth camera.
//!
//! Produces deterministic color, depth and infrared frames plus synthetic
//! hands. With `record_events` set, every device call is recorded in a
//! [`DeviceLog`] so the capture pipeline can be exercised without hardware.

use std::{
    f32::consts::PI,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread,
    time::Duration,
};

use rayon::prelude::*;

use super::{
    DepthCamera, DeviceError, GestureCallback, HandOutput, HandTrackingConfig, ImageInfo,
    ImagePlane, MirrorMode, Projection, StreamImage, TrackedHand,
};
use crate::{
    gesture::GESTURE_NAMES,
    types::{JointData, JointKind, PixelFormat, Point2, Point3, StreamKind, StreamSpec},
};

const STATUS_FRAME_HELD: i32 = -301;
const STATUS_NOT_INITIALIZED: i32 = -302;
const ROW_ALIGNMENT: usize = 64;
const GESTURE_POLL: Duration = Duration::from_millis(10);

// Depth sensor intrinsics at 640x480, scaled to the configured resolution.
const DEPTH_FX: f32 = 594.21;
const DEPTH_FY: f32 = 591.04;
const DEPTH_CX: f32 = 339.5;
const DEPTH_CY: f32 = 242.7;
const DEPTH_BASE_WIDTH: f32 = 640.0;
const DEPTH_BASE_HEIGHT: f32 = 480.0;
// Color sensor focal length at 1920x1080.
const COLOR_FOCAL: f32 = 1386.0;
const COLOR_BASE_WIDTH: f32 = 1920.0;
const COLOR_BASE_HEIGHT: f32 = 1080.0;
/// Color sensor offset from the depth sensor along x, in millimetres.
const BASELINE_MM: f32 = 25.0;

const HAND_MASK_RADIUS: f32 = 70.0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessSource {
    Stream(StreamKind),
    Segmentation(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceEvent {
    StreamEnabled(StreamKind),
    HandTrackingEnabled,
    Initialized(i32),
    MirrorModeSet(MirrorMode),
    HandOutputCreated,
    ProjectionCreated,
    FrameAcquired(u64),
    FrameReleased(u64),
    AccessBegin(AccessSource),
    AccessEnd(AccessSource),
    HandsUpdated(u64),
    GestureFired(String),
    ProjectionReleased,
    HandOutputReleased,
    DeviceClosed,
    ManagerDisposed,
    SessionDisposed,
}

/// Shared, append-only record of device calls. The default log is disabled
/// and drops every event.
#[derive(Clone, Debug, Default)]
pub struct DeviceLog(Option<Arc<Mutex<Vec<DeviceEvent>>>>);

impl DeviceLog {
    pub fn recording() -> Self {
        Self(Some(Arc::default()))
    }

    pub fn push(&self, event: DeviceEvent) {
        if let Some(events) = &self.0 {
            events
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(event);
        }
    }

    pub fn snapshot(&self) -> Vec<DeviceEvent> {
        self.0.as_ref().map_or_else(Vec::new, |events| {
            events
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone()
        })
    }
}

#[derive(Clone, Debug)]
pub struct SimConfig {
    pub hands: usize,
    pub init_status: i32,
    /// How long a blocking acquire waits for the next frame.
    pub frame_interval: Duration,
    /// Period of the gesture callback thread; `None` disables it.
    pub gesture_interval: Option<Duration>,
    pub gesture_script: Vec<String>,
    pub failing_streams: Vec<StreamKind>,
    pub failing_joints: Vec<JointKind>,
    pub failing_segmentation: Vec<usize>,
    pub fail_projection: bool,
    /// Keep a [`DeviceLog`] of every device call. It is never trimmed.
    pub record_events: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hands: 1,
            init_status: 0,
            frame_interval: Duration::from_millis(33),
            gesture_interval: Some(Duration::from_millis(1_500)),
            gesture_script: GESTURE_NAMES.iter().map(|name| name.to_string()).collect(),
            failing_streams: Vec::new(),
            failing_joints: Vec::new(),
            failing_segmentation: Vec::new(),
            fail_projection: false,
            record_events: false,
        }
    }
}

struct SimImage {
    source: AccessSource,
    info: ImageInfo,
    pitch: usize,
    data: Vec<u8>,
    fail: bool,
    accessed: bool,
    log: DeviceLog,
}

impl SimImage {
    fn new(source: AccessSource, info: ImageInfo, fail: bool, log: DeviceLog) -> Self {
        let pitch = aligned_pitch(info.format, info.width);
        Self {
            source,
            info,
            pitch,
            data: vec![0u8; pitch * info.height as usize],
            fail,
            accessed: false,
            log,
        }
    }
}

impl StreamImage for SimImage {
    fn info(&self) -> ImageInfo {
        self.info
    }

    fn begin_access(&mut self, format: PixelFormat) -> Result<(), DeviceError> {
        if self.fail || format != self.info.format || self.accessed {
            return Err(DeviceError::Access(format));
        }
        self.accessed = true;
        self.log.push(DeviceEvent::AccessBegin(self.source.clone()));
        Ok(())
    }

    fn plane(&self) -> Option<ImagePlane<'_>> {
        self.accessed.then(|| ImagePlane {
            pitch: self.pitch,
            data: &self.data,
        })
    }

    fn end_access(&mut self) {
        if self.accessed {
            self.accessed = false;
            self.log.push(DeviceEvent::AccessEnd(self.source.clone()));
        }
    }
}

fn aligned_pitch(format: PixelFormat, width: u32) -> usize {
    format.min_stride(width).div_ceil(ROW_ALIGNMENT) * ROW_ALIGNMENT
}

struct GestureThread {
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl GestureThread {
    fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.handle.join();
    }
}

pub struct SimulatedCamera {
    config: SimConfig,
    log: DeviceLog,
    streams: Vec<StreamSpec>,
    images: Vec<SimImage>,
    hand_tracking: Option<HandTrackingConfig>,
    on_gesture: Option<Arc<GestureCallback>>,
    initialized: bool,
    closed: bool,
    mirror: MirrorMode,
    frame: Arc<AtomicU64>,
    in_flight: bool,
    gesture_thread: Option<GestureThread>,
}

impl SimulatedCamera {
    pub fn new(config: SimConfig) -> Self {
        let log = if config.record_events {
            DeviceLog::recording()
        } else {
            DeviceLog::default()
        };
        Self {
            config,
            log,
            streams: Vec::new(),
            images: Vec::new(),
            hand_tracking: None,
            on_gesture: None,
            initialized: false,
            closed: false,
            mirror: MirrorMode::Disabled,
            frame: Arc::new(AtomicU64::new(0)),
            in_flight: false,
            gesture_thread: None,
        }
    }

    pub fn log(&self) -> DeviceLog {
        self.log.clone()
    }

    fn stream(&self, kind: StreamKind) -> Option<StreamSpec> {
        self.streams.iter().copied().find(|spec| spec.kind == kind)
    }

    /// Resolution the hand module works at: the depth stream, or VGA.
    fn hand_resolution(&self) -> (u32, u32) {
        self.stream(StreamKind::Depth)
            .map(|spec| (spec.width, spec.height))
            .unwrap_or((640, 480))
    }

    fn spawn_gesture_thread(&mut self) {
        let (Some(callback), Some(interval)) = (self.on_gesture.clone(), self.config.gesture_interval)
        else {
            return;
        };
        if self.config.gesture_script.is_empty() {
            return;
        }

        let script = self.config.gesture_script.clone();
        let log = self.log.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::spawn(move || {
            for name in script.iter().cycle() {
                let mut waited = Duration::ZERO;
                while waited < interval {
                    if stop_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    let step = GESTURE_POLL.min(interval - waited);
                    thread::sleep(step);
                    waited += step;
                }
                if stop_flag.load(Ordering::Relaxed) {
                    return;
                }
                log.push(DeviceEvent::GestureFired(name.clone()));
                callback(name.as_str());
            }
        });

        self.gesture_thread = Some(GestureThread { stop, handle });
    }

    fn render_frame(&mut self, frame: u64) {
        let mirrored = self.mirror == MirrorMode::Horizontal;
        for image in &mut self.images {
            let width = image.info.width as usize;
            let pitch = image.pitch;
            match image.source {
                AccessSource::Stream(StreamKind::Color) => {
                    image.data.par_chunks_mut(pitch).enumerate().for_each(|(y, row)| {
                        for x in 0..width {
                            let sx = if mirrored { width - 1 - x } else { x };
                            let px = &mut row[x * 4..x * 4 + 4];
                            px[0] = (sx as u64 + frame * 4) as u8;
                            px[1] = y as u8;
                            px[2] = (sx ^ y) as u8;
                            px[3] = 255;
                        }
                    });
                }
                AccessSource::Stream(StreamKind::Depth) => {
                    image.data.par_chunks_mut(pitch).enumerate().for_each(|(y, row)| {
                        for x in 0..width {
                            let sx = if mirrored { width - 1 - x } else { x };
                            let depth = 500 + ((sx + y) as u64 + frame) % 1_500;
                            row[x * 2..x * 2 + 2].copy_from_slice(&(depth as u16).to_le_bytes());
                        }
                    });
                }
                AccessSource::Stream(StreamKind::Ir) => {
                    image.data.par_chunks_mut(pitch).enumerate().for_each(|(y, row)| {
                        for x in 0..width {
                            let sx = if mirrored { width - 1 - x } else { x };
                            row[x] = ((sx * y) as u64 + frame) as u8;
                        }
                    });
                }
                AccessSource::Segmentation(_) => {}
            }
        }
    }

    fn stop_gesture_thread(&mut self) {
        if let Some(gestures) = self.gesture_thread.take() {
            gestures.stop();
        }
    }
}

impl DepthCamera for SimulatedCamera {
    fn name(&self) -> &str {
        "simulated depth camera"
    }

    fn enable_stream(&mut self, spec: StreamSpec) -> Result<(), DeviceError> {
        if self.initialized {
            return Err(DeviceError::Status(STATUS_NOT_INITIALIZED));
        }
        self.streams.retain(|existing| existing.kind != spec.kind);
        self.streams.push(spec);
        self.log.push(DeviceEvent::StreamEnabled(spec.kind));
        Ok(())
    }

    fn enable_hand_tracking(
        &mut self,
        config: HandTrackingConfig,
        on_gesture: GestureCallback,
    ) -> Result<(), DeviceError> {
        self.hand_tracking = Some(config);
        if config.all_gestures {
            self.on_gesture = Some(Arc::new(on_gesture));
        }
        self.log.push(DeviceEvent::HandTrackingEnabled);
        Ok(())
    }

    fn init(&mut self) -> i32 {
        let status = self.config.init_status;
        self.log.push(DeviceEvent::Initialized(status));
        if status < 0 {
            return status;
        }

        self.images = self
            .streams
            .iter()
            .map(|spec| {
                let info = ImageInfo {
                    width: spec.width,
                    height: spec.height,
                    format: spec.kind.target_format(),
                };
                let fail = self.config.failing_streams.contains(&spec.kind);
                SimImage::new(AccessSource::Stream(spec.kind), info, fail, self.log.clone())
            })
            .collect();
        self.initialized = true;
        self.spawn_gesture_thread();
        status
    }

    fn set_mirror_mode(&mut self, mode: MirrorMode) -> Result<(), DeviceError> {
        if !self.initialized {
            return Err(DeviceError::Status(STATUS_NOT_INITIALIZED));
        }
        self.mirror = mode;
        self.log.push(DeviceEvent::MirrorModeSet(mode));
        Ok(())
    }

    fn create_hand_output(&mut self) -> Result<Box<dyn HandOutput>, DeviceError> {
        let Some(tracking) = self.hand_tracking else {
            return Err(DeviceError::Unsupported("hand tracking"));
        };
        let (width, height) = self.hand_resolution();
        self.log.push(DeviceEvent::HandOutputCreated);
        Ok(Box::new(SimHandOutput {
            hands: self.config.hands,
            segmentation: tracking.segmentation,
            failing_joints: self.config.failing_joints.clone(),
            failing_segmentation: self.config.failing_segmentation.clone(),
            width,
            height,
            frame: self.frame.clone(),
            tracked: Vec::new(),
            log: self.log.clone(),
        }))
    }

    fn create_projection(&mut self) -> Result<Box<dyn Projection>, DeviceError> {
        let (depth_w, depth_h) = self.hand_resolution();
        let (color_w, color_h) = self
            .stream(StreamKind::Color)
            .map(|spec| (spec.width, spec.height))
            .unwrap_or((1920, 1080));
        self.log.push(DeviceEvent::ProjectionCreated);
        Ok(Box::new(SimProjection {
            depth: Intrinsics::depth(depth_w, depth_h),
            color: Intrinsics::color(color_w, color_h),
            fail: self.config.fail_projection,
            log: self.log.clone(),
        }))
    }

    fn acquire_frame(&mut self, wait: bool) -> Result<(), DeviceError> {
        if !self.initialized || self.closed {
            return Err(DeviceError::NoFrame);
        }
        if self.in_flight {
            return Err(DeviceError::Status(STATUS_FRAME_HELD));
        }
        if wait && !self.config.frame_interval.is_zero() {
            thread::sleep(self.config.frame_interval);
        }

        let frame = self.frame.fetch_add(1, Ordering::SeqCst) + 1;
        self.render_frame(frame);
        self.in_flight = true;
        self.log.push(DeviceEvent::FrameAcquired(frame));
        Ok(())
    }

    fn sample(&mut self, kind: StreamKind) -> Option<&mut dyn StreamImage> {
        if !self.in_flight {
            return None;
        }
        self.images
            .iter_mut()
            .find(|image| image.source == AccessSource::Stream(kind))
            .map(|image| image as &mut dyn StreamImage)
    }

    fn release_frame(&mut self) {
        if self.in_flight {
            self.in_flight = false;
            self.log
                .push(DeviceEvent::FrameReleased(self.frame.load(Ordering::SeqCst)));
        }
    }

    fn close(&mut self) {
        self.stop_gesture_thread();
        self.closed = true;
        self.images.clear();
        self.log.push(DeviceEvent::DeviceClosed);
    }

    fn dispose_manager(&mut self) {
        self.hand_tracking = None;
        self.log.push(DeviceEvent::ManagerDisposed);
    }

    fn dispose_session(&mut self) {
        self.on_gesture = None;
        self.log.push(DeviceEvent::SessionDisposed);
    }
}

impl Drop for SimulatedCamera {
    fn drop(&mut self) {
        self.stop_gesture_thread();
    }
}

struct SimHand {
    joints: Vec<JointData>,
    mask: SimImage,
}

impl TrackedHand for SimHand {
    fn segmentation_image(&mut self) -> Result<&mut dyn StreamImage, DeviceError> {
        Ok(&mut self.mask)
    }

    fn tracked_joint(&self, kind: JointKind) -> Result<JointData, DeviceError> {
        self.joints
            .get(kind.index())
            .copied()
            .filter(|joint| joint.confidence > 0)
            .ok_or(DeviceError::JointNotTracked(kind))
    }
}

struct SimHandOutput {
    hands: usize,
    segmentation: bool,
    failing_joints: Vec<JointKind>,
    failing_segmentation: Vec<usize>,
    width: u32,
    height: u32,
    frame: Arc<AtomicU64>,
    tracked: Vec<SimHand>,
    log: DeviceLog,
}

impl SimHandOutput {
    fn synthesize(&self, hand: usize, frame: u64) -> SimHand {
        let (w, h) = (self.width as f32, self.height as f32);
        let phase = frame as f32 * 0.1 + hand as f32 * PI;
        let center = Point2::new(
            w * (0.35 + 0.3 * hand as f32) + 40.0 * phase.cos(),
            h * 0.5 + 30.0 * phase.sin(),
        );
        let depth_m = 0.45 + 0.05 * hand as f32;

        let joints = JointKind::ALL
            .iter()
            .map(|kind| {
                let image = match kind.finger_segment() {
                    None if *kind == JointKind::Wrist => Point2::new(center.x, center.y + 60.0),
                    None => center,
                    Some((finger, segment)) => {
                        let angle = (-150.0 + finger as f32 * 30.0).to_radians();
                        let reach = 25.0 + segment as f32 * 15.0;
                        Point2::new(center.x + reach * angle.cos(), center.y + reach * angle.sin())
                    }
                };
                let confidence = if self.failing_joints.contains(kind) { 0 } else { 100 };
                JointData {
                    position_image: image,
                    position_world: Point3::new(
                        (image.x / w - 0.5) * 0.5,
                        (0.5 - image.y / h) * 0.4,
                        depth_m + kind.index() as f32 * 0.001,
                    ),
                    confidence,
                }
            })
            .collect();

        let info = ImageInfo {
            width: self.width,
            height: self.height,
            format: PixelFormat::Y8,
        };
        let fail = !self.segmentation || self.failing_segmentation.contains(&hand);
        let mut mask = SimImage::new(AccessSource::Segmentation(hand), info, fail, self.log.clone());
        let pitch = mask.pitch;
        let width = self.width as usize;
        let radius_sq = HAND_MASK_RADIUS * HAND_MASK_RADIUS;
        mask.data.par_chunks_mut(pitch).enumerate().for_each(|(y, row)| {
            let dy = y as f32 - center.y;
            for (x, px) in row.iter_mut().take(width).enumerate() {
                let dx = x as f32 - center.x;
                if dx * dx + dy * dy <= radius_sq {
                    *px = 0xff;
                }
            }
        });

        SimHand { joints, mask }
    }
}

impl HandOutput for SimHandOutput {
    fn update(&mut self) -> Result<(), DeviceError> {
        let frame = self.frame.load(Ordering::SeqCst);
        self.tracked = (0..self.hands).map(|hand| self.synthesize(hand, frame)).collect();
        self.log.push(DeviceEvent::HandsUpdated(frame));
        Ok(())
    }

    fn hand_count(&self) -> usize {
        self.tracked.len()
    }

    fn hand_by_time(&mut self, index: usize) -> Result<&mut dyn TrackedHand, DeviceError> {
        self.tracked
            .get_mut(index)
            .map(|hand| hand as &mut dyn TrackedHand)
            .ok_or(DeviceError::NoHand(index))
    }
}

impl Drop for SimHandOutput {
    fn drop(&mut self) {
        self.log.push(DeviceEvent::HandOutputReleased);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Intrinsics {
    fx: f32,
    fy: f32,
    cx: f32,
    cy: f32,
    width: f32,
    height: f32,
}

impl Intrinsics {
    fn depth(width: u32, height: u32) -> Self {
        let sx = width as f32 / DEPTH_BASE_WIDTH;
        let sy = height as f32 / DEPTH_BASE_HEIGHT;
        Self {
            fx: DEPTH_FX * sx,
            fy: DEPTH_FY * sy,
            cx: DEPTH_CX * sx,
            cy: DEPTH_CY * sy,
            width: width as f32,
            height: height as f32,
        }
    }

    fn color(width: u32, height: u32) -> Self {
        Self {
            fx: COLOR_FOCAL * width as f32 / COLOR_BASE_WIDTH,
            fy: COLOR_FOCAL * height as f32 / COLOR_BASE_HEIGHT,
            cx: width as f32 / 2.0,
            cy: height as f32 / 2.0,
            width: width as f32,
            height: height as f32,
        }
    }
}

struct SimProjection {
    depth: Intrinsics,
    color: Intrinsics,
    fail: bool,
    log: DeviceLog,
}

impl SimProjection {
    fn map_point(&self, point: Point3) -> Option<Point2> {
        let z = point.z;
        if !(z.is_finite() && z > 0.0) {
            return None;
        }
        let x = (point.x - self.depth.cx) * z / self.depth.fx - BASELINE_MM;
        let y = (point.y - self.depth.cy) * z / self.depth.fy;
        let mapped = Point2::new(
            self.color.fx * x / z + self.color.cx,
            self.color.fy * y / z + self.color.cy,
        );
        let inside = (0.0..self.color.width).contains(&mapped.x)
            && (0.0..self.color.height).contains(&mapped.y);
        inside.then_some(mapped)
    }
}

impl Projection for SimProjection {
    fn map_depth_to_color(&self, depth: &[Point3], color: &mut [Point2]) -> Result<(), DeviceError> {
        if self.fail || depth.len() != color.len() {
            return Err(DeviceError::Projection);
        }
        let mut status = Ok(());
        for (src, dst) in depth.iter().zip(color.iter_mut()) {
            match self.map_point(*src) {
                Some(mapped) => *dst = mapped,
                None => {
                    *dst = Point2::new(-1.0, -1.0);
                    status = Err(DeviceError::Projection);
                }
            }
        }
        status
    }
}

impl Drop for SimProjection {
    fn drop(&mut self) {
        self.log.push(DeviceEvent::ProjectionReleased);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{FrameLease, ImageAccess};

    fn small_camera(config: SimConfig) -> SimulatedCamera {
        let mut camera = SimulatedCamera::new(SimConfig {
            frame_interval: Duration::ZERO,
            gesture_interval: None,
            record_events: true,
            ..config
        });
        camera
            .enable_stream(StreamSpec::new(StreamKind::Color, 64, 48, 30))
            .unwrap();
        camera
            .enable_stream(StreamSpec::new(StreamKind::Depth, 64, 48, 30))
            .unwrap();
        camera
    }

    #[test]
    fn second_acquire_without_release_is_rejected() {
        let mut camera = small_camera(SimConfig::default());
        assert_eq!(camera.init(), 0);
        camera.acquire_frame(true).unwrap();
        assert_eq!(
            camera.acquire_frame(true),
            Err(DeviceError::Status(STATUS_FRAME_HELD))
        );
        camera.release_frame();
        assert!(camera.acquire_frame(true).is_ok());
    }

    #[test]
    fn lease_releases_frame_on_drop() {
        let mut camera = small_camera(SimConfig::default());
        camera.init();
        let log = camera.log();
        {
            let mut lease = FrameLease::acquire(&mut camera, true).unwrap();
            let image = lease.sample(StreamKind::Color).unwrap();
            let access = ImageAccess::acquire(image, PixelFormat::Rgb32).unwrap();
            assert!(access.plane().is_some());
        }
        let events = log.snapshot();
        assert_eq!(events.last(), Some(&DeviceEvent::FrameReleased(1)));
        assert!(events.contains(&DeviceEvent::AccessEnd(AccessSource::Stream(StreamKind::Color))));
    }

    #[test]
    fn access_in_wrong_format_fails() {
        let mut camera = small_camera(SimConfig::default());
        camera.init();
        camera.acquire_frame(false).unwrap();
        let image = camera.sample(StreamKind::Depth).unwrap();
        assert_eq!(
            image.begin_access(PixelFormat::Y8),
            Err(DeviceError::Access(PixelFormat::Y8))
        );
    }

    #[test]
    fn failed_init_reports_status() {
        let mut camera = small_camera(SimConfig {
            init_status: -3,
            ..SimConfig::default()
        });
        assert_eq!(camera.init(), -3);
        assert_eq!(camera.acquire_frame(true), Err(DeviceError::NoFrame));
    }

    #[test]
    fn projection_rejects_points_behind_sensor() {
        let projection = SimProjection {
            depth: Intrinsics::depth(640, 480),
            color: Intrinsics::color(1920, 1080),
            fail: false,
            log: DeviceLog::default(),
        };
        assert!(projection.map_point(Point3::new(320.0, 240.0, 0.0)).is_none());
        let mapped = projection.map_point(Point3::new(320.0, 240.0, 450.0)).unwrap();
        assert!(mapped.x > 0.0 && mapped.x < 1920.0);
    }

    #[test]
    fn events_are_dropped_unless_recording() {
        let mut camera = SimulatedCamera::new(SimConfig {
            frame_interval: Duration::ZERO,
            gesture_interval: None,
            ..SimConfig::default()
        });
        camera
            .enable_stream(StreamSpec::new(StreamKind::Color, 16, 8, 30))
            .unwrap();
        camera.init();
        for _ in 0..100 {
            camera.acquire_frame(true).unwrap();
            camera.release_frame();
        }
        assert!(camera.log().snapshot().is_empty());
    }

    #[test]
    fn hand_output_follows_frame_counter() {
        let mut camera = small_camera(SimConfig {
            hands: 2,
            ..SimConfig::default()
        });
        camera
            .enable_hand_tracking(HandTrackingConfig::default(), Box::new(|_: &str| {}))
            .unwrap();
        camera.init();
        let mut output = camera.create_hand_output().unwrap();
        camera.acquire_frame(true).unwrap();
        output.update().unwrap();
        assert_eq!(output.hand_count(), 2);
        assert!(output.hand_by_time(2).is_err());
        let hand = output.hand_by_time(0).unwrap();
        assert!(hand.tracked_joint(JointKind::IndexTip).is_ok());
    }
}
