pub mod capture;
pub mod hands;
pub mod overlay;
pub mod projection;
pub mod session;
pub mod stream_buffer;

// Re-exports for convenience
pub use capture::{CaptureLoop, FrameProcessor, FrameReport, LoopSettings, StopSignal, start_capture};
pub use hands::{HandExtractor, HandFrame};
pub use overlay::{OverlayCounts, OverlayRenderer};
pub use projection::ProjectionMapper;
pub use session::{CameraSession, SessionError, SessionOptions};
