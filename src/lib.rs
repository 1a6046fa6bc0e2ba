//! Depth camera capture with hand tracking.
//!
//! A worker thread pulls synchronized color, depth and infrared frames from a
//! [`device::DepthCamera`], extracts hand joints and segmentation, and sends
//! every visual update to the presentation owner as a
//! [`presentation::SurfaceCommand`]. Gesture callbacks from the device are
//! forwarded to a [`gesture::GestureDispatcher`] that drives the indicator
//! state.

pub mod config;
pub mod device;
pub mod gesture;
pub mod pipeline;
pub mod presentation;
pub mod types;
