//! Presentation owner.
//!
//! All surfaces live on one thread. Other threads only submit
//! [`SurfaceCommand`]s through a [`Presenter`]; nothing waits for them to be
//! applied.

pub mod canvas;

use std::fmt;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::types::{Color, Rect, StreamBuffer, StreamKind};

pub use canvas::{CanvasSurface, SurfaceLayout};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    Color,
    Depth,
    Ir,
    Segmentation,
    Skeleton,
}

impl SurfaceId {
    pub fn for_stream(kind: StreamKind) -> Self {
        match kind {
            StreamKind::Color => SurfaceId::Color,
            StreamKind::Depth => SurfaceId::Depth,
            StreamKind::Ir => SurfaceId::Ir,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndicatorId(pub String);

impl IndicatorId {
    pub fn for_gesture(name: &str) -> Self {
        IndicatorId(format!("{name}_gesture"))
    }
}

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceCommand {
    ReplaceBuffer {
        surface: SurfaceId,
        rect: Rect,
        stride: usize,
        bytes: Vec<u8>,
    },
    DrawMarker {
        surface: SurfaceId,
        x: i32,
        y: i32,
        radius: i32,
        color: Color,
    },
    Clear {
        surface: SurfaceId,
    },
    SetIndicatorVisible {
        indicator: IndicatorId,
        visible: bool,
    },
    SetLabel {
        text: String,
    },
    /// Sent once by the capture worker after teardown.
    Shutdown,
}

pub trait PresentationSurface {
    fn replace_buffer(&mut self, surface: SurfaceId, rect: Rect, stride: usize, bytes: &[u8]);
    fn draw_marker(&mut self, surface: SurfaceId, x: i32, y: i32, radius: i32, color: Color);
    fn clear(&mut self, surface: SurfaceId);
    fn set_indicator_visible(&mut self, indicator: &IndicatorId, visible: bool);
    fn set_label(&mut self, text: &str);
}

/// Cloneable submission handle; sends never block.
#[derive(Clone, Debug)]
pub struct Presenter {
    tx: Sender<SurfaceCommand>,
}

pub fn channel() -> (Presenter, Receiver<SurfaceCommand>) {
    let (tx, rx) = unbounded();
    (Presenter { tx }, rx)
}

impl Presenter {
    pub fn submit(&self, command: SurfaceCommand) {
        // The owner may already be gone during shutdown.
        if self.tx.send(command).is_err() {
            log::trace!("presentation owner is gone, dropping command");
        }
    }

    pub fn replace_buffer(&self, surface: SurfaceId, buffer: StreamBuffer) {
        self.submit(SurfaceCommand::ReplaceBuffer {
            surface,
            rect: buffer.rect(),
            stride: buffer.stride,
            bytes: buffer.bytes,
        });
    }

    pub fn draw_marker(&self, surface: SurfaceId, x: i32, y: i32, radius: i32, color: Color) {
        self.submit(SurfaceCommand::DrawMarker {
            surface,
            x,
            y,
            radius,
            color,
        });
    }

    pub fn clear(&self, surface: SurfaceId) {
        self.submit(SurfaceCommand::Clear { surface });
    }

    pub fn set_indicator_visible(&self, indicator: IndicatorId, visible: bool) {
        self.submit(SurfaceCommand::SetIndicatorVisible { indicator, visible });
    }

    pub fn set_label(&self, text: impl Into<String>) {
        self.submit(SurfaceCommand::SetLabel { text: text.into() });
    }

    pub fn request_shutdown(&self) {
        self.submit(SurfaceCommand::Shutdown);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresentationStats {
    pub applied: u64,
    pub shutdown_received: bool,
}

/// Applies commands in submission order until `Shutdown` or until every
/// [`Presenter`] is dropped.
pub fn run_presentation<S: PresentationSurface>(
    surface: &mut S,
    commands: &Receiver<SurfaceCommand>,
) -> PresentationStats {
    let mut stats = PresentationStats::default();

    while let Ok(command) = commands.recv() {
        if command == SurfaceCommand::Shutdown {
            stats.shutdown_received = true;
            break;
        }
        apply(surface, command);
        stats.applied += 1;
    }

    if !stats.shutdown_received {
        log::warn!("presentation channel closed without a shutdown request");
    }
    stats
}

pub fn apply<S: PresentationSurface>(surface: &mut S, command: SurfaceCommand) {
    match command {
        SurfaceCommand::ReplaceBuffer {
            surface: id,
            rect,
            stride,
            bytes,
        } => surface.replace_buffer(id, rect, stride, &bytes),
        SurfaceCommand::DrawMarker {
            surface: id,
            x,
            y,
            radius,
            color,
        } => surface.draw_marker(id, x, y, radius, color),
        SurfaceCommand::Clear { surface: id } => surface.clear(id),
        SurfaceCommand::SetIndicatorVisible { indicator, visible } => {
            surface.set_indicator_visible(&indicator, visible)
        }
        SurfaceCommand::SetLabel { text } => surface.set_label(&text),
        SurfaceCommand::Shutdown => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl PresentationSurface for Recorder {
        fn replace_buffer(&mut self, surface: SurfaceId, rect: Rect, stride: usize, bytes: &[u8]) {
            self.calls.push(format!(
                "replace {surface:?} {}x{} {stride} {}",
                rect.width,
                rect.height,
                bytes.len()
            ));
        }

        fn draw_marker(&mut self, surface: SurfaceId, x: i32, y: i32, radius: i32, _color: Color) {
            self.calls.push(format!("marker {surface:?} {x},{y} r{radius}"));
        }

        fn clear(&mut self, surface: SurfaceId) {
            self.calls.push(format!("clear {surface:?}"));
        }

        fn set_indicator_visible(&mut self, indicator: &IndicatorId, visible: bool) {
            self.calls.push(format!("indicator {indicator} {visible}"));
        }

        fn set_label(&mut self, text: &str) {
            self.calls.push(format!("label {text}"));
        }
    }

    #[test]
    fn commands_apply_in_submission_order() {
        let (presenter, rx) = channel();
        presenter.clear(SurfaceId::Skeleton);
        presenter.draw_marker(SurfaceId::Skeleton, 3, 4, 3, Color::YELLOW_GREEN);
        presenter.set_label("fist");
        presenter.set_indicator_visible(IndicatorId::for_gesture("fist"), true);
        presenter.request_shutdown();
        presenter.set_label("after shutdown");

        let mut recorder = Recorder::default();
        let stats = run_presentation(&mut recorder, &rx);

        assert!(stats.shutdown_received);
        assert_eq!(stats.applied, 4);
        assert_eq!(
            recorder.calls,
            vec![
                "clear Skeleton",
                "marker Skeleton 3,4 r3",
                "label fist",
                "indicator fist_gesture true",
            ]
        );
    }

    #[test]
    fn owner_exits_when_all_presenters_drop() {
        let (presenter, rx) = channel();
        presenter.set_label("wave");
        drop(presenter);

        let mut recorder = Recorder::default();
        let stats = run_presentation(&mut recorder, &rx);
        assert!(!stats.shutdown_received);
        assert_eq!(stats.applied, 1);
    }

    #[test]
    fn submit_after_owner_drop_does_not_panic() {
        let (presenter, rx) = channel();
        drop(rx);
        presenter.clear(SurfaceId::Color);
    }
}
