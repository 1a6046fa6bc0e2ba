use super::{hands::HandFrame, projection::ProjectionMapper};
use crate::{
    presentation::{Presenter, SurfaceId},
    types::{Color, Hand},
};

pub const COLOR_MARKER_RADIUS: i32 = 10;
pub const SKELETON_MARKER_RADIUS: i32 = 3;
pub const MARKER_COLOR: Color = Color::YELLOW_GREEN;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OverlayCounts {
    pub color_markers: usize,
    pub skeleton_markers: usize,
}

/// Submits joint markers for the color view and the skeleton canvas.
pub struct OverlayRenderer {
    presenter: Presenter,
    skeleton_dirty: bool,
}

impl OverlayRenderer {
    pub fn new(presenter: Presenter) -> Self {
        Self {
            presenter,
            skeleton_dirty: false,
        }
    }

    pub fn render(&mut self, frame: &HandFrame, mapper: Option<&ProjectionMapper>) -> OverlayCounts {
        let color_markers = match mapper {
            Some(mapper) => self.draw_color_overlay(&frame.hands, mapper),
            None => 0,
        };
        OverlayCounts {
            color_markers,
            skeleton_markers: self.redraw_skeleton(&frame.hands),
        }
    }

    /// Markers at projected joint positions, drawn in extraction order.
    pub fn draw_color_overlay(&self, hands: &[Hand], mapper: &ProjectionMapper) -> usize {
        let mut drawn = 0;
        for hand in hands {
            for joint in &hand.joints {
                let Some(point) = mapper.map_joint(joint) else {
                    continue;
                };
                self.presenter.draw_marker(
                    SurfaceId::Color,
                    point.x as i32,
                    point.y as i32,
                    COLOR_MARKER_RADIUS,
                    MARKER_COLOR,
                );
                drawn += 1;
            }
        }
        drawn
    }

    /// Clears and redraws the skeleton canvas in hand-stream coordinates.
    /// An empty scene on an already clean canvas submits nothing.
    pub fn redraw_skeleton(&mut self, hands: &[Hand]) -> usize {
        if hands.is_empty() && !self.skeleton_dirty {
            return 0;
        }
        self.presenter.clear(SurfaceId::Skeleton);

        let mut drawn = 0;
        for joint in hands.iter().flat_map(|hand| hand.tracked_joints()) {
            self.presenter.draw_marker(
                SurfaceId::Skeleton,
                joint.image.x as i32,
                joint.image.y as i32,
                SKELETON_MARKER_RADIUS,
                MARKER_COLOR,
            );
            drawn += 1;
        }
        self.skeleton_dirty = drawn > 0;
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::{DeviceError, Projection},
        presentation::{self, SurfaceCommand},
        types::{Joint, JointData, JointKind, Point2, Point3},
    };

    struct Identity;

    impl Projection for Identity {
        fn map_depth_to_color(&self, depth: &[Point3], color: &mut [Point2]) -> Result<(), DeviceError> {
            for (src, dst) in depth.iter().zip(color.iter_mut()) {
                *dst = Point2::new(src.x * 3.0, src.y * 2.25);
            }
            Ok(())
        }
    }

    struct Failing;

    impl Projection for Failing {
        fn map_depth_to_color(&self, _: &[Point3], _: &mut [Point2]) -> Result<(), DeviceError> {
            Err(DeviceError::Projection)
        }
    }

    fn hand(untracked: &[JointKind]) -> Hand {
        Hand {
            index: 0,
            joints: JointKind::ALL
                .iter()
                .map(|&kind| {
                    if untracked.contains(&kind) {
                        Joint::untracked(kind)
                    } else {
                        Joint::tracked(
                            kind,
                            JointData {
                                position_image: Point2::new(kind.index() as f32 * 10.0, 50.0),
                                position_world: Point3::new(0.0, 0.0, 0.5),
                                confidence: 100,
                            },
                        )
                    }
                })
                .collect(),
        }
    }

    fn markers_on(commands: &[SurfaceCommand], id: SurfaceId) -> Vec<(i32, i32)> {
        commands
            .iter()
            .filter_map(|command| match command {
                SurfaceCommand::DrawMarker { surface, x, y, .. } if *surface == id => Some((*x, *y)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn full_hand_draws_every_joint_on_both_views() {
        let (presenter, rx) = presentation::channel();
        let mut renderer = OverlayRenderer::new(presenter);
        let mapper = ProjectionMapper::new(Box::new(Identity));
        let frame = HandFrame {
            mask: None,
            hands: vec![hand(&[])],
        };

        let counts = renderer.render(&frame, Some(&mapper));
        assert_eq!(counts.color_markers, 22);
        assert_eq!(counts.skeleton_markers, 22);

        let commands: Vec<SurfaceCommand> = rx.try_iter().collect();
        let color = markers_on(&commands, SurfaceId::Color);
        assert_eq!(color[1], (30, 112));
        let skeleton = markers_on(&commands, SurfaceId::Skeleton);
        assert_eq!(skeleton[1], (10, 50));
    }

    #[test]
    fn skeleton_clear_precedes_markers() {
        let (presenter, rx) = presentation::channel();
        let mut renderer = OverlayRenderer::new(presenter);
        renderer.redraw_skeleton(&[hand(&[])]);
        let commands: Vec<SurfaceCommand> = rx.try_iter().collect();
        assert_eq!(
            commands.first(),
            Some(&SurfaceCommand::Clear {
                surface: SurfaceId::Skeleton
            })
        );
    }

    #[test]
    fn failed_elements_are_omitted() {
        let (presenter, _rx) = presentation::channel();
        let mut renderer = OverlayRenderer::new(presenter);
        let frame = HandFrame {
            mask: None,
            hands: vec![hand(&[JointKind::Wrist, JointKind::RingTip])],
        };

        let failing = ProjectionMapper::new(Box::new(Failing));
        let counts = renderer.render(&frame, Some(&failing));
        assert_eq!(counts.color_markers, 0);
        assert_eq!(counts.skeleton_markers, 20);
    }

    #[test]
    fn clean_canvas_stays_untouched_without_hands() {
        let (presenter, rx) = presentation::channel();
        let mut renderer = OverlayRenderer::new(presenter);
        let empty = HandFrame::default();

        assert_eq!(renderer.render(&empty, None), OverlayCounts::default());
        assert_eq!(rx.try_iter().count(), 0);

        renderer.redraw_skeleton(&[hand(&[])]);
        rx.try_iter().for_each(drop);

        // Hands vanished: stale markers are cleared exactly once.
        renderer.redraw_skeleton(&[]);
        let commands: Vec<SurfaceCommand> = rx.try_iter().collect();
        assert_eq!(
            commands,
            vec![SurfaceCommand::Clear {
                surface: SurfaceId::Skeleton
            }]
        );
        renderer.redraw_skeleton(&[]);
        assert_eq!(rx.try_iter().count(), 0);
    }
}
