use crate::{
    device::Projection,
    types::{Joint, Point2, Point3},
};

/// World coordinates are metres; the depth map is in millimetres.
const WORLD_TO_DEPTH_UNITS: f32 = 1000.0;

/// Maps hand joints from depth space into color-image pixels.
pub struct ProjectionMapper {
    projection: Box<dyn Projection>,
}

impl ProjectionMapper {
    pub fn new(projection: Box<dyn Projection>) -> Self {
        Self { projection }
    }

    /// Depth-space point for a joint: image x/y with world z rescaled.
    pub fn depth_point(joint: &Joint) -> Point3 {
        Point3::new(
            joint.image.x,
            joint.image.y,
            joint.world.z * WORLD_TO_DEPTH_UNITS,
        )
    }

    /// `None` when the joint was not tracked or the device could not map it.
    pub fn map_joint(&self, joint: &Joint) -> Option<Point2> {
        if !joint.tracked {
            return None;
        }
        self.map_depth_to_color(Self::depth_point(joint))
    }

    pub fn map_depth_to_color(&self, point: Point3) -> Option<Point2> {
        let mut mapped = [Point2::default()];
        match self.projection.map_depth_to_color(&[point], &mut mapped) {
            Ok(()) if mapped[0].x.is_finite() && mapped[0].y.is_finite() => Some(mapped[0]),
            Ok(()) => None,
            Err(err) => {
                log::trace!("projection of {point:?} failed: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::DeviceError,
        types::{JointData, JointKind},
    };

    /// Shifts x by z/100 and fails for negative x.
    struct ShiftProjection;

    impl Projection for ShiftProjection {
        fn map_depth_to_color(&self, depth: &[Point3], color: &mut [Point2]) -> Result<(), DeviceError> {
            for (src, dst) in depth.iter().zip(color.iter_mut()) {
                if src.x < 0.0 {
                    return Err(DeviceError::Projection);
                }
                *dst = Point2::new(src.x + src.z / 100.0, src.y);
            }
            Ok(())
        }
    }

    fn joint(x: f32, y: f32, z: f32) -> Joint {
        Joint::tracked(
            JointKind::IndexTip,
            JointData {
                position_image: Point2::new(x, y),
                position_world: Point3::new(0.1, 0.2, z),
                confidence: 100,
            },
        )
    }

    #[test]
    fn world_depth_is_rescaled_before_mapping() {
        let mapper = ProjectionMapper::new(Box::new(ShiftProjection));
        let depth = ProjectionMapper::depth_point(&joint(10.0, 20.0, 0.5));
        assert_eq!(depth, Point3::new(10.0, 20.0, 500.0));
        assert_eq!(
            mapper.map_joint(&joint(10.0, 20.0, 0.5)),
            Some(Point2::new(15.0, 20.0))
        );
    }

    #[test]
    fn mapping_is_deterministic() {
        let mapper = ProjectionMapper::new(Box::new(ShiftProjection));
        let point = Point3::new(33.0, 44.0, 612.0);
        let first = mapper.map_depth_to_color(point);
        assert_eq!(first, mapper.map_depth_to_color(point));
        assert!(mapper.map_depth_to_color(Point3::new(-1.0, 0.0, 1.0)).is_none());
        assert!(mapper.map_depth_to_color(Point3::new(-1.0, 0.0, 1.0)).is_none());
    }

    #[test]
    fn untracked_joint_is_not_mapped() {
        let mapper = ProjectionMapper::new(Box::new(ShiftProjection));
        assert!(mapper.map_joint(&Joint::untracked(JointKind::Wrist)).is_none());
    }
}
