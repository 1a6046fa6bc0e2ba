use std::{fmt, time::Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Color,
    Depth,
    Ir,
}

impl StreamKind {
    pub fn label(&self) -> &'static str {
        match self {
            StreamKind::Color => "color",
            StreamKind::Depth => "depth",
            StreamKind::Ir => "ir",
        }
    }

    /// Pixel format requested when copying this stream out of a frame.
    pub fn target_format(&self) -> PixelFormat {
        match self {
            StreamKind::Color => PixelFormat::Rgb32,
            StreamKind::Depth => PixelFormat::DepthRaw,
            StreamKind::Ir => PixelFormat::Y8,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamSpec {
    pub kind: StreamKind,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl StreamSpec {
    pub fn new(kind: StreamKind, width: u32, height: u32, fps: u32) -> Self {
        Self {
            kind,
            width,
            height,
            fps,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32-bit BGRA, alpha ignored.
    Rgb32,
    /// 16-bit little-endian depth in millimetres.
    DepthRaw,
    /// 8-bit single channel.
    Y8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb32 => 4,
            PixelFormat::DepthRaw => 2,
            PixelFormat::Y8 => 1,
        }
    }

    pub fn min_stride(&self, width: u32) -> usize {
        width as usize * self.bytes_per_pixel()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Pixel payload copied out of a frame; owns its bytes.
#[derive(Clone, Debug)]
pub struct StreamBuffer {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub format: PixelFormat,
    pub bytes: Vec<u8>,
}

impl StreamBuffer {
    pub fn rect(&self) -> Rect {
        Rect::full(self.width, self.height)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

pub const JOINT_COUNT: usize = 22;

/// Tracked hand joints in the order the hand module enumerates them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JointKind {
    Wrist,
    Center,
    ThumbBase,
    ThumbJt1,
    ThumbJt2,
    ThumbTip,
    IndexBase,
    IndexJt1,
    IndexJt2,
    IndexTip,
    MiddleBase,
    MiddleJt1,
    MiddleJt2,
    MiddleTip,
    RingBase,
    RingJt1,
    RingJt2,
    RingTip,
    PinkyBase,
    PinkyJt1,
    PinkyJt2,
    PinkyTip,
}

impl JointKind {
    pub const ALL: [JointKind; JOINT_COUNT] = [
        JointKind::Wrist,
        JointKind::Center,
        JointKind::ThumbBase,
        JointKind::ThumbJt1,
        JointKind::ThumbJt2,
        JointKind::ThumbTip,
        JointKind::IndexBase,
        JointKind::IndexJt1,
        JointKind::IndexJt2,
        JointKind::IndexTip,
        JointKind::MiddleBase,
        JointKind::MiddleJt1,
        JointKind::MiddleJt2,
        JointKind::MiddleTip,
        JointKind::RingBase,
        JointKind::RingJt1,
        JointKind::RingJt2,
        JointKind::RingTip,
        JointKind::PinkyBase,
        JointKind::PinkyJt1,
        JointKind::PinkyJt2,
        JointKind::PinkyTip,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Finger index 0..5 (thumb..pinky) and segment 0..4 (base..tip); `None` for palm joints.
    pub fn finger_segment(&self) -> Option<(usize, usize)> {
        let idx = self.index();
        if idx < 2 {
            None
        } else {
            Some(((idx - 2) / 4, (idx - 2) % 4))
        }
    }
}

/// Raw output of a per-joint query.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct JointData {
    pub position_image: Point2,
    pub position_world: Point3,
    pub confidence: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Joint {
    pub kind: JointKind,
    pub image: Point2,
    pub world: Point3,
    /// False when the per-joint query failed; the slot is kept but never drawn.
    pub tracked: bool,
}

impl Joint {
    pub fn tracked(kind: JointKind, data: JointData) -> Self {
        Self {
            kind,
            image: data.position_image,
            world: data.position_world,
            tracked: true,
        }
    }

    pub fn untracked(kind: JointKind) -> Self {
        Self {
            kind,
            image: Point2::default(),
            world: Point3::default(),
            tracked: false,
        }
    }
}

/// Per-frame hand snapshot; identity does not carry across frames.
#[derive(Clone, Debug)]
pub struct Hand {
    pub index: usize,
    pub joints: Vec<Joint>,
}

impl Hand {
    pub fn tracked_joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter().filter(|joint| joint.tracked)
    }
}

/// 8-bit hand segmentation; 0xff marks hand pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentationMask {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub bytes: Vec<u8>,
}

impl SegmentationMask {
    pub fn foreground_pixels(&self) -> usize {
        let row_len = self.width as usize;
        self.bytes
            .chunks(self.stride.max(1))
            .take(self.height as usize)
            .map(|row| row.iter().take(row_len).filter(|&&px| px != 0).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.foreground_pixels() == 0
    }

    pub fn into_buffer(self) -> StreamBuffer {
        StreamBuffer {
            width: self.width,
            height: self.height,
            stride: self.stride,
            format: PixelFormat::Y8,
            bytes: self.bytes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GestureEvent {
    pub name: String,
    pub arrived: Instant,
}

impl GestureEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arrived: Instant::now(),
        }
    }
}

/// 8-bit BGRA color as written into BGRA32 canvases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { b, g, r, a: 255 }
    }

    pub const YELLOW_GREEN: Color = Color::rgb(154, 205, 50);

    pub fn to_bgra(self) -> [u8; 4] {
        [self.b, self.g, self.r, self.a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joint_enumeration_is_dense_and_ordered() {
        for (idx, kind) in JointKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), idx);
        }
        assert_eq!(JointKind::Wrist.finger_segment(), None);
        assert_eq!(JointKind::ThumbBase.finger_segment(), Some((0, 0)));
        assert_eq!(JointKind::PinkyTip.finger_segment(), Some((4, 3)));
    }

    #[test]
    fn foreground_count_ignores_row_padding() {
        let mask = SegmentationMask {
            width: 2,
            height: 2,
            stride: 4,
            bytes: vec![0xff, 0, 0xff, 0xff, 0, 0xff, 0xff, 0xff],
        };
        assert_eq!(mask.foreground_pixels(), 2);
        assert!(!mask.is_empty());
    }

    #[test]
    fn stream_formats_match_surfaces() {
        assert_eq!(StreamKind::Color.target_format().bytes_per_pixel(), 4);
        assert_eq!(StreamKind::Depth.target_format().bytes_per_pixel(), 2);
        assert_eq!(StreamKind::Ir.target_format().min_stride(640), 640);
    }
}
