use std::collections::HashMap;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, RgbaImage};
use rayon::prelude::*;

use super::{IndicatorId, PresentationSurface, SurfaceId};
use crate::types::{Color, PixelFormat, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceLayout {
    pub id: SurfaceId,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl SurfaceLayout {
    pub fn new(id: SurfaceId, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            id,
            width,
            height,
            format,
        }
    }
}

struct Canvas {
    layout: SurfaceLayout,
    stride: usize,
    bytes: Vec<u8>,
}

impl Canvas {
    fn new(layout: SurfaceLayout) -> Self {
        let stride = layout.format.min_stride(layout.width);
        Self {
            layout,
            stride,
            bytes: vec![0u8; stride * layout.height as usize],
        }
    }

    fn write_rect(&mut self, rect: Rect, stride: usize, bytes: &[u8]) -> Result<(), String> {
        let bpp = self.layout.format.bytes_per_pixel();
        if rect.x + rect.width > self.layout.width || rect.y + rect.height > self.layout.height {
            return Err(format!(
                "rect {}x{}+{}+{} exceeds {}x{} canvas",
                rect.width, rect.height, rect.x, rect.y, self.layout.width, self.layout.height
            ));
        }
        let row_bytes = rect.width as usize * bpp;
        let needed = stride * rect.height.saturating_sub(1) as usize + row_bytes;
        if stride < row_bytes || bytes.len() < needed {
            return Err(format!(
                "buffer too small: got {} bytes with stride {stride}, expected {needed}",
                bytes.len()
            ));
        }

        let x_offset = rect.x as usize * bpp;
        let dst_stride = self.stride;
        self.bytes
            .par_chunks_mut(dst_stride)
            .skip(rect.y as usize)
            .take(rect.height as usize)
            .enumerate()
            .for_each(|(row, dst)| {
                let src = &bytes[row * stride..row * stride + row_bytes];
                dst[x_offset..x_offset + row_bytes].copy_from_slice(src);
            });
        Ok(())
    }

    fn draw_circle(&mut self, center: (i32, i32), radius: i32, color: [u8; 4]) {
        let (cx, cy) = center;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.put_pixel_safe(cx + dx, cy + dy, color);
                }
            }
        }
    }

    fn put_pixel_safe(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 {
            return;
        }
        let (ux, uy) = (x as u32, y as u32);
        if ux >= self.layout.width || uy >= self.layout.height {
            return;
        }
        let idx = uy as usize * self.stride + ux as usize * 4;
        if idx + 3 < self.bytes.len() {
            self.bytes[idx..idx + 4].copy_from_slice(&color);
        }
    }

    fn packed_rows(&self) -> Vec<u8> {
        let row_bytes = self.layout.format.min_stride(self.layout.width);
        self.bytes
            .chunks(self.stride)
            .flat_map(|row| row[..row_bytes].iter().copied())
            .collect()
    }

    fn to_image(&self) -> Option<DynamicImage> {
        let (width, height) = (self.layout.width, self.layout.height);
        let packed = self.packed_rows();
        match self.layout.format {
            PixelFormat::Rgb32 => {
                let mut rgba = packed;
                rgba.par_chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
                RgbaImage::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
            }
            PixelFormat::DepthRaw => {
                let depth: Vec<u16> = packed
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, depth)
                    .map(DynamicImage::ImageLuma16)
            }
            PixelFormat::Y8 => GrayImage::from_raw(width, height, packed).map(DynamicImage::ImageLuma8),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceCounters {
    pub replacements: u64,
    pub markers: u64,
    pub clears: u64,
}

/// In-memory surfaces owned by the presentation thread.
pub struct CanvasSurface {
    canvases: HashMap<SurfaceId, Canvas>,
    counters: HashMap<SurfaceId, SurfaceCounters>,
    indicators: HashMap<IndicatorId, bool>,
    label: String,
}

impl CanvasSurface {
    pub fn new(
        layouts: &[SurfaceLayout],
        indicators: impl IntoIterator<Item = IndicatorId>,
    ) -> Self {
        Self {
            canvases: layouts
                .iter()
                .map(|layout| (layout.id, Canvas::new(*layout)))
                .collect(),
            counters: HashMap::new(),
            indicators: indicators.into_iter().map(|id| (id, false)).collect(),
            label: String::new(),
        }
    }

    pub fn counters(&self, id: SurfaceId) -> SurfaceCounters {
        self.counters.get(&id).copied().unwrap_or_default()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_indicator_visible(&self, indicator: &IndicatorId) -> bool {
        self.indicators.get(indicator).copied().unwrap_or(false)
    }

    pub fn visible_indicators(&self) -> Vec<&IndicatorId> {
        let mut visible: Vec<&IndicatorId> = self
            .indicators
            .iter()
            .filter(|(_, visible)| **visible)
            .map(|(id, _)| id)
            .collect();
        visible.sort_by(|a, b| a.0.cmp(&b.0));
        visible
    }

    /// Copy of a surface as an `image` buffer; BGRA canvases come back as RGBA.
    pub fn to_image(&self, id: SurfaceId) -> Option<DynamicImage> {
        self.canvases.get(&id).and_then(Canvas::to_image)
    }

    fn counters_mut(&mut self, id: SurfaceId) -> &mut SurfaceCounters {
        self.counters.entry(id).or_default()
    }
}

impl PresentationSurface for CanvasSurface {
    fn replace_buffer(&mut self, surface: SurfaceId, rect: Rect, stride: usize, bytes: &[u8]) {
        let Some(canvas) = self.canvases.get_mut(&surface) else {
            log::debug!("no {surface:?} surface, dropping buffer");
            return;
        };
        match canvas.write_rect(rect, stride, bytes) {
            Ok(()) => self.counters_mut(surface).replacements += 1,
            Err(err) => log::warn!("rejected {surface:?} buffer: {err}"),
        }
    }

    fn draw_marker(&mut self, surface: SurfaceId, x: i32, y: i32, radius: i32, color: Color) {
        let Some(canvas) = self.canvases.get_mut(&surface) else {
            log::debug!("no {surface:?} surface, dropping marker");
            return;
        };
        if canvas.layout.format != PixelFormat::Rgb32 {
            log::debug!("markers are only drawn on BGRA surfaces, skipping {surface:?}");
            return;
        }
        canvas.draw_circle((x, y), radius, color.to_bgra());
        self.counters_mut(surface).markers += 1;
    }

    fn clear(&mut self, surface: SurfaceId) {
        if let Some(canvas) = self.canvases.get_mut(&surface) {
            canvas.bytes.fill(0);
            self.counters_mut(surface).clears += 1;
        }
    }

    fn set_indicator_visible(&mut self, indicator: &IndicatorId, visible: bool) {
        match self.indicators.get_mut(indicator) {
            Some(state) => *state = visible,
            None => log::debug!("unknown indicator {indicator}"),
        }
    }

    fn set_label(&mut self, text: &str) {
        self.label.clear();
        self.label.push_str(text);
    }
}
