use anyhow::{Context, Result, anyhow, bail};
use fast_image_resize as fir;
use nokhwa::utils::FrameFormat;
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_bgra, yuyv422_to_bgra,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

/// Tightly packed BGRA pixels, already mirrored when requested.
#[derive(Debug)]
pub struct BgraFrame {
    pub width: u32,
    pub height: u32,
    pub bgra: Vec<u8>,
}

/// Decodes one webcam buffer straight into the color stream layout.
pub fn decode_frame(
    format: FrameFormat,
    data: &[u8],
    width: u32,
    height: u32,
    mirror: bool,
) -> Result<BgraFrame> {
    if width == 0 || height == 0 {
        bail!("empty {format:?} frame");
    }

    let (width, height, bgra) = match format {
        FrameFormat::NV12 => (width, height, nv12_to_bgra(data, width, height, mirror)?),
        FrameFormat::YUYV => (width, height, yuyv_to_bgra(data, width, height, mirror)?),
        FrameFormat::MJPEG => mjpeg_to_bgra(data, mirror)?,
        FrameFormat::RAWRGB => (
            width,
            height,
            convert_rows("RGB", data, width, height, 3, mirror, |px| {
                [px[2], px[1], px[0], 255]
            })?,
        ),
        FrameFormat::RAWBGR => (
            width,
            height,
            convert_rows("BGR", data, width, height, 3, mirror, |px| {
                [px[0], px[1], px[2], 255]
            })?,
        ),
        FrameFormat::GRAY => (
            width,
            height,
            convert_rows("GRAY", data, width, height, 1, mirror, |px| {
                [px[0], px[0], px[0], 255]
            })?,
        ),
    };
    Ok(BgraFrame {
        width,
        height,
        bgra,
    })
}

/// Scales a decoded frame to the configured color mode.
pub fn fit_to(frame: BgraFrame, width: u32, height: u32) -> Result<Vec<u8>> {
    if (frame.width, frame.height) == (width, height) {
        return Ok(frame.bgra);
    }
    let src = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.bgra,
        fir::PixelType::U8x4,
    )?;
    let mut dst = fir::images::Image::new(width, height, fir::PixelType::U8x4);
    let options =
        fir::ResizeOptions::new().resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    fir::Resizer::new()
        .resize(&src, &mut dst, Some(&options))
        .context("webcam frame resize failed")?;
    Ok(dst.into_vec())
}

/// Per-pixel conversion into BGRA rows, writing mirrored positions directly.
fn convert_rows(
    label: &str,
    data: &[u8],
    width: u32,
    height: u32,
    channels: usize,
    mirror: bool,
    pixel: impl Fn(&[u8]) -> [u8; 4] + Sync,
) -> Result<Vec<u8>> {
    let (w, h) = (width as usize, height as usize);
    let expected = w * h * channels;
    if data.len() < expected {
        bail!("{label} buffer too small: got {}, expected {expected}", data.len());
    }

    let mut bgra = vec![0u8; w * h * 4];
    bgra.par_chunks_exact_mut(w * 4)
        .zip(data[..expected].par_chunks_exact(w * channels))
        .for_each(|(dst, src)| {
            for (x, px) in src.chunks_exact(channels).enumerate() {
                let to = if mirror { w - 1 - x } else { x };
                dst[to * 4..to * 4 + 4].copy_from_slice(&pixel(px));
            }
        });
    Ok(bgra)
}

// Reversing a row reverses the pixel order and each pixel's bytes; the second
// reverse restores channel order.
fn mirror_rows(bgra: &mut [u8], width: u32) {
    bgra.par_chunks_exact_mut(width as usize * 4).for_each(|row| {
        row.reverse();
        row.chunks_exact_mut(4).for_each(<[u8]>::reverse);
    });
}

fn nv12_to_bgra(data: &[u8], width: u32, height: u32, mirror: bool) -> Result<Vec<u8>> {
    let y_len = width as usize * height as usize;
    let uv_len = y_len / 2;
    if data.len() < y_len + uv_len {
        bail!("NV12 buffer too small: got {}, expected {}", data.len(), y_len + uv_len);
    }

    let mut bgra = vec![0u8; y_len * 4];
    let planes = YuvBiPlanarImage {
        y_plane: &data[..y_len],
        y_stride: width,
        uv_plane: &data[y_len..y_len + uv_len],
        uv_stride: width,
        width,
        height,
    };
    yuv_nv12_to_bgra(
        &planes,
        &mut bgra,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12 conversion failed: {err:?}"))?;
    if mirror {
        mirror_rows(&mut bgra, width);
    }
    Ok(bgra)
}

fn yuyv_to_bgra(data: &[u8], width: u32, height: u32, mirror: bool) -> Result<Vec<u8>> {
    let expected = width as usize * height as usize * 2;
    if data.len() < expected {
        bail!("YUYV buffer too small: got {}, expected {expected}", data.len());
    }

    let mut bgra = vec![0u8; width as usize * height as usize * 4];
    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };
    yuyv422_to_bgra(
        &packed,
        &mut bgra,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV conversion failed: {err:?}"))?;
    if mirror {
        mirror_rows(&mut bgra, width);
    }
    Ok(bgra)
}

/// MJPEG frames carry their own dimensions.
fn mjpeg_to_bgra(data: &[u8], mirror: bool) -> Result<(u32, u32, Vec<u8>)> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;
    let info = decoder
        .info()
        .ok_or_else(|| anyhow!("MJPEG decoder reported no image info"))?;
    let width = u32::try_from(info.width).map_err(|_| anyhow!("MJPEG width out of range"))?;
    let height = u32::try_from(info.height).map_err(|_| anyhow!("MJPEG height out of range"))?;
    if width == 0 || height == 0 {
        bail!("MJPEG frame has no pixels");
    }
    let bgra = convert_rows("MJPEG", &rgba, width, height, 4, mirror, |px| {
        [px[2], px[1], px[0], px[3]]
    })?;
    Ok((width, height, bgra))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_rgb_and_bgr_land_as_bgra() {
        let rgb = decode_frame(FrameFormat::RAWRGB, &[1, 2, 3, 4, 5, 6], 2, 1, false).unwrap();
        assert_eq!(rgb.bgra, vec![3, 2, 1, 255, 6, 5, 4, 255]);
        let bgr = decode_frame(FrameFormat::RAWBGR, &[1, 2, 3, 4, 5, 6], 2, 1, false).unwrap();
        assert_eq!(bgr.bgra, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn mirroring_happens_while_decoding() {
        let frame = decode_frame(FrameFormat::RAWRGB, &[1, 2, 3, 4, 5, 6], 2, 1, true).unwrap();
        assert_eq!(frame.bgra, vec![6, 5, 4, 255, 3, 2, 1, 255]);
        let gray = decode_frame(FrameFormat::GRAY, &[10, 20, 30, 40], 2, 2, true).unwrap();
        assert_eq!(
            gray.bgra,
            vec![20, 20, 20, 255, 10, 10, 10, 255, 40, 40, 40, 255, 30, 30, 30, 255]
        );
    }

    #[test]
    fn row_mirror_keeps_channel_order() {
        let mut bgra = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        mirror_rows(&mut bgra, 3);
        assert_eq!(bgra, vec![9, 10, 11, 12, 5, 6, 7, 8, 1, 2, 3, 4]);
    }

    #[test]
    fn short_gray_buffer_is_rejected() {
        assert!(decode_frame(FrameFormat::GRAY, &[0; 3], 2, 2, false).is_err());
    }

    #[test]
    fn frames_are_fitted_to_the_color_mode() {
        let frame = BgraFrame {
            width: 2,
            height: 2,
            bgra: [200, 100, 50, 255].repeat(4),
        };
        let fitted = fit_to(frame, 4, 3).unwrap();
        assert_eq!(fitted.len(), 4 * 3 * 4);
        assert!(fitted.chunks_exact(4).all(|px| px == [200, 100, 50, 255]));
    }
}
