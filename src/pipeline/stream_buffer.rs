use crate::{
    device::{DeviceError, ImageAccess, StreamImage},
    types::{PixelFormat, StreamBuffer},
};

/// Copies `pitch * height` bytes out of the image and releases access
/// before returning.
pub fn copy_out(image: &mut dyn StreamImage, format: PixelFormat) -> Result<StreamBuffer, DeviceError> {
    let access = ImageAccess::acquire(image, format)?;
    let info = access.info();
    let plane = access.plane().ok_or(DeviceError::NoPlane)?;

    let expected = plane.pitch * info.height as usize;
    if plane.data.len() < expected || plane.pitch < format.min_stride(info.width) {
        return Err(DeviceError::ShortBuffer {
            got: plane.data.len(),
            expected: expected.max(format.min_stride(info.width) * info.height as usize),
        });
    }

    let bytes = plane.data[..expected].to_vec();
    let stride = plane.pitch;
    drop(access);

    Ok(StreamBuffer {
        width: info.width,
        height: info.height,
        stride,
        format,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ImageInfo, ImagePlane};

    struct FakeImage {
        info: ImageInfo,
        pitch: usize,
        data: Vec<u8>,
        accessed: bool,
        releases: usize,
        fail: bool,
    }

    impl FakeImage {
        fn new(width: u32, height: u32, pitch: usize) -> Self {
            Self {
                info: ImageInfo {
                    width,
                    height,
                    format: PixelFormat::Y8,
                },
                pitch,
                data: (0..pitch * height as usize).map(|i| i as u8).collect(),
                accessed: false,
                releases: 0,
                fail: false,
            }
        }
    }

    impl StreamImage for FakeImage {
        fn info(&self) -> ImageInfo {
            self.info
        }

        fn begin_access(&mut self, format: PixelFormat) -> Result<(), DeviceError> {
            if self.fail {
                return Err(DeviceError::Access(format));
            }
            self.accessed = true;
            Ok(())
        }

        fn plane(&self) -> Option<ImagePlane<'_>> {
            self.accessed.then(|| ImagePlane {
                pitch: self.pitch,
                data: &self.data,
            })
        }

        fn end_access(&mut self) {
            self.accessed = false;
            self.releases += 1;
        }
    }

    #[test]
    fn copies_stride_times_height() {
        let mut image = FakeImage::new(5, 3, 8);
        let buffer = copy_out(&mut image, PixelFormat::Y8).unwrap();
        assert_eq!(buffer.bytes.len(), 8 * 3);
        assert_eq!(buffer.stride, 8);
        assert_eq!(buffer.rect().width, 5);
        assert_eq!(buffer.bytes[9], 9);
        assert!(!image.accessed);
        assert_eq!(image.releases, 1);
    }

    #[test]
    fn short_plane_still_releases_access() {
        let mut image = FakeImage::new(5, 3, 8);
        image.data.truncate(10);
        assert!(matches!(
            copy_out(&mut image, PixelFormat::Y8),
            Err(DeviceError::ShortBuffer { got: 10, .. })
        ));
        assert_eq!(image.releases, 1);
    }

    #[test]
    fn failed_acquire_emits_nothing() {
        let mut image = FakeImage::new(5, 3, 8);
        image.fail = true;
        assert_eq!(
            copy_out(&mut image, PixelFormat::Y8).unwrap_err(),
            DeviceError::Access(PixelFormat::Y8)
        );
        assert_eq!(image.releases, 0);
    }
}
