use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;

/// Model input size used by the bundled network.
pub const DEFAULT_TARGET_SIZE: (u32, u32) = (224, 224);

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("target size {0}x{1} is empty")]
    EmptyTarget(u32, u32),
}

/// A single RGB image as NHWC floats in `[0, 1]`, batch size one.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl ImageTensor {
    /// `[batch, height, width, channels]`
    pub fn dims(&self) -> [u64; 4] {
        [1, self.height as u64, self.width as u64, 3]
    }
}

pub trait ImageDecoder: Send + Sync {
    fn load_and_normalize(
        &self,
        path: &Path,
        target_size: (u32, u32),
    ) -> Result<ImageTensor, DecodeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RgbImageDecoder;

impl RgbImageDecoder {
    pub fn normalize(
        &self,
        image: &DynamicImage,
        (width, height): (u32, u32),
    ) -> Result<ImageTensor, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyTarget(width, height));
        }

        let resized = image
            .resize_exact(width, height, FilterType::CatmullRom)
            .to_rgb8();

        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for pixel in resized.pixels() {
            data.push(pixel[0] as f32 / 255.0);
            data.push(pixel[1] as f32 / 255.0);
            data.push(pixel[2] as f32 / 255.0);
        }

        Ok(ImageTensor {
            width,
            height,
            data,
        })
    }

    pub fn decode_bytes(
        &self,
        bytes: &[u8],
        target_size: (u32, u32),
    ) -> Result<ImageTensor, DecodeError> {
        let image = image::load_from_memory(bytes)?;
        self.normalize(&image, target_size)
    }
}

impl ImageDecoder for RgbImageDecoder {
    fn load_and_normalize(
        &self,
        path: &Path,
        target_size: (u32, u32),
    ) -> Result<ImageTensor, DecodeError> {
        let bytes = std::fs::read(path)?;
        self.decode_bytes(&bytes, target_size)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use image::{ImageBuffer, ImageOutputFormat, Luma, Rgb};

    use super::*;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x * 40 % 256) as u8, (y * 40 % 256) as u8, 255u8])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    #[test]
    fn output_has_target_shape_and_unit_range() {
        let tensor = RgbImageDecoder
            .decode_bytes(&png_bytes(5, 3), (8, 6))
            .unwrap();
        assert_eq!(tensor.data.len(), 8 * 6 * 3);
        assert_eq!(tensor.dims(), [1, 6, 8, 3]);
        assert!(tensor.data.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn grayscale_is_expanded_to_rgb() {
        let gray = ImageBuffer::from_pixel(4, 4, Luma([255u8]));
        let tensor = RgbImageDecoder
            .normalize(&DynamicImage::ImageLuma8(gray), (2, 2))
            .unwrap();
        assert_eq!(tensor.data.len(), 12);
        assert!(tensor.data.iter().all(|v| (v - 1.0).abs() < 1e-2));
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.png");
        std::fs::write(&path, png_bytes(3, 3)).unwrap();

        let tensor = RgbImageDecoder
            .load_and_normalize(&path, DEFAULT_TARGET_SIZE)
            .unwrap();
        assert_eq!(tensor.width, 224);
        assert_eq!(tensor.data.len(), 224 * 224 * 3);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = RgbImageDecoder
            .decode_bytes(b"not an image", (4, 4))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
    }

    #[test]
    fn empty_target_is_rejected() {
        let err = RgbImageDecoder
            .decode_bytes(&png_bytes(2, 2), (0, 4))
            .unwrap_err();
        assert!(matches!(err, DecodeError::EmptyTarget(0, 4)));
    }
}
