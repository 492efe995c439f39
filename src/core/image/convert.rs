//! Conversions between camera messages, images and tensors.

use image::imageops;
use image::{DynamicImage, GenericImageView, ImageBuffer, Luma, Pixel, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

use super::tensor::{ImageTensor, TensorBatch};
use super::transform::{self, Transform};

/// Width and height of the RGB and depth crops taken around a grasp point
pub const CROP_WIDTH: u32 = 50;
pub const CROP_HEIGHT: u32 = 50;
/// Side of the square image fed to the network
pub const IMAGE_SIZE_FOR_NN: u32 = 224;
pub const IMAGE_SIZE_BEFORE_CROP: u32 = 256;
/// Camera resolution
pub const INITIAL_WIDTH: u32 = 640;
pub const INITIAL_HEIGHT: u32 = 480;

/// ImageNet channel statistics used for normalization
pub const NORMALIZE_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const NORMALIZE_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A raw camera frame as published by the robot middleware
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    /// `rgb8`, `8UC3` or `16UC1`
    pub encoding: String,
    #[serde(default)]
    pub is_bigendian: bool,
    pub data: Vec<u8>,
}

impl RawImage {
    /// Decode the frame into an image; 16-bit frames (depth) become `Luma16`
    pub fn to_image(&self) -> Result<DynamicImage> {
        match self.encoding.as_str() {
            "rgb8" | "8UC3" => {
                if self.data.len() != self.width as usize * self.height as usize * 3 {
                    return Err(self.buffer_error());
                }
                let buffer = RgbImage::from_raw(self.width, self.height, self.data.clone())
                    .ok_or_else(|| self.buffer_error())?;
                Ok(DynamicImage::ImageRgb8(buffer))
            }
            "16UC1" => {
                if self.data.len() != self.width as usize * self.height as usize * 2 {
                    return Err(self.buffer_error());
                }
                let pixels: Vec<u16> = self
                    .data
                    .chunks_exact(2)
                    .map(|b| {
                        if self.is_bigendian {
                            u16::from_be_bytes([b[0], b[1]])
                        } else {
                            u16::from_le_bytes([b[0], b[1]])
                        }
                    })
                    .collect();
                let buffer = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(
                    self.width,
                    self.height,
                    pixels,
                )
                .ok_or_else(|| self.buffer_error())?;
                Ok(DynamicImage::ImageLuma16(buffer))
            }
            other => Err(DataError::UnsupportedEncoding(other.to_string())),
        }
    }

    fn buffer_error(&self) -> DataError {
        DataError::InvalidImageBuffer {
            width: self.width,
            height: self.height,
            encoding: self.encoding.clone(),
            actual: self.data.len(),
        }
    }
}

/// Crop a `crop_width` x `crop_height` window centred on `(x_center, y_center)`.
///
/// Parts of the window outside the image are filled with zeros, so the
/// centre pixel always lands at `(crop_width / 2, crop_height / 2)`.
pub fn crop_xy(
    img: &DynamicImage,
    x_center: u32,
    y_center: u32,
    crop_width: u32,
    crop_height: u32,
) -> DynamicImage {
    let left = i64::from(x_center) - i64::from(crop_width / 2);
    let top = i64::from(y_center) - i64::from(crop_height / 2);
    crop_padded(img, left, top, crop_width, crop_height)
}

/// Centred crop, zero-padded evenly when the image is smaller than the crop
pub fn center_crop(img: &DynamicImage, crop_width: u32, crop_height: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let left = centred_offset(width, crop_width);
    let top = centred_offset(height, crop_height);
    crop_padded(img, left, top, crop_width, crop_height)
}

fn centred_offset(size: u32, crop: u32) -> i64 {
    if size >= crop {
        i64::from((size - crop) / 2)
    } else {
        -i64::from((crop - size) / 2)
    }
}

/// Window with top-left corner `(left, top)` in image coordinates, which may
/// lie outside the image
fn crop_padded(img: &DynamicImage, left: i64, top: i64, width: u32, height: u32) -> DynamicImage {
    let (x, y) = (-left, -top);
    let (w, h) = (width, height);
    match img {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(paste(buf, x, y, w, h)),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(paste(buf, x, y, w, h)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(paste(buf, x, y, w, h)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(paste(buf, x, y, w, h)),
        DynamicImage::ImageLuma16(buf) => DynamicImage::ImageLuma16(paste(buf, x, y, w, h)),
        DynamicImage::ImageLumaA16(buf) => DynamicImage::ImageLumaA16(paste(buf, x, y, w, h)),
        DynamicImage::ImageRgb16(buf) => DynamicImage::ImageRgb16(paste(buf, x, y, w, h)),
        DynamicImage::ImageRgba16(buf) => DynamicImage::ImageRgba16(paste(buf, x, y, w, h)),
        DynamicImage::ImageRgb32F(buf) => DynamicImage::ImageRgb32F(paste(buf, x, y, w, h)),
        DynamicImage::ImageRgba32F(buf) => DynamicImage::ImageRgba32F(paste(buf, x, y, w, h)),
        other => DynamicImage::ImageRgba8(paste(&other.to_rgba8(), x, y, w, h)),
    }
}

/// Copy `buf` onto a zeroed `width` x `height` canvas at `(x, y)`
fn paste<P: Pixel>(
    buf: &ImageBuffer<P, Vec<P::Subpixel>>,
    x: i64,
    y: i64,
    width: u32,
    height: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let mut canvas = ImageBuffer::new(width, height);
    imageops::replace(&mut canvas, buf, x, y);
    canvas
}

/// Swap the channel order of an OpenCV-style BGR buffer into RGB
pub fn bgr_to_rgb(img: &RgbImage) -> RgbImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel.0.swap(0, 2);
    }
    out
}

/// Apply the network preprocessing and add a batch dimension of one
pub fn image_preprocessing(img: DynamicImage) -> Result<TensorBatch> {
    let tensor: ImageTensor = transform::transform().apply(img)?;
    TensorBatch::stack(&[tensor])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_raw_rgb8_to_image() {
        let raw = RawImage {
            width: 2,
            height: 1,
            encoding: "rgb8".to_string(),
            is_bigendian: false,
            data: vec![1, 2, 3, 4, 5, 6],
        };
        let img = raw.to_image().unwrap().to_rgb8();
        assert_eq!(img.get_pixel(1, 0), &Rgb([4, 5, 6]));
    }

    #[test]
    fn test_raw_depth_to_image() {
        let raw = RawImage {
            width: 1,
            height: 2,
            encoding: "16UC1".to_string(),
            is_bigendian: false,
            data: vec![0x34, 0x12, 0xff, 0x00],
        };
        match raw.to_image().unwrap() {
            DynamicImage::ImageLuma16(buffer) => {
                assert_eq!(buffer.get_pixel(0, 0), &Luma([0x1234]));
                assert_eq!(buffer.get_pixel(0, 1), &Luma([0x00ff]));
            }
            other => panic!("expected Luma16, got {:?}", other.color()),
        }
    }

    #[test]
    fn test_raw_image_errors() {
        let mut raw = RawImage {
            width: 2,
            height: 2,
            encoding: "rgb8".to_string(),
            is_bigendian: false,
            data: vec![0; 5],
        };
        assert!(matches!(
            raw.to_image(),
            Err(DataError::InvalidImageBuffer { actual: 5, .. })
        ));

        raw.encoding = "bgra8".to_string();
        assert!(matches!(raw.to_image(), Err(DataError::UnsupportedEncoding(_))));
    }

    #[test]
    fn test_center_crop_size() {
        let img = DynamicImage::new_rgb8(INITIAL_WIDTH, INITIAL_HEIGHT);
        let cropped = center_crop(&img, CROP_WIDTH, CROP_HEIGHT);
        assert_eq!(cropped.dimensions(), (CROP_WIDTH, CROP_HEIGHT));
    }

    #[test]
    fn test_raw_rgb8_rejects_oversized_buffer() {
        let raw = RawImage {
            width: 1,
            height: 1,
            encoding: "8UC3".to_string(),
            is_bigendian: false,
            data: vec![0; 9],
        };
        assert!(matches!(
            raw.to_image(),
            Err(DataError::InvalidImageBuffer { actual: 9, .. })
        ));
    }

    #[test]
    fn test_crop_xy_keeps_grasp_point_centred_at_border() {
        let mut rgb = RgbImage::new(100, 80);
        rgb.put_pixel(5, 40, Rgb([255, 0, 0]));
        rgb.put_pixel(6, 40, Rgb([0, 255, 0]));
        let img = DynamicImage::ImageRgb8(rgb);

        let cropped = crop_xy(&img, 5, 40, CROP_WIDTH, CROP_HEIGHT).to_rgb8();
        assert_eq!(cropped.dimensions(), (CROP_WIDTH, CROP_HEIGHT));
        assert_eq!(cropped.get_pixel(25, 25), &Rgb([255, 0, 0]));
        assert_eq!(cropped.get_pixel(26, 25), &Rgb([0, 255, 0]));
        // Left of the image border is padding
        assert_eq!(cropped.get_pixel(0, 25), &Rgb([0, 0, 0]));
        assert_eq!(cropped.get_pixel(19, 25), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_crop_xy_keeps_depth_precision() {
        let mut depth = ImageBuffer::<Luma<u16>, Vec<u16>>::new(10, 10);
        depth.put_pixel(9, 0, Luma([4321]));
        let cropped = crop_xy(&DynamicImage::ImageLuma16(depth), 9, 0, 4, 4);
        match cropped {
            DynamicImage::ImageLuma16(buffer) => {
                assert_eq!(buffer.dimensions(), (4, 4));
                assert_eq!(buffer.get_pixel(2, 2), &Luma([4321]));
                assert_eq!(buffer.get_pixel(3, 3), &Luma([0]));
            }
            other => panic!("expected Luma16, got {:?}", other.color()),
        }
    }

    #[test]
    fn test_center_crop_pads_small_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([9, 9, 9])));
        let cropped = center_crop(&img, 4, 4).to_rgb8();
        assert_eq!(cropped.dimensions(), (4, 4));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(cropped.get_pixel(1, 1), &Rgb([9, 9, 9]));
        assert_eq!(cropped.get_pixel(2, 2), &Rgb([9, 9, 9]));
        assert_eq!(cropped.get_pixel(3, 3), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_bgr_to_rgb() {
        let img = RgbImage::from_pixel(1, 1, Rgb([10, 20, 30]));
        assert_eq!(bgr_to_rgb(&img).get_pixel(0, 0), &Rgb([30, 20, 10]));
    }

    #[test]
    fn test_image_preprocessing_shape() {
        let batch = image_preprocessing(DynamicImage::new_rgb8(INITIAL_WIDTH, INITIAL_HEIGHT)).unwrap();
        assert_eq!(
            batch.shape(),
            [1, 3, IMAGE_SIZE_FOR_NN as usize, IMAGE_SIZE_FOR_NN as usize]
        );
    }
}
