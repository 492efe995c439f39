use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use crate::error::{DataError, Result};

/// Float image in channel-first (CHW) layout
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    channels: usize,
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl ImageTensor {
    pub fn new(channels: usize, height: usize, width: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != channels * height * width {
            return Err(DataError::ShapeMismatch {
                expected: vec![channels, height, width],
                actual: vec![data.len()],
            });
        }
        Ok(Self {
            channels,
            height,
            width,
            data,
        })
    }

    /// Convert an image to a 3-channel tensor with values in [0, 1]
    pub fn from_image(img: &DynamicImage) -> Self {
        let rgb = img.to_rgb8();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        let plane = width * height;
        let mut data = vec![0.0f32; 3 * plane];

        for (x, y, pixel) in rgb.enumerate_pixels() {
            let offset = y as usize * width + x as usize;
            for c in 0..3 {
                data[c * plane + offset] = pixel[c] as f32 / 255.0;
            }
        }

        Self {
            channels: 3,
            height,
            width,
            data,
        }
    }

    /// Convert back to an 8-bit RGB image, clamping values to [0, 1].
    ///
    /// Single-channel tensors are replicated across the three channels.
    pub fn to_image(&self) -> Result<DynamicImage> {
        if self.channels != 1 && self.channels != 3 {
            return Err(DataError::ShapeMismatch {
                expected: vec![3, self.height, self.width],
                actual: self.shape().to_vec(),
            });
        }

        let plane = self.width * self.height;
        let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let img = RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let offset = y as usize * self.width + x as usize;
            let channel = |c: usize| {
                let c = if self.channels == 1 { 0 } else { c };
                to_u8(self.data[c * plane + offset])
            };
            Rgb([channel(0), channel(1), channel(2)])
        });
        Ok(DynamicImage::ImageRgb8(img))
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// `(x - mean[c]) / std[c]` per channel
    pub fn normalize(mut self, mean: &[f32], std: &[f32]) -> Result<Self> {
        self.check_channel_params(mean, std)?;
        let plane = self.width * self.height;
        for (c, chunk) in self.data.chunks_mut(plane.max(1)).enumerate() {
            for v in chunk {
                *v = (*v - mean[c]) / std[c];
            }
        }
        Ok(self)
    }

    /// Undo `normalize` with the same parameters, for display
    pub fn denormalize(mut self, mean: &[f32], std: &[f32]) -> Result<Self> {
        self.check_channel_params(mean, std)?;
        let plane = self.width * self.height;
        for (c, chunk) in self.data.chunks_mut(plane.max(1)).enumerate() {
            for v in chunk {
                *v = *v * std[c] + mean[c];
            }
        }
        Ok(self)
    }

    fn check_channel_params(&self, mean: &[f32], std: &[f32]) -> Result<()> {
        if mean.len() != self.channels || std.len() != self.channels {
            return Err(DataError::ShapeMismatch {
                expected: vec![self.channels],
                actual: vec![mean.len(), std.len()],
            });
        }
        Ok(())
    }
}

/// A stack of equally-shaped tensors, `[n, c, h, w]`
#[derive(Debug, Clone, PartialEq)]
pub struct TensorBatch {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl TensorBatch {
    pub fn stack(tensors: &[ImageTensor]) -> Result<Self> {
        let item_shape = tensors.first().map(ImageTensor::shape).unwrap_or([0, 0, 0]);
        let mut data = Vec::with_capacity(tensors.len() * item_shape.iter().product::<usize>());

        for tensor in tensors {
            if tensor.shape() != item_shape {
                return Err(DataError::ShapeMismatch {
                    expected: item_shape.to_vec(),
                    actual: tensor.shape().to_vec(),
                });
            }
            data.extend_from_slice(tensor.data());
        }

        Ok(Self {
            shape: [tensors.len(), item_shape[0], item_shape[1], item_shape[2]],
            data,
        })
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.shape[0]
    }

    pub fn is_empty(&self) -> bool {
        self.shape[0] == 0
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Copy out item `index` as a standalone tensor
    pub fn get(&self, index: usize) -> Option<ImageTensor> {
        if index >= self.len() {
            return None;
        }
        let [_, c, h, w] = self.shape;
        let size = c * h * w;
        let data = self.data[index * size..(index + 1) * size].to_vec();
        Some(ImageTensor {
            channels: c,
            height: h,
            width: w,
            data,
        })
    }
}

/// Interleaved RGB bytes of an image, row-major (`[h, w, 3]`)
pub fn to_rgb_array(img: &DynamicImage) -> (Vec<u8>, [usize; 3]) {
    let (width, height) = img.dimensions();
    let rgb = img.to_rgb8();
    (rgb.into_raw(), [height as usize, width as usize, 3])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pixel_image() -> DynamicImage {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 51]));
        img.put_pixel(1, 0, Rgb([0, 255, 102]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_from_image_is_channel_first() {
        let tensor = ImageTensor::from_image(&two_pixel_image());
        assert_eq!(tensor.shape(), [3, 1, 2]);
        assert_eq!(tensor.data(), &[1.0, 0.0, 0.0, 1.0, 0.2, 0.4]);
    }

    #[test]
    fn test_to_image_clamps() {
        let tensor = ImageTensor::new(3, 1, 1, vec![1.5, -0.3, 0.5]).unwrap();
        let img = tensor.to_image().unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0), &Rgb([255, 0, 128]));
    }

    #[test]
    fn test_denormalize_inverts_normalize() {
        let mean = [0.485, 0.456, 0.406];
        let std = [0.229, 0.224, 0.225];
        let tensor = ImageTensor::from_image(&two_pixel_image());
        let restored = tensor
            .clone()
            .normalize(&mean, &std)
            .unwrap()
            .denormalize(&mean, &std)
            .unwrap();
        for (a, b) in tensor.data().iter().zip(restored.data()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_normalize_rejects_wrong_channel_count() {
        let tensor = ImageTensor::new(1, 1, 1, vec![0.5]).unwrap();
        assert!(tensor.normalize(&[0.5, 0.5, 0.5], &[1.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn test_stack_and_get() {
        let a = ImageTensor::new(1, 1, 2, vec![0.1, 0.2]).unwrap();
        let b = ImageTensor::new(1, 1, 2, vec![0.3, 0.4]).unwrap();
        let batch = TensorBatch::stack(&[a, b.clone()]).unwrap();
        assert_eq!(batch.shape(), [2, 1, 1, 2]);
        assert_eq!(batch.get(1), Some(b));
        assert_eq!(batch.get(2), None);

        let odd = ImageTensor::new(1, 2, 1, vec![0.0, 0.0]).unwrap();
        assert!(TensorBatch::stack(&[batch.get(0).unwrap(), odd]).is_err());
    }

    #[test]
    fn test_to_rgb_array() {
        let (bytes, shape) = to_rgb_array(&two_pixel_image());
        assert_eq!(shape, [1, 2, 3]);
        assert_eq!(bytes, vec![255, 0, 51, 0, 255, 102]);
    }
}
