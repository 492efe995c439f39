//! Composable per-item transforms applied when a sample is fetched.
//!
//! A transform is a value, built once and handed to the data module; there is
//! no shared pipeline state. Steps are chained with [`TransformExt::then`]:
//!
//! ```ignore
//! let pipeline = Resize::new(256)
//!     .then(CenterCrop::new(224))
//!     .then(ToTensor)
//!     .then(Normalize::imagenet());
//! ```

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use rand::Rng;

use crate::error::Result;

use super::convert::{center_crop, IMAGE_SIZE_BEFORE_CROP, IMAGE_SIZE_FOR_NN, NORMALIZE_MEAN, NORMALIZE_STD};
use super::tensor::ImageTensor;

/// A single processing step from `I` to `Self::Output`
pub trait Transform<I>: Send + Sync {
    type Output;

    fn apply(&self, input: I) -> Result<Self::Output>;
}

pub trait TransformExt<I>: Transform<I> + Sized {
    /// Run `next` on the output of this transform
    fn then<B>(self, next: B) -> Then<Self, B>
    where
        B: Transform<Self::Output>,
    {
        Then {
            first: self,
            second: next,
        }
    }
}

impl<I, T: Transform<I>> TransformExt<I> for T {}

/// Two transforms run one after the other
#[derive(Debug, Clone)]
pub struct Then<A, B> {
    first: A,
    second: B,
}

impl<I, A, B> Transform<I> for Then<A, B>
where
    A: Transform<I>,
    B: Transform<A::Output>,
{
    type Output = B::Output;

    fn apply(&self, input: I) -> Result<B::Output> {
        self.second.apply(self.first.apply(input)?)
    }
}

/// Pass-through, used when a subset is built without a transform
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<I> Transform<I> for Identity {
    type Output = I;

    fn apply(&self, input: I) -> Result<I> {
        Ok(input)
    }
}

/// Wraps an arbitrary function as a transform
#[derive(Clone)]
pub struct FnTransform<F>(F);

pub fn from_fn<F>(f: F) -> FnTransform<F> {
    FnTransform(f)
}

impl<I, O, F> Transform<I> for FnTransform<F>
where
    F: Fn(I) -> Result<O> + Send + Sync,
{
    type Output = O;

    fn apply(&self, input: I) -> Result<O> {
        (self.0)(input)
    }
}

/// Resize so the shorter edge equals `size`, keeping the aspect ratio
#[derive(Debug, Clone, Copy)]
pub struct Resize {
    size: u32,
}

impl Resize {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

impl Transform<DynamicImage> for Resize {
    type Output = DynamicImage;

    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Ok(img);
        }
        let (new_width, new_height) = if width <= height {
            let scaled = (self.size as u64 * height as u64 / width as u64) as u32;
            (self.size, scaled)
        } else {
            let scaled = (self.size as u64 * width as u64 / height as u64) as u32;
            (scaled, self.size)
        };
        if (new_width, new_height) == (width, height) {
            return Ok(img);
        }
        Ok(img.resize_exact(new_width, new_height, FilterType::Triangle))
    }
}

/// Crop a centred `size` x `size` square (zero-padded if the image is smaller)
#[derive(Debug, Clone, Copy)]
pub struct CenterCrop {
    size: u32,
}

impl CenterCrop {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

impl Transform<DynamicImage> for CenterCrop {
    type Output = DynamicImage;

    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(center_crop(&img, self.size, self.size))
    }
}

/// Random horizontal and vertical flips, redrawn on every call
#[derive(Debug, Clone, Copy)]
pub struct RandomFlip {
    pub horizontal_prob: f64,
    pub vertical_prob: f64,
}

impl Default for RandomFlip {
    fn default() -> Self {
        Self {
            horizontal_prob: 0.5,
            vertical_prob: 0.5,
        }
    }
}

impl Transform<DynamicImage> for RandomFlip {
    type Output = DynamicImage;

    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let mut rng = rand::thread_rng();
        let mut result = img;
        if rng.gen_bool(self.horizontal_prob.clamp(0.0, 1.0)) {
            result = result.fliph();
        }
        if rng.gen_bool(self.vertical_prob.clamp(0.0, 1.0)) {
            result = result.flipv();
        }
        Ok(result)
    }
}

/// Image to CHW tensor in [0, 1]
#[derive(Debug, Clone, Copy, Default)]
pub struct ToTensor;

impl Transform<DynamicImage> for ToTensor {
    type Output = ImageTensor;

    fn apply(&self, img: DynamicImage) -> Result<ImageTensor> {
        Ok(ImageTensor::from_image(&img))
    }
}

/// Per-channel `(x - mean) / std`
#[derive(Debug, Clone)]
pub struct Normalize {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl Normalize {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Self {
        Self { mean, std }
    }

    pub fn imagenet() -> Self {
        Self::new(NORMALIZE_MEAN.to_vec(), NORMALIZE_STD.to_vec())
    }
}

impl Transform<ImageTensor> for Normalize {
    type Output = ImageTensor;

    fn apply(&self, tensor: ImageTensor) -> Result<ImageTensor> {
        tensor.normalize(&self.mean, &self.std)
    }
}

/// Resize, center crop, tensor, normalize: the inference preprocessing
pub type Preprocess = Then<Then<Then<Resize, CenterCrop>, ToTensor>, Normalize>;

/// `Preprocess` with random flips before the tensor conversion
pub type Augmentation = Then<Then<Then<Then<Resize, CenterCrop>, RandomFlip>, ToTensor>, Normalize>;

/// Resize, tensor, normalize: used for already-cropped dataset images
pub type TransformImage = Then<Then<Resize, ToTensor>, Normalize>;

pub fn transform() -> Preprocess {
    Resize::new(IMAGE_SIZE_BEFORE_CROP)
        .then(CenterCrop::new(IMAGE_SIZE_FOR_NN))
        .then(ToTensor)
        .then(Normalize::imagenet())
}

pub fn augmentation() -> Augmentation {
    Resize::new(IMAGE_SIZE_BEFORE_CROP)
        .then(CenterCrop::new(IMAGE_SIZE_FOR_NN))
        .then(RandomFlip::default())
        .then(ToTensor)
        .then(Normalize::imagenet())
}

pub fn transform_image() -> TransformImage {
    Resize::new(IMAGE_SIZE_FOR_NN)
        .then(ToTensor)
        .then(Normalize::imagenet())
}
