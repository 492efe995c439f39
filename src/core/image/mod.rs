mod convert;
mod tensor;
pub mod transform;

pub use convert::{
    bgr_to_rgb, center_crop, crop_xy, image_preprocessing, RawImage, CROP_HEIGHT, CROP_WIDTH,
    IMAGE_SIZE_BEFORE_CROP, IMAGE_SIZE_FOR_NN, INITIAL_HEIGHT, INITIAL_WIDTH, NORMALIZE_MEAN,
    NORMALIZE_STD,
};
pub use tensor::{to_rgb_array, ImageTensor, TensorBatch};
pub use transform::{Identity, Transform, TransformExt};
