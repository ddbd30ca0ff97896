//! Conversion between style images and model tensors
//!
//! Tensors are NHWC (`[1, height, width, 3]`) with channel values in [-1, 1].

use super::StyleImage;
use crate::error::InferenceError;
use crate::inference::Tensor;

/// Pack an image into a single-batch tensor, remapping [0, 1] to [-1, 1].
pub fn image_to_tensor(image: &StyleImage) -> Tensor {
    let (w, h) = image.dimensions();
    let data: Vec<f32> = image
        .as_raw()
        .iter()
        .map(|&c| c.clamp(0.0, 1.0) * 2.0 - 1.0)
        .collect();
    Tensor::image_batch(w as usize, h as usize, data)
}

/// Unpack a single-batch tensor into an image, remapping [-1, 1] to [0, 1].
pub fn tensor_to_image(tensor: &Tensor) -> Result<StyleImage, InferenceError> {
    let [n, h, w, c] = tensor.shape();
    if n != 1 || c != 3 {
        return Err(InferenceError::ShapeMismatch {
            expected: [1, h, w, 3],
            actual: tensor.shape().to_vec(),
        });
    }
    let data: Vec<f32> = tensor
        .data()
        .iter()
        .map(|&v| (v * 0.5 + 0.5).clamp(0.0, 1.0))
        .collect();
    StyleImage::from_raw(w as u32, h as u32, data)
        .ok_or_else(|| InferenceError::Decode("tensor length does not match its shape".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylize::gray_image_from_fn;

    #[test]
    fn test_tensor_layout_and_range() {
        let img = gray_image_from_fn(4, 2, |x, y| if (x, y) == (3, 1) { 1.0 } else { 0.0 });
        let t = image_to_tensor(&img);
        assert_eq!(t.shape(), [1, 2, 4, 3]);
        assert_eq!(t.data()[0], -1.0);
        let idx = (1 * 4 + 3) * 3;
        assert_eq!(t.data()[idx], 1.0);
        assert_eq!(t.data()[idx + 2], 1.0);

        let back = tensor_to_image(&t).unwrap();
        assert_eq!(back.get_pixel(3, 1)[1], 1.0);
        assert_eq!(back.get_pixel(0, 0)[0], 0.0);
    }

    #[test]
    fn test_out_of_range_output_is_clamped() {
        let t = Tensor::new([1, 1, 1, 3], vec![-3.0, 0.0, 5.0]).unwrap();
        let img = tensor_to_image(&t).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [0.0, 0.5, 1.0]);
    }
}
