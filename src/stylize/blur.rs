//! Gaussian blur approximated by three successive box blurs
//!
//! Each box pass is separable (rows, then columns) and uses a running sum
//! with clamp-to-edge sampling. Rows are processed in parallel with rayon.

use rayon::prelude::*;

use super::StyleImage;

/// Box widths whose successive application approximates a Gaussian with
/// standard deviation `sigma`.
pub fn boxes_for_gauss(sigma: f32, passes: usize) -> Vec<usize> {
    let n = passes as f32;
    let w_ideal = (12.0 * sigma * sigma / n + 1.0).sqrt();
    let mut wl = w_ideal.floor() as i64;
    if wl % 2 == 0 {
        wl -= 1;
    }
    let wl = wl.max(1);
    let wu = wl + 2;

    let wlf = wl as f32;
    let m_ideal = (12.0 * sigma * sigma - n * wlf * wlf - 4.0 * n * wlf - 3.0 * n) / (-4.0 * wlf - 4.0);
    let m = m_ideal.round() as i64;

    (0..passes as i64)
        .map(|i| if i < m { wl as usize } else { wu as usize })
        .collect()
}

/// Blur every channel of `image` with the given radius (used as sigma).
pub fn gaussian_blur(image: &StyleImage, radius: u32) -> StyleImage {
    if radius == 0 {
        return image.clone();
    }
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return image.clone();
    }
    let boxes = boxes_for_gauss(radius as f32, 3);

    let mut out = image.clone();
    for channel in 0..3 {
        let mut plane: Vec<f32> = image.pixels().map(|p| p[channel]).collect();
        let mut scratch = vec![0.0f32; w * h];
        for &b in &boxes {
            let r = (b - 1) / 2;
            box_blur_rows(&plane, &mut scratch, w, r);
            let mut transposed = transpose(&scratch, w, h);
            let mut column_scratch = vec![0.0f32; w * h];
            box_blur_rows(&transposed, &mut column_scratch, h, r);
            std::mem::swap(&mut transposed, &mut column_scratch);
            plane = transpose(&transposed, h, w);
        }
        for (px, v) in out.pixels_mut().zip(plane) {
            px[channel] = v;
        }
    }
    out
}

fn box_blur_rows(src: &[f32], dst: &mut [f32], row_len: usize, r: usize) {
    dst.par_chunks_mut(row_len)
        .zip(src.par_chunks(row_len))
        .for_each(|(out_row, in_row)| blur_row(in_row, out_row, r));
}

fn blur_row(src: &[f32], dst: &mut [f32], r: usize) {
    let last = src.len() as isize - 1;
    let at = |i: isize| src[i.clamp(0, last) as usize];
    let r = r as isize;
    let norm = 1.0 / (2 * r + 1) as f32;

    let mut acc: f32 = (-r..=r).map(at).sum();
    for (x, out) in dst.iter_mut().enumerate() {
        let x = x as isize;
        *out = acc * norm;
        acc += at(x + r + 1) - at(x - r);
    }
}

fn transpose(src: &[f32], w: usize, h: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            out[x * h + y] = src[y * w + x];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stylize::{gray_image_from_fn, uniform_image};

    #[test]
    fn test_boxes_for_gauss() {
        assert_eq!(boxes_for_gauss(15.0, 3), vec![29, 29, 31]);
        assert_eq!(boxes_for_gauss(1.0, 3), vec![1, 1, 3]);
        for b in boxes_for_gauss(8.0, 3) {
            assert_eq!(b % 2, 1);
        }
    }

    #[test]
    fn test_uniform_image_unchanged() {
        let img = uniform_image(64, 64, 0.4);
        let blurred = gaussian_blur(&img, 10);
        for px in blurred.pixels() {
            assert!((px[0] - 0.4).abs() < 1e-4);
        }
    }

    #[test]
    fn test_blur_smooths_step() {
        let img = gray_image_from_fn(64, 16, |x, _| if x < 32 { 0.0 } else { 1.0 });
        let blurred = gaussian_blur(&img, 4);
        let left = blurred.get_pixel(31, 8)[0];
        let right = blurred.get_pixel(32, 8)[0];
        assert!(left > 0.0 && left < 0.5);
        assert!(right > 0.5 && right < 1.0);
        assert!(blurred.get_pixel(0, 8)[0] < 1e-4);
        assert!((blurred.get_pixel(63, 8)[0] - 1.0).abs() < 1e-4);
    }
}
