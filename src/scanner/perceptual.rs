//! Perceptual image hashing.
//!
//! This module provides the difference hash (dHash) used to fingerprint
//! assets. The image is reduced to a 9x8 grayscale grid and each row yields
//! eight left/right brightness comparisons, for 64 bits in total.
//!
//! Hashes are compared for equality only during duplicate detection.
//! [`hamming_distance`] is exported for callers that want a similarity
//! measure, but nothing in the detection pipeline uses it.

use image::imageops::{self, FilterType};
use image::DynamicImage;

/// Width of the downsampled grid (one more than the comparisons per row).
pub const DHASH_WIDTH: u32 = 9;

/// Height of the downsampled grid.
pub const DHASH_HEIGHT: u32 = 8;

/// Compute the 64-bit difference hash of an image.
///
/// Bit `i` is set, scanning row-major with eight bits per row, when the left
/// pixel of the pair is strictly brighter than its right neighbour.
///
/// An image without pixels hashes to `0`. Zero is a valid hash value, not a
/// failure marker.
///
/// # Example
///
/// ```
/// use image::{DynamicImage, GrayImage, Luma};
/// use photoprune::scanner::perceptual::dhash64;
///
/// // Brightness falls off to the right, so every comparison sets its bit.
/// let img = GrayImage::from_fn(9, 8, |x, _| Luma([255 - (x as u8) * 20]));
/// assert_eq!(dhash64(&DynamicImage::ImageLuma8(img)), u64::MAX);
/// ```
#[must_use]
pub fn dhash64(image: &DynamicImage) -> u64 {
    let gray = image.to_luma8();
    if gray.width() == 0 || gray.height() == 0 {
        return 0;
    }

    let grid = if gray.dimensions() == (DHASH_WIDTH, DHASH_HEIGHT) {
        gray
    } else {
        imageops::resize(&gray, DHASH_WIDTH, DHASH_HEIGHT, FilterType::Triangle)
    };

    let mut hash = 0u64;
    let mut bit = 0u32;
    for y in 0..DHASH_HEIGHT {
        for x in 0..DHASH_WIDTH - 1 {
            let left = grid.get_pixel(x, y)[0];
            let right = grid.get_pixel(x + 1, y)[0];
            if left > right {
                hash |= 1 << bit;
            }
            bit += 1;
        }
    }
    hash
}

/// Count of differing bits between two hashes.
#[must_use]
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    #[test]
    fn test_empty_image_hashes_to_zero() {
        let img = DynamicImage::new_rgb8(0, 0);
        assert_eq!(dhash64(&img), 0);
    }

    #[test]
    fn test_uniform_image_hashes_to_zero() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, image::Rgb([90, 90, 90])));
        assert_eq!(dhash64(&img), 0);
    }

    #[test]
    fn test_increasing_gradient_hashes_to_zero() {
        let img = GrayImage::from_fn(9, 8, |x, _| Luma([(x as u8) * 20]));
        assert_eq!(dhash64(&DynamicImage::ImageLuma8(img)), 0);
    }

    #[test]
    fn test_bit_order_is_row_major() {
        // Only the first pair of the last row is a falling edge.
        let img = GrayImage::from_fn(9, 8, |x, y| {
            if y == 7 && x == 0 {
                Luma([200])
            } else {
                Luma([100])
            }
        });
        assert_eq!(dhash64(&DynamicImage::ImageLuma8(img)), 1 << 56);
    }

    #[test]
    fn test_downsampled_blocks_keep_direction() {
        // 90 pixels wide, ten columns per block, brightness falling by block.
        let img = GrayImage::from_fn(90, 80, |x, _| Luma([250 - (x / 10) as u8 * 25]));
        assert_eq!(dhash64(&DynamicImage::ImageLuma8(img)), u64::MAX);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let img = RgbImage::from_fn(37, 23, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8])
        });
        let img = DynamicImage::ImageRgb8(img);
        assert_eq!(dhash64(&img), dhash64(&img.clone()));
    }

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance(0, 0), 0);
        assert_eq!(hamming_distance(0, 1), 1);
        assert_eq!(hamming_distance(0, u64::MAX), 64);
        assert_eq!(hamming_distance(0b1010, 0b0101), 4);
    }
}
