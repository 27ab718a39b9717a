/*!
 * Image cleanup before OCR.
 *
 * Scans and photos OCR noticeably better as high-contrast black and white:
 * the bitmap is converted to grayscale, its contrast raised, then binarized
 * against a fixed luma threshold and re-encoded as PNG.
 */

use image::{DynamicImage, GrayImage, ImageFormat, Luma, imageops};
use std::io::Cursor;

use crate::errors::OcrError;

/// Preprocessing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessOptions {
    /// Contrast change passed to `imageops::contrast`; positive increases
    pub contrast: f32,
    /// Pixels with luma at or above this become white, the rest black
    pub threshold: u8,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            contrast: 30.0,
            threshold: 128,
        }
    }
}

/// Grayscale, contrast, threshold
pub fn binarize(image: &DynamicImage, options: PreprocessOptions) -> GrayImage {
    let gray = image.to_luma8();
    let mut adjusted = imageops::contrast(&gray, options.contrast);

    for pixel in adjusted.pixels_mut() {
        let Luma([luma]) = *pixel;
        *pixel = Luma([if luma >= options.threshold { 255 } else { 0 }]);
    }

    adjusted
}

/// Decode an encoded bitmap, clean it up and re-encode it as PNG
pub fn preprocess(bytes: &[u8], options: PreprocessOptions) -> Result<Vec<u8>, OcrError> {
    let image = image::load_from_memory(bytes)?;
    let cleaned = binarize(&image, options);

    let mut encoded = Vec::new();
    DynamicImage::ImageLuma8(cleaned).write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)?;
    Ok(encoded)
}
