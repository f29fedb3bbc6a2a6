//! Turns uploaded image bytes into the normalized NHWC batch the classifier expects.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("{0}")]
    Decode(#[from] image::ImageError),
}

/// A single-image batch in `[1, height, width, 3]` layout with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub data: Vec<f32>,
    pub shape: [u64; 4],
}

#[cfg(test)]
impl ImageTensor {
    pub(crate) fn height(&self) -> usize {
        self.shape[1] as usize
    }

    pub(crate) fn width(&self) -> usize {
        self.shape[2] as usize
    }

    /// RGB values of the pixel at (`y`, `x`).
    pub(crate) fn pixel(&self, y: usize, x: usize) -> [f32; 3] {
        let offset = (y * self.width() + x) * 3;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }
}

pub fn preprocess_image(
    image_data: &[u8],
    (height, width): (u32, u32),
) -> Result<ImageTensor, PreprocessError> {
    let img = image::load_from_memory(image_data)?;
    debug!(
        "Decoded upload: {}x{} {:?}",
        img.width(),
        img.height(),
        img.color()
    );

    let rgb = to_rgb(img);
    let resized = imageops::resize(&rgb, width, height, FilterType::CatmullRom);

    let mut data = Vec::with_capacity((height * width * 3) as usize);
    for pixel in resized.pixels() {
        data.push(pixel[0] as f32 / 255.0);
        data.push(pixel[1] as f32 / 255.0);
        data.push(pixel[2] as f32 / 255.0);
    }

    Ok(ImageTensor {
        data,
        shape: [1, height as u64, width as u64, 3],
    })
}

/// Grayscale is replicated across channels, alpha is dropped without compositing.
fn to_rgb(img: DynamicImage) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}
