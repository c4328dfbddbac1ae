use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CropError {
    #[error("Invalid crop region '{0}'. Expected 'x,y,width,height' in pixels.")]
    InvalidRegion(String),
    #[error("Crop region lies outside the image.")]
    OutOfBounds,
    #[error("Could not decode or encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Free-aspect rectangle over the source image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FromStr for CropRegion {
    type Err = CropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>().ok().filter(|n| n.is_finite() && *n >= 0.0).map(|n| n.round() as u32))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| CropError::InvalidRegion(s.to_string()))?;
        match parts.as_slice() {
            [x, y, width, height] if *width > 0 && *height > 0 => Ok(CropRegion { x: *x, y: *y, width: *width, height: *height }),
            _ => Err(CropError::InvalidRegion(s.to_string())),
        }
    }
}

impl CropRegion {
    /// Clips the region to a `width x height` image; `None` if nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<CropRegion> {
        if self.x >= width || self.y >= height {
            return None;
        }
        Some(CropRegion {
            x: self.x,
            y: self.y,
            width: self.width.min(width - self.x),
            height: self.height.min(height - self.y),
        })
    }
}

/// Cuts `region` out of an encoded image and re-encodes it as JPEG.
pub fn crop_to_jpeg(bytes: &[u8], region: CropRegion) -> Result<Vec<u8>, CropError> {
    let source = image::load_from_memory(bytes)?;
    let region = region.clamp_to(source.width(), source.height()).ok_or(CropError::OutOfBounds)?;
    let cropped = source.crop_imm(region.x, region.y, region.width, region.height);

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(cropped.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}
