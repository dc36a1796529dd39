// src/services/image_processor.rs
use crate::errors::StylistError;
use crate::models::{EncodedImage, EncodedUpload};
use base64::{Engine as _, engine::general_purpose};
use image::{GenericImageView, ImageFormat as ImgFormat};
use std::path::Path;

/// A photo as received from the user, before any processing.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Turns uploaded photos into inline payloads for the analysis request.
pub struct ImageProcessor {
    max_dimension: u32,
}

impl ImageProcessor {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    pub fn encode(&self, filename: &str, data: &[u8]) -> Result<EncodedUpload, StylistError> {
        if data.is_empty() {
            return Err(StylistError::Io(format!("{} is empty", filename)));
        }

        let format = image::guess_format(data)
            .map_err(|e| StylistError::Io(format!("{}: unknown image format: {}", filename, e)))?;

        let (bytes, format) = self.normalize(filename, data, format)?;

        Ok(EncodedUpload {
            filename: filename.to_string(),
            image: EncodedImage {
                mime_type: mime_type(format).to_string(),
                data: general_purpose::STANDARD.encode(bytes),
            },
        })
    }

    pub async fn encode_file(&self, path: &Path) -> Result<EncodedUpload, StylistError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| StylistError::Io(format!("{}: {}", path.display(), e)))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.encode(&filename, &data)
    }

    /// Passes small PNG, JPEG and WebP files through untouched. Anything
    /// larger than the max dimension, or in another format, is re-encoded
    /// as PNG.
    fn normalize(
        &self,
        filename: &str,
        data: &[u8],
        format: ImgFormat,
    ) -> Result<(Vec<u8>, ImgFormat), StylistError> {
        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| StylistError::Io(format!("{}: failed to load image: {}", filename, e)))?;

        let (width, height) = img.dimensions();
        let fits = width <= self.max_dimension && height <= self.max_dimension;

        if fits && is_inline_format(format) {
            return Ok((data.to_vec(), format));
        }

        let img = if fits {
            log::debug!("Converting {} from {:?} to PNG", filename, format);
            img
        } else {
            let ratio = self.max_dimension as f32 / width.max(height) as f32;
            let new_width = ((width as f32 * ratio) as u32).max(1);
            let new_height = ((height as f32 * ratio) as u32).max(1);

            log::debug!(
                "Downscaling {} from {}x{} to {}x{}",
                filename,
                width,
                height,
                new_width,
                new_height
            );

            img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
        };

        let mut output = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Png)
            .map_err(|e| StylistError::Io(format!("{}: failed to encode image: {}", filename, e)))?;

        Ok((output, ImgFormat::Png))
    }
}

fn is_inline_format(format: ImgFormat) -> bool {
    matches!(format, ImgFormat::Png | ImgFormat::Jpeg | ImgFormat::WebP)
}

fn mime_type(format: ImgFormat) -> &'static str {
    match format {
        ImgFormat::Jpeg => "image/jpeg",
        ImgFormat::WebP => "image/webp",
        _ => "image/png",
    }
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    image_bytes(width, height, ImgFormat::Png)
}

#[cfg(test)]
fn image_bytes(width: u32, height: u32, format: ImgFormat) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
    let mut out = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut out), format)
        .unwrap();
    out
}
