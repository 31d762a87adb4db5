//! Output format policy
//!
//! The atlas is only useful if every pixel survives the write, so the output
//! encoder is checked against the source color type before any pixel data is
//! decoded.

use std::path::Path;

use image::{ColorType, ImageFormat};

use crate::reshape::ReshapeError;

/// Pick the output format: an explicit choice wins, otherwise the extension
pub fn resolve_format(
    path: &Path,
    explicit: Option<ImageFormat>,
) -> Result<ImageFormat, ReshapeError> {
    match explicit {
        Some(format) => Ok(format),
        None => ImageFormat::from_path(path)
            .map_err(|_| ReshapeError::UnknownFormat(path.display().to_string())),
    }
}

/// Formats whose encoders discard information
pub fn is_lossy(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Jpeg | ImageFormat::Avif)
}

/// Color types the encoder for `format` writes without conversion
fn encodable_colors(format: ImageFormat) -> &'static [ColorType] {
    use ColorType::*;

    match format {
        ImageFormat::Png => &[L8, La8, Rgb8, Rgba8, L16, La16, Rgb16, Rgba16],
        ImageFormat::Tiff => &[L8, Rgb8, Rgba8, L16, Rgb16, Rgba16],
        ImageFormat::Bmp | ImageFormat::Tga => &[L8, La8, Rgb8, Rgba8],
        ImageFormat::Qoi | ImageFormat::WebP => &[Rgb8, Rgba8],
        ImageFormat::Pnm => &[L8, L16, Rgb8, Rgb16],
        ImageFormat::Farbfeld => &[Rgba16],
        ImageFormat::OpenExr => &[Rgb32F, Rgba32F],
        ImageFormat::Jpeg => &[L8, Rgb8],
        ImageFormat::Avif => &[Rgb8, Rgba8],
        _ => &[],
    }
}

/// Whether `format` can store `color` pixels as-is
pub fn supports_color(format: ImageFormat, color: ColorType) -> bool {
    encodable_colors(format).contains(&color)
}

/// Reject formats that cannot hold the atlas at all
pub fn check_format(format: ImageFormat, allow_lossy: bool) -> Result<(), ReshapeError> {
    if !format.writing_enabled() || encodable_colors(format).is_empty() {
        return Err(ReshapeError::UnsupportedFormat(format));
    }
    if is_lossy(format) && !allow_lossy {
        return Err(ReshapeError::LossyFormat(format));
    }
    Ok(())
}

/// Reject a color type the chosen encoder would fail on or convert
pub fn check_encodable(format: ImageFormat, color: ColorType) -> Result<(), ReshapeError> {
    if !supports_color(format, color) {
        return Err(ReshapeError::UnsupportedColorType(color, format));
    }
    Ok(())
}
