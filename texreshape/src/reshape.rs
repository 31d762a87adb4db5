//! Strip texture to atlas reshaping
//!
//! This module reads a tall stack of square strips, validates its size, and
//! writes the strips back out as a square grid of tiles with every pixel
//! value and the color type left untouched.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use image::{
    ColorType, DynamicImage, ImageBuffer, ImageDecoder, ImageError, ImageFormat, ImageReader,
    Pixel,
};
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::format::{check_encodable, check_format, resolve_format};
use crate::layout::{Layout, Placement};

/// Errors that can occur while reshaping a strip texture
#[derive(Error, Debug)]
pub enum ReshapeError {
    #[error("Image dimensions {0}x{1} don't match expected {2}x{3}")]
    InvalidDimensions(u32, u32, u32, u32),

    #[error("Failed to decode image: {0}")]
    DecodeError(#[source] ImageError),

    #[error("Failed to encode image: {0}")]
    EncodeError(#[source] ImageError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Cannot determine an output format for {0}")]
    UnknownFormat(String),

    #[error("Writing {0:?} images is not supported")]
    UnsupportedFormat(ImageFormat),

    #[error("{0:?} is a lossy format and lossy output was not allowed")]
    LossyFormat(ImageFormat),

    #[error("{0:?} pixels cannot be written as {1:?} without conversion")]
    UnsupportedColorType(ColorType, ImageFormat),

    #[error("Unsupported pixel layout {0:?}")]
    UnsupportedPixelLayout(ColorType),
}

/// Configuration for a reshape run
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Input strip texture
    pub input_file: PathBuf,
    /// Output atlas
    pub output_file: PathBuf,
    /// Output format, inferred from `output_file` when unset
    pub format: Option<ImageFormat>,
    /// Permit JPEG/AVIF output
    pub allow_lossy: bool,
    /// Optional JSON report of the tile placements
    pub report_file: Option<PathBuf>,
    /// Strip/tile geometry
    pub layout: Layout,
}

/// Summary of a finished reshape
#[derive(Debug, Clone, Serialize)]
pub struct ReshapeReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: String,
    pub color_type: String,
    pub width: u32,
    pub height: u32,
    pub layout: Layout,
    pub tiles: Vec<Placement>,
}

/// Copy every strip of `src` into its tile of a new atlas buffer.
///
/// Rows are copied as subpixel slices, so the result is bit-exact for any
/// channel layout and depth.
pub fn reshape_buffer<P: Pixel>(
    src: &ImageBuffer<P, Vec<P::Subpixel>>,
    layout: Layout,
) -> Result<ImageBuffer<P, Vec<P::Subpixel>>, ReshapeError> {
    let (expected_width, expected_height) = layout.source_dimensions();
    if src.dimensions() != (expected_width, expected_height) {
        return Err(ReshapeError::InvalidDimensions(
            src.width(),
            src.height(),
            expected_width,
            expected_height,
        ));
    }

    let (atlas_width, atlas_height) = layout.atlas_dimensions();
    let mut atlas = ImageBuffer::<P, Vec<P::Subpixel>>::new(atlas_width, atlas_height);

    let channels = P::CHANNEL_COUNT as usize;
    let tile = layout.tile_size as usize;
    let row_len = tile * channels;
    let src_stride = expected_width as usize * channels;
    let dst_stride = atlas_width as usize * channels;

    let src_raw: &[P::Subpixel] = src.as_raw();
    let dst_raw: &mut [P::Subpixel] = &mut atlas;

    for placement in layout.placements() {
        let (src_x, src_y) = placement.source_origin(layout);
        let (dst_x, dst_y) = placement.atlas_origin(layout);
        tracing::trace!(
            "strip {} -> tile ({}, {})",
            placement.strip,
            placement.tile_x,
            placement.tile_y
        );

        for y in 0..tile {
            let src_start = (src_y as usize + y) * src_stride + src_x as usize * channels;
            let dst_start = (dst_y as usize + y) * dst_stride + dst_x as usize * channels;
            dst_raw[dst_start..dst_start + row_len]
                .copy_from_slice(&src_raw[src_start..src_start + row_len]);
        }
    }

    Ok(atlas)
}

/// Reshape a decoded image, keeping its color type
pub fn reshape_image(img: &DynamicImage, layout: Layout) -> Result<DynamicImage, ReshapeError> {
    let atlas = match img {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(reshape_buffer(buf, layout)?),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(reshape_buffer(buf, layout)?),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(reshape_buffer(buf, layout)?),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(reshape_buffer(buf, layout)?),
        DynamicImage::ImageLuma16(buf) => DynamicImage::ImageLuma16(reshape_buffer(buf, layout)?),
        DynamicImage::ImageLumaA16(buf) => {
            DynamicImage::ImageLumaA16(reshape_buffer(buf, layout)?)
        }
        DynamicImage::ImageRgb16(buf) => DynamicImage::ImageRgb16(reshape_buffer(buf, layout)?),
        DynamicImage::ImageRgba16(buf) => DynamicImage::ImageRgba16(reshape_buffer(buf, layout)?),
        DynamicImage::ImageRgb32F(buf) => DynamicImage::ImageRgb32F(reshape_buffer(buf, layout)?),
        DynamicImage::ImageRgba32F(buf) => {
            DynamicImage::ImageRgba32F(reshape_buffer(buf, layout)?)
        }
        other => return Err(ReshapeError::UnsupportedPixelLayout(other.color())),
    };

    Ok(atlas)
}

/// Runs a full reshape: validate, decode, transform and write
pub struct Reshaper {
    config: Config,
}

impl Reshaper {
    /// Create a new reshaper with the given configuration
    pub fn new(config: Config) -> Self {
        Reshaper { config }
    }

    /// Reshape the input file into the output file
    pub fn run(&self) -> Result<ReshapeReport, ReshapeError> {
        let layout = self.config.layout;

        // Settle the output format before touching the input
        let format = resolve_format(&self.config.output_file, self.config.format)?;
        check_format(format, self.config.allow_lossy)?;
        tracing::debug!("Output format: {:?}", format);

        tracing::info!(
            "Reshaping {:?} -> {:?}",
            self.config.input_file,
            self.config.output_file
        );

        let img = self.read_image(format)?;
        let atlas = reshape_image(&img, layout)?;
        drop(img);

        let report = ReshapeReport {
            input: self.config.input_file.clone(),
            output: self.config.output_file.clone(),
            format: format!("{:?}", format),
            color_type: format!("{:?}", atlas.color()),
            width: atlas.width(),
            height: atlas.height(),
            layout,
            tiles: layout.placements().collect(),
        };

        // Nothing is moved into place until every file has been staged
        let staged_atlas = self.stage_image(&atlas, format)?;
        let staged_report = match &self.config.report_file {
            Some(path) => Some((self.stage_json_file(path, &report)?, path)),
            None => None,
        };

        if let Some((tmp, path)) = staged_report {
            tmp.persist(path).map_err(|e| e.error)?;
        }
        if let Err(e) = staged_atlas.persist(&self.config.output_file) {
            if let Some(path) = &self.config.report_file {
                if let Err(remove_err) = fs::remove_file(path) {
                    tracing::warn!("Failed to remove report {:?}: {}", path, remove_err);
                }
            }
            return Err(e.error.into());
        }

        tracing::info!("Reshaped texture saved to {:?}", self.config.output_file);
        Ok(report)
    }

    /// Read the input image, checking its header before decoding pixels
    fn read_image(&self, format: ImageFormat) -> Result<DynamicImage, ReshapeError> {
        let reader = ImageReader::open(&self.config.input_file)?.with_guessed_format()?;
        let decoder = reader.into_decoder().map_err(ReshapeError::DecodeError)?;

        let (width, height) = decoder.dimensions();
        let color = decoder.color_type();
        tracing::debug!("Input header: {}x{} {:?}", width, height, color);

        let (expected_width, expected_height) = self.config.layout.source_dimensions();
        if (width, height) != (expected_width, expected_height) {
            return Err(ReshapeError::InvalidDimensions(
                width,
                height,
                expected_width,
                expected_height,
            ));
        }

        check_encodable(format, color)?;

        DynamicImage::from_decoder(decoder).map_err(ReshapeError::DecodeError)
    }

    /// Encode the atlas into a temporary file beside the output
    fn stage_image(
        &self,
        atlas: &DynamicImage,
        format: ImageFormat,
    ) -> Result<NamedTempFile, ReshapeError> {
        let mut tmp = staging_file(&self.config.output_file)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            atlas
                .write_to(&mut writer, format)
                .map_err(ReshapeError::EncodeError)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }

    /// Write the JSON report into a temporary file beside `path`
    fn stage_json_file(
        &self,
        path: &Path,
        report: &ReshapeReport,
    ) -> Result<NamedTempFile, ReshapeError> {
        let mut tmp = staging_file(path)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, report)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }
}

/// Temporary file in the directory of `path`, removed on drop unless persisted
fn staging_file(path: &Path) -> io::Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir)
}
