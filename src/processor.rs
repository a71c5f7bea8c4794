//! Image decoding and encoding
//!
//! The orchestrator only needs to load a source into a mutable handle and
//! save the transformed handle to a path. `RasterProcessor` does that with
//! the `image` crate; other backends can implement [`ImageProcessor`].

use crate::error::{ImagixError, ImagixResult};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

/// A decoded image together with the format it was read from
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Pixel data, mutated in place by format transforms
    pub image: DynamicImage,
    /// Detected source format, used when the destination has no extension
    pub format: Option<ImageFormat>,
}

/// Load/save backend used by the orchestrator
pub trait ImageProcessor: Send + Sync {
    /// Decode the image at `path`
    fn load(&self, path: &Path) -> ImagixResult<DecodedImage>;

    /// Encode `image` to `path`, replacing any existing file
    fn save(&self, image: &DecodedImage, path: &Path) -> ImagixResult<()>;
}

/// `ImageProcessor` backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterProcessor;

impl RasterProcessor {
    /// Create a new raster processor
    pub fn new() -> Self {
        Self
    }

    fn output_format(image: &DecodedImage, path: &Path) -> ImagixResult<ImageFormat> {
        ImageFormat::from_path(path)
            .ok()
            .or(image.format)
            .ok_or_else(|| {
                ImagixError::Internal(format!(
                    "cannot determine output format for {}",
                    path.display()
                ))
            })
    }
}

impl ImageProcessor for RasterProcessor {
    fn load(&self, path: &Path) -> ImagixResult<DecodedImage> {
        let reader = ImageReader::open(path)
            .map_err(|e| ImagixError::io(format!("opening image {}", path.display()), e))?
            .with_guessed_format()
            .map_err(|e| ImagixError::io(format!("reading image {}", path.display()), e))?;

        let format = reader.format();
        let image = reader
            .decode()
            .map_err(|e| ImagixError::image(path, e))?;

        debug!(
            "Decoded {} ({}x{}, {:?})",
            path.display(),
            image.width(),
            image.height(),
            format
        );
        Ok(DecodedImage { image, format })
    }

    fn save(&self, image: &DecodedImage, path: &Path) -> ImagixResult<()> {
        let format = Self::output_format(image, path)?;

        // JPEG has no alpha channel
        let pixels = match format {
            ImageFormat::Jpeg if image.image.color().has_alpha() => {
                Cow::Owned(DynamicImage::ImageRgb8(image.image.to_rgb8()))
            }
            _ => Cow::Borrowed(&image.image),
        };

        let parent = path.parent().ok_or_else(|| {
            ImagixError::Internal(format!("no parent directory for {}", path.display()))
        })?;

        // Write next to the target and rename, so readers never see partial files
        let temp = parent.join(format!(".imagix-{}.tmp", Uuid::new_v4().simple()));

        if let Err(e) = pixels.save_with_format(&temp, format) {
            let _ = fs::remove_file(&temp);
            return Err(ImagixError::image(path, e));
        }

        if let Err(e) = fs::rename(&temp, path) {
            let _ = fs::remove_file(&temp);
            return Err(ImagixError::io(format!("writing {}", path.display()), e));
        }

        debug!("Encoded {} as {:?}", path.display(), format);
        Ok(())
    }
}

/// Write a small solid PNG for tests
#[cfg(test)]
pub(crate) fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let pixels = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]));
    pixels.save_with_format(path, ImageFormat::Png).unwrap();
}
