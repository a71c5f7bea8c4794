//! Declarative format recipes
//!
//! Recipes let formats be defined in `config.toml` instead of code:
//!
//! ```toml
//! [formats.thumb]
//! ops = [
//!     { op = "resize", width = 128, height = 128 },
//!     { op = "grayscale" },
//! ]
//! ```

use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flip axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipDirection {
    Horizontal,
    Vertical,
}

impl fmt::Display for FlipDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Horizontal => write!(f, "horizontal"),
            Self::Vertical => write!(f, "vertical"),
        }
    }
}

/// A single step of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    /// Fit inside the box, preserving aspect ratio
    Resize {
        width: Option<u32>,
        height: Option<u32>,
        /// Allow enlarging images smaller than the box
        #[serde(default)]
        upsize: bool,
    },
    /// Cover the box, then center-crop to it
    Fill { width: u32, height: u32 },
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    Grayscale,
    Blur { sigma: f32 },
    Rotate { degrees: u16 },
    Flip { direction: FlipDirection },
    Brighten { value: i32 },
    Contrast { value: f32 },
}

impl Operation {
    fn validate(&self) -> Result<(), String> {
        match *self {
            Self::Resize { width, height, .. } => {
                if width.is_none() && height.is_none() {
                    return Err("resize needs width or height".to_string());
                }
                if width == Some(0) || height == Some(0) {
                    return Err("resize dimensions must be positive".to_string());
                }
            }
            Self::Fill { width, height } | Self::Crop { width, height, .. } => {
                if width == 0 || height == 0 {
                    return Err(format!("{self} dimensions must be positive"));
                }
            }
            Self::Blur { sigma } if sigma.is_nan() || sigma <= 0.0 => {
                return Err("blur sigma must be positive".to_string());
            }
            Self::Rotate { degrees } if !matches!(degrees, 90 | 180 | 270) => {
                return Err(format!("rotate supports 90, 180 or 270 degrees, got {degrees}"));
            }
            _ => {}
        }
        Ok(())
    }

    fn apply(&self, image: &mut DynamicImage) {
        *image = match *self {
            Self::Resize {
                width,
                height,
                upsize,
            } => {
                let width = width.unwrap_or(u32::MAX);
                let height = height.unwrap_or(u32::MAX);
                if !upsize && image.width() <= width && image.height() <= height {
                    return;
                }
                image.resize(width, height, FilterType::Lanczos3)
            }
            Self::Fill { width, height } => image.resize_to_fill(width, height, FilterType::Lanczos3),
            Self::Crop {
                x,
                y,
                width,
                height,
            } => image.crop_imm(x, y, width, height),
            Self::Grayscale => image.grayscale(),
            Self::Blur { sigma } => image.blur(sigma),
            Self::Rotate { degrees: 90 } => image.rotate90(),
            Self::Rotate { degrees: 180 } => image.rotate180(),
            Self::Rotate { degrees: 270 } => image.rotate270(),
            Self::Rotate { .. } => return,
            Self::Flip {
                direction: FlipDirection::Horizontal,
            } => image.fliph(),
            Self::Flip {
                direction: FlipDirection::Vertical,
            } => image.flipv(),
            Self::Brighten { value } => image.brighten(value),
            Self::Contrast { value } => image.adjust_contrast(value),
        };
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resize { width, height, .. } => {
                let dim = |d: &Option<u32>| d.map_or_else(|| "auto".to_string(), |d| d.to_string());
                write!(f, "resize {}x{}", dim(width), dim(height))
            }
            Self::Fill { width, height } => write!(f, "fill {}x{}", width, height),
            Self::Crop {
                x,
                y,
                width,
                height,
            } => write!(f, "crop {}x{}+{}+{}", width, height, x, y),
            Self::Grayscale => write!(f, "grayscale"),
            Self::Blur { sigma } => write!(f, "blur {}", sigma),
            Self::Rotate { degrees } => write!(f, "rotate {}", degrees),
            Self::Flip { direction } => write!(f, "flip {}", direction),
            Self::Brighten { value } => write!(f, "brighten {}", value),
            Self::Contrast { value } => write!(f, "contrast {}", value),
        }
    }
}

/// Ordered list of operations defining a format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipe {
    pub ops: Vec<Operation>,
}

impl Recipe {
    /// Create a recipe from operations
    pub fn new(ops: Vec<Operation>) -> Self {
        Self { ops }
    }

    /// Check every operation's parameters
    pub fn validate(&self) -> Result<(), String> {
        self.ops.iter().try_for_each(Operation::validate)
    }

    /// Apply all operations in order
    pub fn apply(&self, image: &mut DynamicImage) {
        for op in &self.ops {
            op.apply(image);
        }
    }

    /// Turn the recipe into a transform for [`FormatRegistry`](super::FormatRegistry)
    pub fn into_transform(self) -> impl Fn(&mut DynamicImage) + Send + Sync + 'static {
        move |image: &mut DynamicImage| self.apply(image)
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return write!(f, "identity");
        }
        let ops: Vec<String> = self.ops.iter().map(ToString::to_string).collect();
        write!(f, "{}", ops.join(" | "))
    }
}
