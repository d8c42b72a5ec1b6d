//! Image engine: a rendered JSON spec describing text drawn onto a solid background.
//!
//! ```json
//! {
//!   "imageText": "ORDER 42",
//!   "fontSize": 32,
//!   "fontFamily": "DejaVuSans",
//!   "foregroundColor": "black",
//!   "backgroundColor": "#FFFFFF",
//!   "imageFormat": "png"
//! }
//! ```
//!
//! Fonts are loaded from the configured fonts directory as `<family>.ttf` or
//! `<family>.otf` and cached for the lifetime of the engine.

use crate::engine::{Engine, EngineCore, EngineKind};
use crate::error::EngineError;
use ::image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use ab_glyph::{FontVec, PxScale};
use dashmap::DashMap;
use imageproc::drawing::{draw_text_mut, text_size};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use synth_template::{TemplateData, TemplateStore};
use tracing::debug;

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];

/// Blank border around the text, in pixels.
const PADDING: u32 = 4;

/// Largest accepted `fontSize`, in pixels.
pub const MAX_FONT_SIZE: f32 = 1024.0;

/// Largest canvas side, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 8192;

/// Rendered image description; `image_bytes` is filled by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    #[serde(alias = "ImageText")]
    pub image_text: String,
    #[serde(alias = "FontSize")]
    pub font_size: f32,
    #[serde(alias = "FontFamily")]
    pub font_family: String,
    #[serde(alias = "ForegroundColor")]
    pub foreground_color: String,
    #[serde(alias = "BackgroundColor")]
    pub background_color: String,
    #[serde(alias = "ImageFormat")]
    pub image_format: String,
    #[serde(skip)]
    pub image_bytes: Vec<u8>,
}

impl ImageSpec {
    /// File extension for the encoded image, lowercase and without a dot.
    pub fn extension(&self) -> String {
        self.image_format.trim().trim_start_matches('.').to_ascii_lowercase()
    }
}

/// Fonts from one directory, loaded on first use.
#[derive(Debug)]
pub struct FontBook {
    dir: PathBuf,
    fonts: DashMap<String, Arc<FontVec>>,
}

impl FontBook {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fonts: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn font(&self, family: &str) -> Result<Arc<FontVec>, EngineError> {
        let key = family.to_ascii_lowercase();
        if let Some(font) = self.fonts.get(&key) {
            return Ok(Arc::clone(&font));
        }

        let path = self.find(family).ok_or_else(|| self.not_found(family))?;
        let bytes = std::fs::read(&path)?;
        let font = Arc::new(FontVec::try_from_vec(bytes).map_err(|_| self.not_found(family))?);
        debug!("Loaded font '{}' from {}", family, path.display());
        self.fonts.insert(key, Arc::clone(&font));
        Ok(font)
    }

    /// `<family>.<ext>` in the fonts directory, matched case-insensitively.
    fn find(&self, family: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.dir).ok()?;
        entries.filter_map(Result::ok).map(|entry| entry.path()).find(|path| {
            let stem_matches = path
                .file_stem()
                .is_some_and(|stem| stem.to_string_lossy().eq_ignore_ascii_case(family));
            let extension_matches = path.extension().is_some_and(|ext| {
                FONT_EXTENSIONS
                    .iter()
                    .any(|wanted| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
            });
            stem_matches && extension_matches
        })
    }

    fn not_found(&self, family: &str) -> EngineError {
        EngineError::FontNotFound {
            family: family.to_string(),
            dir: self.dir.display().to_string(),
        }
    }
}

/// Parse a colour name or `#RRGGBB` / `#RRGGBBAA` hex value.
pub fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        let channel = |index: usize| u8::from_str_radix(hex.get(index..index + 2)?, 16).ok();
        return match hex.len() {
            6 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255])),
            8 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, channel(6)?])),
            _ => None,
        };
    }

    let rgba = match value.to_ascii_lowercase().as_str() {
        "transparent" => [0, 0, 0, 0],
        "black" => [0, 0, 0, 255],
        "white" => [255, 255, 255, 255],
        "red" => [255, 0, 0, 255],
        "green" => [0, 128, 0, 255],
        "lime" => [0, 255, 0, 255],
        "blue" => [0, 0, 255, 255],
        "navy" => [0, 0, 128, 255],
        "yellow" => [255, 255, 0, 255],
        "orange" => [255, 165, 0, 255],
        "purple" => [128, 0, 128, 255],
        "pink" => [255, 192, 203, 255],
        "brown" => [165, 42, 42, 255],
        "gray" | "grey" => [128, 128, 128, 255],
        "lightgray" | "lightgrey" => [211, 211, 211, 255],
        "darkgray" | "darkgrey" => [169, 169, 169, 255],
        "silver" => [192, 192, 192, 255],
        "maroon" => [128, 0, 0, 255],
        "olive" => [128, 128, 0, 255],
        "teal" => [0, 128, 128, 255],
        "aqua" | "cyan" => [0, 255, 255, 255],
        "fuchsia" | "magenta" => [255, 0, 255, 255],
        _ => return None,
    };
    Some(Rgba(rgba))
}

/// Encoding for an extension such as `png` or `jpg`. Only formats this crate
/// enables encoders for are accepted.
pub fn image_format(extension: &str) -> Option<ImageFormat> {
    match ImageFormat::from_extension(extension)? {
        format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Gif) => {
            Some(format)
        }
        _ => None,
    }
}

#[derive(Debug)]
pub struct ImageEngine {
    core: EngineCore,
    fonts: FontBook,
}

impl ImageEngine {
    pub fn new(
        store: Arc<TemplateStore>,
        provider: &str,
        template_name: &str,
        fonts: FontBook,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            core: EngineCore::initialize(EngineKind::Image, store, provider, template_name)?,
            fonts,
        })
    }

    /// Draw `spec` and encode it in its requested format.
    pub fn rasterize(&self, spec: &ImageSpec) -> Result<Vec<u8>, EngineError> {
        let format = image_format(&spec.extension()).ok_or_else(|| {
            self.core
                .format_error(format!("unsupported image format '{}'", spec.image_format))
        })?;
        let color = |value: &str| {
            parse_color(value)
                .ok_or_else(|| self.core.format_error(format!("unknown color '{value}'")))
        };
        let foreground = color(&spec.foreground_color)?;
        let background = color(&spec.background_color)?;
        if !(spec.font_size.is_finite() && spec.font_size > 0.0 && spec.font_size <= MAX_FONT_SIZE)
        {
            return Err(self.core.format_error(format!(
                "invalid font size {}, expected a value in (0, {}]",
                spec.font_size, MAX_FONT_SIZE
            )));
        }

        let font = self.fonts.font(&spec.font_family)?;
        let scale = PxScale::from(spec.font_size);
        let (text_width, text_height) = text_size(scale, &*font, &spec.image_text);
        let width = text_width.max(1) + PADDING * 2;
        let height = text_height.max(spec.font_size.ceil() as u32).max(1) + PADDING * 2;
        if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
            return Err(self.core.format_error(format!(
                "image of {width}x{height} pixels exceeds the {MAX_IMAGE_DIMENSION} pixel limit"
            )));
        }

        let mut canvas = RgbaImage::from_pixel(width, height, background);
        draw_text_mut(
            &mut canvas,
            foreground,
            PADDING as i32,
            PADDING as i32,
            scale,
            &*font,
            &spec.image_text,
        );

        let image = match format {
            ImageFormat::Png | ImageFormat::Gif => DynamicImage::ImageRgba8(canvas),
            _ => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()),
        };
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, format)?;
        Ok(bytes.into_inner())
    }
}

impl Engine for ImageEngine {
    type Output = ImageSpec;

    fn kind(&self) -> EngineKind {
        EngineKind::Image
    }

    fn template(&self) -> &TemplateData {
        self.core.template()
    }

    fn build_payload(&self, worker: usize) -> Result<ImageSpec, EngineError> {
        let rendered = self.core.render(worker)?;
        let mut spec: ImageSpec =
            serde_json::from_str(&rendered).map_err(|e| self.core.format_error(e))?;
        spec.image_bytes = self.rasterize(&spec)?;
        Ok(spec)
    }
}
