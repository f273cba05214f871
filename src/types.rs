//! Core data types for the annotation tool.
//!
//! This module defines the small shared vocabulary used throughout the
//! application: shape identity, layering, hit-region classification, and the
//! portable font/image descriptions used for persistence.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for annotation shapes.
pub type ShapeId = Uuid;

/// Z-order hint controlling paint and selection order of root shapes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Layer {
    /// Painted first, behind foreground shapes; hit-tested last
    Background,
    /// Painted last, on top; hit-tested first
    Foreground,
}

/// How the interior of a framed shape is filled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FillMode {
    /// No fill; only the frame stroke is drawn
    None,
    /// Solid fill using the shape's fill color and opacity
    Solid,
}

/// Classification of a query point against a shape.
///
/// Edge and body quadrants are mutually exclusive outputs, but each variant
/// carries a stable bit value so callers can mask with [`Region::EDGE`] and
/// [`Region::BODY`]. The generic [`Region::Body`] variant is reported by
/// shapes that cannot be resized (curves) and covers all body bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Not on the shape at all
    None,
    /// On the contour band, left side
    EdgeLeft,
    /// On the contour band, right side
    EdgeRight,
    /// On the contour band, top side
    EdgeTop,
    /// On the contour band, bottom side
    EdgeBottom,
    /// Inside the body, left quadrant
    BodyLeft,
    /// Inside the body, right quadrant
    BodyRight,
    /// Inside the body, top quadrant
    BodyTop,
    /// Inside the body, bottom quadrant
    BodyBottom,
    /// Inside the body, no particular quadrant (move-only shapes)
    Body,
}

impl Region {
    /// Mask covering every edge flag.
    pub const EDGE: u16 = 0x0f;
    /// Mask covering every body flag.
    pub const BODY: u16 = 0xf0;

    /// The stable bit value of this region.
    pub const fn bits(self) -> u16 {
        match self {
            Region::None => 0,
            Region::EdgeLeft => 1,
            Region::EdgeRight => 2,
            Region::EdgeTop => 4,
            Region::EdgeBottom => 8,
            Region::BodyLeft => 16,
            Region::BodyRight => 32,
            Region::BodyTop => 64,
            Region::BodyBottom => 128,
            Region::Body => 0xf0,
        }
    }

    /// True if this region is one of the four contour-band flags.
    pub const fn is_edge(self) -> bool {
        self.bits() & Self::EDGE != 0
    }

    /// True if this region lies inside the shape body.
    pub const fn is_body(self) -> bool {
        self.bits() & Self::BODY != 0
    }
}

/// Converts a stored RGBA color into an egui color.
pub fn color32(rgba: [u8; 4]) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(rgba[0], rgba[1], rgba[2], rgba[3])
}

/// Portable font description used for persistence.
///
/// Native font handles are never serialized; a font is persisted by family
/// name, size and decoration flags, and resolved back to a renderable font on
/// demand. An unknown family falls back to the default proportional font
/// rather than failing, so a corrupt record degrades visually but never
/// breaks the interaction loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FontSpec {
    /// Font family name
    pub family: String,
    /// Point size
    pub size: f32,
    /// Bold weight (best-effort; the default egui fonts carry one weight)
    pub bold: bool,
    /// Italic slant
    pub italic: bool,
    /// Underline decoration
    pub underline: bool,
    /// Strike-out decoration
    pub strikeout: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Verdana".to_string(),
            size: 8.0,
            bold: false,
            italic: false,
            underline: false,
            strikeout: false,
        }
    }
}

impl FontSpec {
    /// Resolves the persisted description to an egui font id.
    ///
    /// Only the family class can be honored with egui's built-in fonts:
    /// monospace-looking family names map to the monospace family and
    /// everything else falls back to proportional.
    pub fn font_id(&self) -> egui::FontId {
        self.font_id_scaled(1.0)
    }

    /// Same as [`FontSpec::font_id`] with the size multiplied by `scale`.
    pub fn font_id_scaled(&self, scale: f32) -> egui::FontId {
        let family = match self.family.to_ascii_lowercase().as_str() {
            "monospace" | "courier" | "courier new" | "consolas" => egui::FontFamily::Monospace,
            _ => egui::FontFamily::Proportional,
        };
        egui::FontId::new((self.size * scale).max(1.0), family)
    }

    /// Builds a text format carrying the decoration flags for text layout.
    pub fn text_format(&self, color: egui::Color32, scale: f32) -> egui::TextFormat {
        let decoration = egui::Stroke::new((self.size * scale / 16.0).max(1.0), color);
        egui::TextFormat {
            font_id: self.font_id_scaled(scale),
            color,
            italics: self.italic,
            underline: if self.underline {
                decoration
            } else {
                egui::Stroke::NONE
            },
            strikethrough: if self.strikeout {
                decoration
            } else {
                egui::Stroke::NONE
            },
            ..Default::default()
        }
    }

    /// Conservative text size estimate for contexts without a font system.
    ///
    /// Used to seed label bounds before the first frame has measured the real
    /// galley; the draw pass replaces it with the measured size.
    pub fn estimate_size(&self, text: &str) -> (f32, f32) {
        let width = (text.chars().count().max(1) as f32 * self.size * 0.6).max(8.0);
        let height = self.size * 1.4;
        (width, height)
    }
}

/// Portable raster buffer used for persistence.
///
/// The image is stored as encoded bytes (PNG when produced by this
/// application) and serialized as base64 inside JSON, so that no native
/// image handle is ever part of the persisted form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImageData {
    /// Encoded image bytes (PNG/JPEG)
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl ImageData {
    /// Wraps already-encoded image bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// True if no image bytes are present.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decodes the buffer into an egui color image.
    ///
    /// A corrupt or empty buffer yields `None`; callers simply skip drawing
    /// in that case instead of propagating an error.
    pub fn decode(&self) -> Option<egui::ColorImage> {
        if self.bytes.is_empty() {
            return None;
        }
        let decoded = image::load_from_memory(&self.bytes).ok()?;
        let rgba = decoded.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        Some(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
    }
}

/// Serde adapter storing byte buffers as base64 strings in JSON.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_regions_are_inside_the_edge_mask_only() {
        for region in [
            Region::EdgeLeft,
            Region::EdgeRight,
            Region::EdgeTop,
            Region::EdgeBottom,
        ] {
            assert!(region.is_edge());
            assert!(!region.is_body());
            assert_eq!(region.bits() & Region::BODY, 0);
        }
    }

    #[test]
    fn body_regions_are_inside_the_body_mask_only() {
        for region in [
            Region::BodyLeft,
            Region::BodyRight,
            Region::BodyTop,
            Region::BodyBottom,
            Region::Body,
        ] {
            assert!(region.is_body());
            assert!(!region.is_edge());
            assert_eq!(region.bits() & Region::EDGE, 0);
        }
    }

    #[test]
    fn generic_body_covers_all_body_bits() {
        let quadrants = Region::BodyLeft.bits()
            | Region::BodyRight.bits()
            | Region::BodyTop.bits()
            | Region::BodyBottom.bits();
        assert_eq!(Region::Body.bits(), quadrants);
        assert_eq!(Region::Body.bits(), Region::BODY);
    }

    #[test]
    fn none_region_matches_no_mask() {
        assert!(!Region::None.is_edge());
        assert!(!Region::None.is_body());
        assert_eq!(Region::None.bits(), 0);
    }

    #[test]
    fn font_spec_default_resolves() {
        let font = FontSpec::default();
        assert_eq!(font.family, "Verdana");
        let id = font.font_id();
        assert_eq!(id.family, egui::FontFamily::Proportional);
        assert_eq!(id.size, 8.0);
    }

    #[test]
    fn unknown_font_family_falls_back_to_proportional() {
        let font = FontSpec {
            family: "No Such Family 9000".to_string(),
            size: 14.0,
            ..Default::default()
        };
        assert_eq!(font.font_id().family, egui::FontFamily::Proportional);
    }

    #[test]
    fn monospace_families_resolve_to_monospace() {
        for family in ["Monospace", "Courier New", "consolas"] {
            let font = FontSpec {
                family: family.to_string(),
                ..Default::default()
            };
            assert_eq!(font.font_id().family, egui::FontFamily::Monospace);
        }
    }

    #[test]
    fn font_size_is_never_below_one() {
        let font = FontSpec {
            size: 0.0,
            ..Default::default()
        };
        assert_eq!(font.font_id().size, 1.0);
    }

    #[test]
    fn image_data_roundtrips_through_json() {
        let encoded = encode_test_png();
        let data = ImageData::from_bytes(encoded);
        let json = serde_json::to_string(&data).unwrap();
        let restored: ImageData = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, data);
        let decoded = restored.decode().expect("valid png should decode");
        assert_eq!(decoded.size, [2, 2]);
    }

    #[test]
    fn corrupt_image_bytes_decode_to_none() {
        let data = ImageData::from_bytes(vec![1, 2, 3, 4]);
        assert!(data.decode().is_none());
    }

    #[test]
    fn empty_image_decodes_to_none() {
        assert!(ImageData::default().decode().is_none());
    }

    fn encode_test_png() -> Vec<u8> {
        let mut raster = image::RgbaImage::new(2, 2);
        for pixel in raster.pixels_mut() {
            *pixel = image::Rgba([10, 20, 30, 255]);
        }
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(raster)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }
}
