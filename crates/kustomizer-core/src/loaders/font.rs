//! Typefaces: text to planar glyph outlines.

use crate::constants::GLYPH_TOLERANCE_PER_UNIT;
use crate::error::AssetLoadError;
use crate::extrude::PlanarPath;
use fnv::FnvHashMap;
use glam::Vec2;
use kurbo::{BezPath, PathEl};
use lyon_tessellation::FillRule;
use std::rc::Rc;
use ttf_parser::{Face, GlyphId, OutlineBuilder};

/// Anything that can lay out a line of text as outlines.
///
/// The returned path is y-up with the baseline on `y = 0` and the pen starting
/// at `x = 0`; `size` is the em height in scene units.
pub trait Typeface {
    fn outline(&self, text: &str, size: f32) -> Result<PlanarPath, AssetLoadError>;
}

/// TrueType / OpenType font backed by its raw file contents.
#[derive(Clone)]
pub struct TrueTypeFont {
    data: Rc<[u8]>,
    units_per_em: f32,
    line_height: f32,
}

impl std::fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("bytes", &self.data.len())
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl TrueTypeFont {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, AssetLoadError> {
        let face = Face::parse(&bytes, 0).map_err(|e| AssetLoadError::Font(e.to_string()))?;
        let units_per_em = face.units_per_em() as f32;
        let line_height =
            face.ascender() as f32 - face.descender() as f32 + face.line_gap() as f32;
        Ok(Self {
            data: Rc::from(bytes),
            units_per_em,
            line_height,
        })
    }

    fn face(&self) -> Result<Face<'_>, AssetLoadError> {
        Face::parse(&self.data, 0).map_err(|e| AssetLoadError::Font(e.to_string()))
    }
}

impl Typeface for TrueTypeFont {
    fn outline(&self, text: &str, size: f32) -> Result<PlanarPath, AssetLoadError> {
        let face = self.face()?;
        let scale = size / self.units_per_em;
        let mut sink = GlyphSink {
            path: BezPath::new(),
            scale,
            origin: Vec2::ZERO,
        };
        for ch in text.chars() {
            if ch == '\n' {
                sink.origin = Vec2::new(0.0, sink.origin.y - self.line_height * scale);
                continue;
            }
            let id = face.glyph_index(ch).unwrap_or(GlyphId(0));
            // Glyphs without contours (space) just advance the pen.
            let _ = face.outline_glyph(id, &mut sink);
            let advance = face.glyph_hor_advance(id).unwrap_or(0) as f32;
            sink.origin.x += advance * scale;
        }
        if !super::fits_f32(&sink.path) {
            return Err(AssetLoadError::Font(format!("non-finite glyph coordinate at size {size}")));
        }
        Ok(flatten_glyphs(&sink.path, size))
    }
}

struct GlyphSink {
    path: BezPath,
    scale: f32,
    origin: Vec2,
}

impl GlyphSink {
    fn map(&self, x: f32, y: f32) -> (f64, f64) {
        (
            (self.origin.x + x * self.scale) as f64,
            (self.origin.y + y * self.scale) as f64,
        )
    }
}

impl OutlineBuilder for GlyphSink {
    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.path.move_to(p);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.path.line_to(p);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (c, p) = (self.map(x1, y1), self.map(x, y));
        self.path.quad_to(c, p);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (c1, c2, p) = (self.map(x1, y1), self.map(x2, y2), self.map(x, y));
        self.path.curve_to(c1, c2, p);
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}

fn flatten_glyphs(path: &BezPath, size: f32) -> PlanarPath {
    let tolerance = (GLYPH_TOLERANCE_PER_UNIT * size).max(1e-4) as f64;
    let mut outline = PlanarPath::new(FillRule::NonZero);
    let mut current = Vec::new();
    path.flatten(tolerance, |el| match el {
        PathEl::MoveTo(p) => {
            outline.push_contour(std::mem::take(&mut current));
            current.push(Vec2::new(p.x as f32, p.y as f32));
        }
        PathEl::LineTo(p) => current.push(Vec2::new(p.x as f32, p.y as f32)),
        PathEl::ClosePath => outline.push_contour(std::mem::take(&mut current)),
        _ => {}
    });
    outline.push_contour(current);
    outline
}

/// Typefaces resolved so far in a session, keyed by font id.
#[derive(Default, Clone)]
pub struct FontCache {
    fonts: FnvHashMap<String, Rc<dyn Typeface>>,
}

impl FontCache {
    pub fn get(&self, font: &str) -> Option<Rc<dyn Typeface>> {
        self.fonts.get(font).cloned()
    }

    pub fn insert(&mut self, font: impl Into<String>, typeface: Rc<dyn Typeface>) {
        self.fonts.insert(font.into(), typeface);
    }

    pub fn contains(&self, font: &str) -> bool {
        self.fonts.contains_key(font)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
