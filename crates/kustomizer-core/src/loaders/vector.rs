//! SVG markup to flattened planar outlines.
//!
//! Only geometry is read: `path`, `polygon`, `polyline`, `rect`, `circle` and
//! `ellipse`, with `transform` attributes accumulated through `<g>` and
//! nested `<svg>` elements. Paint, text and anything inside `<defs>`-like
//! containers is ignored. Output coordinates are flipped to y-up.

use crate::constants::SVG_TOLERANCE;
use crate::error::AssetLoadError;
use crate::extrude::PlanarPath;
use glam::Vec2;
use kurbo::{Affine, BezPath, Circle, Ellipse, PathEl, Rect, RoundedRect, Shape};
use lyon_tessellation::FillRule;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)([A-Za-z][\w:.-]*)([^>]*?)(/?)>").expect("valid regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][\w:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});
static TRANSFORM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(matrix|translate|scale|rotate|skewX|skewY)\s*\(([^)]*)\)").expect("valid regex")
});
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?").expect("valid regex")
});

// Containers whose children are never rendered directly.
const NON_RENDERED: &[&str] = &[
    "defs",
    "clipPath",
    "mask",
    "symbol",
    "pattern",
    "marker",
    "linearGradient",
    "radialGradient",
    "filter",
    "style",
    "title",
    "desc",
    "metadata",
    "text",
];

/// Parse SVG text into one outline per shape element, in document order.
pub fn parse_svg(markup: &str) -> Result<Vec<PlanarPath>, AssetLoadError> {
    if !markup.contains("<svg") {
        return Err(AssetLoadError::Vector("no <svg> root element".into()));
    }
    let markup = COMMENT_RE.replace_all(markup, "");

    let mut transforms = vec![Affine::IDENTITY];
    let mut skip_depth = 0usize;
    let mut outlines = Vec::new();

    for cap in TAG_RE.captures_iter(&markup) {
        let closing = !cap[1].is_empty();
        let name = &cap[2];
        let attrs = parse_attributes(&cap[3]);
        let self_closing = !cap[4].is_empty();

        if NON_RENDERED.contains(&name) {
            if closing {
                skip_depth = skip_depth.saturating_sub(1);
            } else if !self_closing {
                skip_depth += 1;
            }
            continue;
        }
        if skip_depth > 0 {
            continue;
        }

        let current = transforms.last().copied().unwrap_or(Affine::IDENTITY);
        match name {
            "g" | "svg" | "a" => {
                if closing {
                    if transforms.len() > 1 {
                        transforms.pop();
                    }
                } else if !self_closing {
                    transforms.push(current * element_transform(&attrs, name)?);
                }
            }
            _ if closing => {}
            shape => {
                let Some(path) = shape_path(shape, &attrs)? else {
                    continue;
                };
                let affine = current * parse_transform(attrs.get("transform").copied().unwrap_or(""))?;
                let fill_rule = match attrs.get("fill-rule").copied() {
                    Some("evenodd") => FillRule::EvenOdd,
                    _ => FillRule::NonZero,
                };
                let placed = affine * path;
                if !super::fits_f32(&placed) {
                    return Err(AssetLoadError::Vector(format!("non-finite coordinate in <{shape}>")));
                }
                let outline = flatten(&placed, fill_rule);
                if !outline.is_empty() {
                    outlines.push(outline);
                }
            }
        }
    }

    if outlines.is_empty() {
        return Err(AssetLoadError::Vector("SVG contains no closed shapes".into()));
    }
    Ok(outlines)
}

fn parse_attributes(raw: &str) -> HashMap<&str, &str> {
    ATTR_RE
        .captures_iter(raw)
        .filter_map(|c| {
            let key = c.get(1)?.as_str();
            let value = c.get(2).or_else(|| c.get(3))?.as_str();
            Some((key, value))
        })
        .collect()
}

fn numbers(s: &str) -> Vec<f64> {
    NUMBER_RE
        .find_iter(s)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

fn number_attr(attrs: &HashMap<&str, &str>, key: &str) -> Result<f64, AssetLoadError> {
    match attrs.get(key) {
        None => Ok(0.0),
        Some(v) => {
            // "12px" and "12" are both accepted
            let trimmed = v.trim().trim_end_matches("px");
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| AssetLoadError::Vector(format!("bad `{key}` value `{v}`")))
        }
    }
}

// A nested <svg> with x/y behaves like a translated group.
fn element_transform(attrs: &HashMap<&str, &str>, name: &str) -> Result<Affine, AssetLoadError> {
    let own = parse_transform(attrs.get("transform").copied().unwrap_or(""))?;
    if name == "svg" {
        let offset = Affine::translate((number_attr(attrs, "x")?, number_attr(attrs, "y")?));
        return Ok(offset * own);
    }
    Ok(own)
}

/// Parse an SVG transform list into one affine map, applied right to left.
pub fn parse_transform(list: &str) -> Result<Affine, AssetLoadError> {
    let mut affine = Affine::IDENTITY;
    for cap in TRANSFORM_RE.captures_iter(list) {
        let args = numbers(&cap[2]);
        let bad = || AssetLoadError::Vector(format!("bad transform `{}`", &cap[0]));
        let step = match (&cap[1], args.as_slice()) {
            ("matrix", [a, b, c, d, e, f]) => Affine::new([*a, *b, *c, *d, *e, *f]),
            ("translate", [tx]) => Affine::translate((*tx, 0.0)),
            ("translate", [tx, ty]) => Affine::translate((*tx, *ty)),
            ("scale", [s]) => Affine::scale(*s),
            ("scale", [sx, sy]) => Affine::scale_non_uniform(*sx, *sy),
            ("rotate", [deg]) => Affine::rotate(deg.to_radians()),
            ("rotate", [deg, cx, cy]) => {
                Affine::translate((*cx, *cy))
                    * Affine::rotate(deg.to_radians())
                    * Affine::translate((-*cx, -*cy))
            }
            ("skewX", [deg]) => Affine::skew(deg.to_radians().tan(), 0.0),
            ("skewY", [deg]) => Affine::skew(0.0, deg.to_radians().tan()),
            _ => return Err(bad()),
        };
        affine = affine * step;
    }
    Ok(affine)
}

fn shape_path(shape: &str, attrs: &HashMap<&str, &str>) -> Result<Option<BezPath>, AssetLoadError> {
    let path = match shape {
        "path" => {
            let Some(d) = attrs.get("d").filter(|d| !d.trim().is_empty()) else {
                return Ok(None);
            };
            BezPath::from_svg(d)
                .map_err(|e| AssetLoadError::Vector(format!("bad path data: {e}")))?
        }
        "polygon" | "polyline" => {
            let pts = numbers(attrs.get("points").copied().unwrap_or(""));
            if pts.len() < 6 {
                return Ok(None);
            }
            let mut path = BezPath::new();
            path.move_to((pts[0], pts[1]));
            for pair in pts[2..].chunks_exact(2) {
                path.line_to((pair[0], pair[1]));
            }
            path.close_path();
            path
        }
        "rect" => {
            let (x, y) = (number_attr(attrs, "x")?, number_attr(attrs, "y")?);
            let (w, h) = (number_attr(attrs, "width")?, number_attr(attrs, "height")?);
            if w <= 0.0 || h <= 0.0 {
                return Ok(None);
            }
            let rx = number_attr(attrs, "rx")?.max(number_attr(attrs, "ry")?);
            if rx > 0.0 {
                RoundedRect::new(x, y, x + w, y + h, rx.min(w.min(h) / 2.0)).to_path(SVG_TOLERANCE)
            } else {
                Rect::new(x, y, x + w, y + h).to_path(SVG_TOLERANCE)
            }
        }
        "circle" => {
            let r = number_attr(attrs, "r")?;
            if r <= 0.0 {
                return Ok(None);
            }
            Circle::new((number_attr(attrs, "cx")?, number_attr(attrs, "cy")?), r)
                .to_path(SVG_TOLERANCE)
        }
        "ellipse" => {
            let (rx, ry) = (number_attr(attrs, "rx")?, number_attr(attrs, "ry")?);
            if rx <= 0.0 || ry <= 0.0 {
                return Ok(None);
            }
            Ellipse::new(
                (number_attr(attrs, "cx")?, number_attr(attrs, "cy")?),
                (rx, ry),
                0.0,
            )
            .to_path(SVG_TOLERANCE)
        }
        _ => return Ok(None),
    };
    Ok(Some(path))
}

/// Flatten curves to polylines and flip to y-up. Open subpaths are closed.
fn flatten(path: &BezPath, fill_rule: FillRule) -> PlanarPath {
    let mut outline = PlanarPath::new(fill_rule);
    let mut current: Vec<Vec2> = Vec::new();
    path.flatten(SVG_TOLERANCE, |el| match el {
        PathEl::MoveTo(p) => {
            outline.push_contour(std::mem::take(&mut current));
            current.push(Vec2::new(p.x as f32, -p.y as f32));
        }
        PathEl::LineTo(p) => current.push(Vec2::new(p.x as f32, -p.y as f32)),
        PathEl::ClosePath => outline.push_contour(std::mem::take(&mut current)),
        _ => {}
    });
    outline.push_contour(current);
    outline
}
