//! Asset loading: where bytes come from, and how they become geometry or images.
//!
//! Fetching is abstracted behind [`AssetFetcher`] so the browser can use
//! `fetch()` while tests serve bytes from memory. Everything after the bytes
//! arrive (STL parsing, image decoding, SVG and font outlines) is plain Rust.

use crate::error::AssetLoadError;
use base64::Engine as _;
use futures::future::LocalBoxFuture;
use kurbo::{BezPath, PathEl, Point};

pub mod font;
pub mod mesh;
pub mod texture;
pub mod vector;

/// True when every point of `path` survives the cast to `f32` as a finite value.
///
/// Checked before flattening: kurbo sizes its subdivision from the point
/// coordinates, and tessellation rejects NaN outright.
pub(crate) fn fits_f32(path: &BezPath) -> bool {
    let ok = |p: &Point| (p.x as f32).is_finite() && (p.y as f32).is_finite();
    path.elements().iter().all(|el| match el {
        PathEl::MoveTo(p) | PathEl::LineTo(p) => ok(p),
        PathEl::QuadTo(a, b) => ok(a) && ok(b),
        PathEl::CurveTo(a, b, c) => ok(a) && ok(b) && ok(c),
        PathEl::ClosePath => true,
    })
}

/// Progress report for a running download. `total` is unknown for chunked responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl LoadProgress {
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(t) if t > 0 => Some((self.loaded as f64 / t as f64).min(1.0) as f32),
            _ => None,
        }
    }
}

/// Either a remote location or contents the user already handed over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetSource {
    Uri(String),
    Bytes(Vec<u8>),
}

impl AssetSource {
    pub fn uri(uri: impl Into<String>) -> Self {
        AssetSource::Uri(uri.into())
    }

    /// Short description for log lines; never dumps data URIs or file contents.
    pub fn describe(&self) -> String {
        match self {
            AssetSource::Uri(u) if u.starts_with("data:") => "data URI".to_string(),
            AssetSource::Uri(u) => u.clone(),
            AssetSource::Bytes(b) => format!("{} bytes in memory", b.len()),
        }
    }
}

impl From<Vec<u8>> for AssetSource {
    fn from(bytes: Vec<u8>) -> Self {
        AssetSource::Bytes(bytes)
    }
}

impl From<&str> for AssetSource {
    fn from(uri: &str) -> Self {
        AssetSource::Uri(uri.to_string())
    }
}

/// Asynchronous byte source for remote URIs.
pub trait AssetFetcher {
    fn fetch<'a>(
        &'a self,
        uri: &'a str,
        progress: &'a dyn Fn(LoadProgress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, AssetLoadError>>;
}

/// Resolve a source to its bytes. `data:` URIs are decoded locally.
pub async fn read_source<F: AssetFetcher + ?Sized>(
    fetcher: &F,
    source: &AssetSource,
    progress: &dyn Fn(LoadProgress),
) -> Result<Vec<u8>, AssetLoadError> {
    match source {
        AssetSource::Bytes(bytes) => {
            let len = bytes.len() as u64;
            progress(LoadProgress {
                loaded: len,
                total: Some(len),
            });
            Ok(bytes.clone())
        }
        AssetSource::Uri(uri) if uri.trim().is_empty() => Err(AssetLoadError::Fetch {
            uri: String::new(),
            reason: "empty URI".into(),
        }),
        AssetSource::Uri(uri) if uri.starts_with("data:") => decode_data_uri(uri),
        AssetSource::Uri(uri) => fetcher.fetch(uri, progress).await,
    }
}

/// Decode `data:[<mime>][;base64],<payload>`.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, AssetLoadError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| AssetLoadError::DataUri("missing data: scheme".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AssetLoadError::DataUri("missing ',' separator".into()))?;
    if header.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| AssetLoadError::DataUri(e.to_string()))
    } else {
        percent_decode(payload)
    }
}

fn percent_decode(s: &str) -> Result<Vec<u8>, AssetLoadError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| AssetLoadError::DataUri(format!("bad escape at byte {i}")))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Best-effort MIME type for image bytes, from their magic number.
pub fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    use image::ImageFormat;
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Gif) => "image/gif",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Bmp) => "image/bmp",
        _ => "application/octet-stream",
    }
}
