use crate::error::AssetLoadError;

/// Texture addressing mode along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
}

/// Decoded RGBA8 image ready for upload.
#[derive(Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
}

impl std::fmt::Debug for TextureImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("wrap_u", &self.wrap_u)
            .field("wrap_v", &self.wrap_v)
            .finish_non_exhaustive()
    }
}

/// Decode PNG/JPEG/GIF/WebP/BMP bytes. Surface textures tile on both axes.
pub fn decode_texture(bytes: &[u8]) -> Result<TextureImage, AssetLoadError> {
    if bytes.is_empty() {
        return Err(AssetLoadError::Image("empty image".into()));
    }
    let img = image::load_from_memory(bytes).map_err(|e| AssetLoadError::Image(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(AssetLoadError::Image("image has zero size".into()));
    }
    Ok(TextureImage {
        width,
        height,
        rgba: rgba.into_raw(),
        wrap_u: WrapMode::Repeat,
        wrap_v: WrapMode::Repeat,
    })
}
