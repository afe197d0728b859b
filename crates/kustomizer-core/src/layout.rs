//! Flattened, persistable result of a customization session.

use crate::loaders::{decode_data_uri, to_data_uri};
use crate::state::CustomizationState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_MIME: &str = "image/png";

/// Rendered frame plus the customization it shows. Never mutated after capture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    /// PNG bytes; serialized as a base64 `data:image/png` URI.
    #[serde(alias = "image", with = "png_data_uri")]
    pub raster_image: Vec<u8>,
    #[serde(alias = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "data")]
    pub source_data: CustomizationState,
}

impl LayoutSnapshot {
    pub fn capture(png: Vec<u8>, state: &CustomizationState) -> Self {
        Self::capture_at(png, state, Utc::now())
    }

    pub fn capture_at(png: Vec<u8>, state: &CustomizationState, created_at: DateTime<Utc>) -> Self {
        Self {
            raster_image: png,
            created_at,
            source_data: state.without_layout(),
        }
    }

    pub fn image_data_uri(&self) -> String {
        to_data_uri(SNAPSHOT_MIME, &self.raster_image)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

mod png_data_uri {
    use super::SNAPSHOT_MIME;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_data_uri(SNAPSHOT_MIME, bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let uri = String::deserialize(deserializer)?;
        super::decode_data_uri(&uri).map_err(D::Error::custom)
    }
}
