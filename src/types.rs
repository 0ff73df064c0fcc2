//! Shared types used by the content, rich-text, and rendering stages.

use serde::{Deserialize, Serialize};

/// A resolved image asset, held only for the duration of a render.
///
/// `url` is the API's raw file URL, which is protocol-relative
/// (`//images.ctfassets.net/...`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Asset title, used as alt text when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl AssetRef {
    /// The `src` attribute for this asset: `https:` prefixed to the raw URL.
    pub fn image_src(&self) -> String {
        format!("https:{}", self.url)
    }
}
