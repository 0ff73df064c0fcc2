//! Content Delivery API access.
//!
//! Everything the site knows about recipes comes through the [`ContentSource`]
//! trait, which answers exactly two query shapes: "all entries of a content
//! type" (paged with `skip`/`limit`) and "entries of a content type whose
//! `fields.slug` equals S". Two implementations exist:
//!
//! - [`ContentfulClient`]: blocking HTTP against the hosted API, built from an
//!   explicit [`ContentfulConfig`]. No retries; every failure propagates.
//! - [`FixtureSource`]: answers the same queries from a JSON export in the
//!   API's response shape, either held in memory or re-read from disk on each
//!   query so edits to the file are picked up by revalidation.
//!
//! ## Wire format
//!
//! ```json
//! {
//!   "total": 1, "skip": 0, "limit": 100,
//!   "items": [{ "sys": { "id": "...", "contentType": { "sys": { "id": "recipe" } } },
//!               "fields": { "slug": "toast", "featuredImage": { "sys": { "type": "Link", "linkType": "Asset", "id": "img1" } } } }],
//!   "includes": { "Asset": [{ "sys": { "id": "img1" },
//!                             "fields": { "file": { "url": "//...", "details": { "image": { "width": 1, "height": 1 } } } } }] }
//! }
//! ```

use crate::config::{ConfigError, ContentfulConfig};
use crate::types::AssetRef;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content API returned {status} ({id}): {message}")]
    Api {
        status: u16,
        id: String,
        message: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ============================================================================
// Queries
// ============================================================================

/// One request against the entries endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    pub content_type: String,
    /// Exact match on `fields.slug`.
    pub slug: Option<String>,
    pub skip: u32,
    pub limit: u32,
}

impl EntryQuery {
    /// All entries of a content type, first page.
    pub fn all(content_type: &str, limit: u32) -> Self {
        Self {
            content_type: content_type.to_string(),
            slug: None,
            skip: 0,
            limit,
        }
    }

    /// Entries of a content type with the given slug. Slugs are unique, so
    /// one result is enough.
    pub fn by_slug(content_type: &str, slug: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            slug: Some(slug.to_string()),
            skip: 0,
            limit: 1,
        }
    }

    pub fn at(mut self, skip: u32) -> Self {
        self.skip = skip;
        self
    }

    /// Query-string parameters for the entries endpoint.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("content_type", self.content_type.clone())];
        if let Some(slug) = &self.slug {
            params.push(("fields.slug", slug.clone()));
        }
        params.push(("skip", self.skip.to_string()));
        params.push(("limit", self.limit.to_string()));
        // One level of links is enough to reach the featured image asset
        params.push(("include", "1".to_string()));
        params
    }
}

// ============================================================================
// Response types
// ============================================================================

/// A page of entries plus the linked assets the API included with them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryPage {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub skip: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub items: Vec<Entry>,
    #[serde(default)]
    pub includes: Includes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub sys: Sys,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Entry {
    /// The entry's `fields.slug`, when it is a string.
    pub fn slug(&self) -> Option<&str> {
        self.fields.get("slug").and_then(Value::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.sys.content_type.as_ref().map(|link| link.sys.id.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sys {
    pub id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// `{ "sys": { "type": "Link", "linkType": "Asset", "id": "..." } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub sys: LinkSys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSys {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Includes {
    #[serde(default, rename = "Asset", skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<Asset>,
}

impl Includes {
    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.sys.id == id)
    }

    /// Resolve an asset id to a renderable reference. `None` when the asset
    /// is not included or carries no image dimensions.
    pub fn asset_ref(&self, id: &str) -> Option<AssetRef> {
        self.asset(id).and_then(Asset::image_ref)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub sys: Sys,
    #[serde(default)]
    pub fields: AssetFields,
}

impl Asset {
    pub fn image_ref(&self) -> Option<AssetRef> {
        let file = self.fields.file.as_ref()?;
        let image = file.details.as_ref()?.image.as_ref()?;
        Some(AssetRef {
            url: file.url.clone(),
            width: image.width,
            height: image.height,
            title: self.fields.title.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<AssetFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFile {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<FileDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDetails {
    pub width: u32,
    pub height: u32,
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    sys: Option<LinkSys>,
    #[serde(default)]
    message: Option<String>,
}

fn api_error(status: u16, body: &str) -> ContentError {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
    let id = parsed
        .as_ref()
        .and_then(|b| b.sys.as_ref())
        .map(|s| s.id.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let message = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.trim().to_string());
    ContentError::Api {
        status,
        id,
        message,
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Anything that can answer entry queries.
///
/// `Send + Sync` so one source can serve parallel page generations.
pub trait ContentSource: Send + Sync {
    fn entries(&self, query: &EntryQuery) -> Result<EntryPage, ContentError>;
}

/// Blocking client for the hosted Content Delivery API.
pub struct ContentfulClient {
    client: Client,
    access_token: String,
    entries_url: String,
}

impl ContentfulClient {
    /// Build a client from explicit configuration. Fails when credentials
    /// are missing.
    pub fn new(config: &ContentfulConfig) -> Result<Self, ContentError> {
        config.require_credentials()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("recipe-pages/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            access_token: config.access_token.clone(),
            entries_url: entries_url(config),
        })
    }
}

/// `https://{host}/spaces/{space}/environments/{env}/entries`
///
/// A host that already carries a scheme is used as-is, which lets a local
/// mock stand in for the API.
pub fn entries_url(config: &ContentfulConfig) -> String {
    let host = config.host.trim_end_matches('/');
    let base = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    format!(
        "{base}/spaces/{}/environments/{}/entries",
        config.space_id, config.environment
    )
}

impl ContentSource for ContentfulClient {
    fn entries(&self, query: &EntryQuery) -> Result<EntryPage, ContentError> {
        debug!(
            content_type = %query.content_type,
            slug = ?query.slug,
            skip = query.skip,
            "querying entries"
        );
        let response = self
            .client
            .get(&self.entries_url)
            .bearer_auth(&self.access_token)
            .query(&query.params())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let page: EntryPage = response.json()?;
        info!(
            returned = page.items.len(),
            total = page.total,
            "entries fetched"
        );
        Ok(page)
    }
}

/// Answers queries from a JSON export shaped like an API response.
pub struct FixtureSource {
    origin: FixtureOrigin,
}

enum FixtureOrigin {
    Memory(EntryPage),
    File(PathBuf),
}

impl FixtureSource {
    pub fn from_export(export: EntryPage) -> Self {
        Self {
            origin: FixtureOrigin::Memory(export),
        }
    }

    /// Re-read `path` on every query.
    pub fn watch(path: &Path) -> Result<Self, ContentError> {
        // Parse once up front so a broken file fails at startup
        read_export(path)?;
        Ok(Self {
            origin: FixtureOrigin::File(path.to_path_buf()),
        })
    }
}

fn read_export(path: &Path) -> Result<EntryPage, ContentError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

impl ContentSource for FixtureSource {
    fn entries(&self, query: &EntryQuery) -> Result<EntryPage, ContentError> {
        let loaded;
        let export = match &self.origin {
            FixtureOrigin::Memory(export) => export,
            FixtureOrigin::File(path) => {
                loaded = read_export(path)?;
                &loaded
            }
        };

        let matching: Vec<&Entry> = export
            .items
            .iter()
            .filter(|e| e.content_type() == Some(query.content_type.as_str()))
            .filter(|e| match &query.slug {
                Some(slug) => e.slug() == Some(slug.as_str()),
                None => true,
            })
            .collect();

        Ok(EntryPage {
            total: matching.len() as u32,
            skip: query.skip,
            limit: query.limit,
            items: matching
                .into_iter()
                .skip(query.skip as usize)
                .take(query.limit as usize)
                .cloned()
                .collect(),
            includes: export.includes.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn params_for_listing() {
        let params = EntryQuery::all("recipe", 100).at(200).params();
        assert_eq!(
            params,
            vec![
                ("content_type", "recipe".to_string()),
                ("skip", "200".to_string()),
                ("limit", "100".to_string()),
                ("include", "1".to_string()),
            ]
        );
    }

    #[test]
    fn params_for_slug_lookup() {
        let params = EntryQuery::by_slug("recipe", "banana-bread").params();
        assert!(params.contains(&("fields.slug", "banana-bread".to_string())));
        assert!(params.contains(&("limit", "1".to_string())));
    }

    #[test]
    fn entries_url_from_host() {
        let mut config = ContentfulConfig::default();
        config.space_id = "sp4ce".to_string();
        assert_eq!(
            entries_url(&config),
            "https://cdn.contentful.com/spaces/sp4ce/environments/master/entries"
        );

        config.host = "http://127.0.0.1:9000/".to_string();
        config.environment = "staging".to_string();
        assert_eq!(
            entries_url(&config),
            "http://127.0.0.1:9000/spaces/sp4ce/environments/staging/entries"
        );
    }

    #[test]
    fn client_requires_credentials() {
        let result = ContentfulClient::new(&ContentfulConfig::default());
        assert!(matches!(result, Err(ContentError::Config(_))));
    }

    #[test]
    fn api_error_reads_error_body() {
        let body = r#"{"sys":{"type":"Error","id":"AccessTokenInvalid"},"message":"The access token you sent could not be found or is invalid."}"#;
        match api_error(401, body) {
            ContentError::Api {
                status,
                id,
                message,
            } => {
                assert_eq!(status, 401);
                assert_eq!(id, "AccessTokenInvalid");
                assert!(message.contains("access token"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn api_error_falls_back_to_raw_body() {
        let err = api_error(502, "Bad Gateway\n");
        assert_eq!(
            err.to_string(),
            "content API returned 502 (Unknown): Bad Gateway"
        );
    }

    #[test]
    fn parse_api_response_shape() {
        let page: EntryPage = serde_json::from_value(export_json(vec![recipe_json(
            "toast",
            "Toast",
            5,
            &["bread"],
        )]))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].slug(), Some("toast"));
        assert_eq!(page.items[0].content_type(), Some("recipe"));
        let asset = page.includes.asset_ref("img-toast").unwrap();
        assert_eq!(asset.width, 1200);
        assert_eq!(asset.height, 800);
    }

    #[test]
    fn asset_without_image_details_has_no_ref() {
        let asset: Asset = serde_json::from_value(serde_json::json!({
            "sys": { "id": "pdf" },
            "fields": { "file": { "url": "//assets.ctfassets.net/x.pdf", "details": { "size": 10 } } }
        }))
        .unwrap();
        assert!(asset.image_ref().is_none());
    }

    #[test]
    fn fixture_filters_by_content_type_and_slug() {
        let source = fixture_source(vec![
            recipe_json("toast", "Toast", 5, &["bread"]),
            recipe_json("soup", "Soup", 40, &["water"]),
            entry_json("author-1", "author", serde_json::json!({ "slug": "toast" })),
        ]);

        let page = source
            .entries(&EntryQuery::by_slug("recipe", "toast"))
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].sys.id, "toast");

        let page = source.entries(&EntryQuery::all("recipe", 100)).unwrap();
        assert_eq!(page.total, 2);
    }

    #[test]
    fn fixture_applies_skip_and_limit() {
        let source = fixture_source(
            (0..5)
                .map(|i| recipe_json(&format!("r{i}"), "R", 1, &["x"]))
                .collect(),
        );
        let page = source.entries(&EntryQuery::all("recipe", 2).at(4)).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].slug(), Some("r4"));
    }

    #[test]
    fn watched_fixture_picks_up_edits() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("export.json");
        write_export(&path, vec![recipe_json("toast", "Toast", 5, &["bread"])]);
        let source = FixtureSource::watch(&path).unwrap();

        write_export(
            &path,
            vec![
                recipe_json("toast", "Toast", 5, &["bread"]),
                recipe_json("soup", "Soup", 40, &["water"]),
            ],
        );
        let page = source.entries(&EntryQuery::all("recipe", 100)).unwrap();
        assert_eq!(page.total, 2);
    }

    #[test]
    fn watch_rejects_broken_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("export.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            FixtureSource::watch(&path),
            Err(ContentError::Json(_))
        ));
    }
}
