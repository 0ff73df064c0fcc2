//! Shared test utilities.
//!
//! Builders for entries in the Delivery API's JSON shape, plus content
//! sources that count or fail queries.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let source = fixture_source(vec![
//!     recipe_json("toast", "Toast", 5, &["bread", "butter"]),
//! ]);
//! let props = resolve_entry(&source, &SiteConfig::default(), "toast").unwrap();
//! ```

use serde_json::{Value, json};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::ContentfulConfig;
use crate::content::{ContentError, ContentSource, EntryPage, EntryQuery, FixtureSource};
use crate::recipe::Recipe;
use crate::richtext::Document;
use crate::types::AssetRef;

// =========================================================================
// JSON builders
// =========================================================================

/// An entry of any content type.
pub fn entry_json(id: &str, content_type: &str, fields: Value) -> Value {
    json!({
        "sys": {
            "id": id,
            "type": "Entry",
            "contentType": { "sys": { "type": "Link", "linkType": "ContentType", "id": content_type } }
        },
        "fields": fields
    })
}

/// One-paragraph method shared by every fixture recipe.
pub fn method_json() -> Value {
    json!({
        "nodeType": "document",
        "data": {},
        "content": [{
            "nodeType": "paragraph",
            "data": {},
            "content": [{ "nodeType": "text", "value": "Mix everything, then bake.", "marks": [], "data": {} }]
        }]
    })
}

/// A complete recipe entry. Its sys id equals the slug and its featured
/// image links to asset `img-{slug}`.
pub fn recipe_json(slug: &str, title: &str, cooking_time: i64, ingredients: &[&str]) -> Value {
    entry_json(
        slug,
        "recipe",
        json!({
            "slug": slug,
            "title": title,
            "cookingTime": cooking_time,
            "ingredients": ingredients,
            "method": method_json(),
            "featuredImage": { "sys": { "type": "Link", "linkType": "Asset", "id": format!("img-{slug}") } }
        }),
    )
}

fn asset_json(id: &str) -> Value {
    let name = id.trim_start_matches("img-");
    json!({
        "sys": { "id": id, "type": "Asset" },
        "fields": {
            "title": name,
            "file": {
                "url": format!("//images.ctfassets.net/space/{id}/{name}.jpg"),
                "contentType": "image/jpeg",
                "details": { "size": 20480, "image": { "width": 1200, "height": 800 } }
            }
        }
    })
}

/// An API response holding `items`, with every linked featured image
/// included.
pub fn export_json(items: Vec<Value>) -> Value {
    let assets: Vec<Value> = items
        .iter()
        .filter_map(|item| item.pointer("/fields/featuredImage/sys/id"))
        .filter_map(Value::as_str)
        .map(asset_json)
        .collect();
    json!({
        "sys": { "type": "Array" },
        "total": items.len(),
        "skip": 0,
        "limit": 100,
        "items": items,
        "includes": { "Asset": assets }
    })
}

pub fn write_export(path: &Path, items: Vec<Value>) {
    std::fs::write(path, serde_json::to_string_pretty(&export_json(items)).unwrap()).unwrap();
}

// =========================================================================
// Sources and values
// =========================================================================

pub fn fixture_source(items: Vec<Value>) -> FixtureSource {
    let export: EntryPage = serde_json::from_value(export_json(items)).unwrap();
    FixtureSource::from_export(export)
}

pub fn contentful_config() -> ContentfulConfig {
    ContentfulConfig::default()
}

/// A typed recipe without going through JSON. Title is the capitalized slug.
pub fn sample_recipe(slug: &str, cooking_time: u32, ingredients: &[&str]) -> Recipe {
    let mut title = slug.to_string();
    if let Some(first) = title.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    Recipe {
        id: slug.to_string(),
        slug: slug.to_string(),
        title,
        cooking_time: f64::from(cooking_time),
        ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        method: Document::from_value(&method_json(), |_| None).unwrap(),
        featured_image: AssetRef {
            url: format!("//images.ctfassets.net/space/img-{slug}/{slug}.jpg"),
            width: 1200,
            height: 800,
            title: None,
        },
    }
}

/// Counts queries passed through to the inner source.
pub struct CountingSource<S> {
    inner: S,
    calls: AtomicUsize,
}

impl<S: ContentSource> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<S: ContentSource> ContentSource for CountingSource<S> {
    fn entries(&self, query: &EntryQuery) -> Result<EntryPage, ContentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.entries(query)
    }
}

/// Answers every query with a 503 from the API.
pub struct FailingSource;

impl ContentSource for FailingSource {
    fn entries(&self, _query: &EntryQuery) -> Result<EntryPage, ContentError> {
        Err(ContentError::Api {
            status: 503,
            id: "ServiceUnavailable".to_string(),
            message: "upstream unavailable".to_string(),
        })
    }
}
