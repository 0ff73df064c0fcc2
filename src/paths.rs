//! Path enumeration: which recipe pages should exist.
//!
//! Lists every entry of the configured content type, page by page, and
//! derives one route per slug. The result also carries the fallback policy:
//! slugs that are not listed are still servable and get generated the first
//! time they are requested.

use crate::config::ContentfulConfig;
use crate::content::{ContentError, ContentSource, EntryQuery};
use std::collections::HashSet;
use tracing::{debug, warn};

/// What a request for a slug outside [`StaticPaths::slugs`] gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Serve the loading placeholder and generate the page on demand.
    Placeholder,
    /// Answer 404.
    NotFound,
}

/// The routes known at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPaths {
    /// Slugs in API order, deduplicated.
    pub slugs: Vec<String>,
    pub fallback: Fallback,
}

/// Output route for a slug, relative to the site root.
pub fn route_for(slug: &str) -> String {
    format!("/recipes/{slug}")
}

/// Enumerate the slugs of every entry of the configured content type.
///
/// Content API errors propagate; there is no retry.
pub fn enumerate_paths(
    source: &dyn ContentSource,
    contentful: &ContentfulConfig,
) -> Result<StaticPaths, ContentError> {
    let mut slugs = Vec::new();
    let mut seen = HashSet::new();
    let mut skip = 0u32;

    loop {
        let query = EntryQuery::all(&contentful.content_type, contentful.page_size).at(skip);
        let page = source.entries(&query)?;
        debug!(skip, returned = page.items.len(), total = page.total, "listing page");

        for entry in &page.items {
            match entry.slug() {
                Some(slug) if !slug.is_empty() => {
                    if seen.insert(slug.to_string()) {
                        slugs.push(slug.to_string());
                    } else {
                        warn!(slug, entry = %entry.sys.id, "duplicate slug, keeping the first entry");
                    }
                }
                _ => warn!(entry = %entry.sys.id, "entry has no slug, skipping"),
            }
        }

        skip += page.items.len() as u32;
        if page.items.is_empty() || skip >= page.total {
            break;
        }
    }

    Ok(StaticPaths {
        slugs,
        fallback: Fallback::Placeholder,
    })
}
