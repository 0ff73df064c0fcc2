//! Entry resolution: slug → recipe.

use crate::config::SiteConfig;
use crate::content::{ContentError, ContentSource, EntryQuery};
use crate::recipe::{EntryError, Recipe};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("slug must not be empty")]
    EmptySlug,
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Entry(#[from] EntryError),
}

/// Everything the renderer needs for one page, plus how long the result may
/// be served before it is resolved again.
#[derive(Debug, Clone)]
pub struct PageProps {
    /// `None` when no entry has this slug (yet).
    pub recipe: Option<Recipe>,
    pub revalidate: Duration,
}

/// Look up the entry whose slug equals `slug`.
///
/// No match is `Ok` with an absent recipe, never an error. Concurrent
/// readers may see data up to one revalidation interval old.
pub fn resolve_entry(
    source: &dyn ContentSource,
    config: &SiteConfig,
    slug: &str,
) -> Result<PageProps, ResolveError> {
    if slug.is_empty() {
        return Err(ResolveError::EmptySlug);
    }

    let page = source.entries(&EntryQuery::by_slug(&config.contentful.content_type, slug))?;
    let recipe = page
        .items
        .first()
        .map(|entry| Recipe::from_entry(entry, &page.includes))
        .transpose()?;

    tracing::debug!(slug, found = recipe.is_some(), "resolved entry");
    Ok(PageProps {
        recipe,
        revalidate: config.revalidate.interval(),
    })
}
