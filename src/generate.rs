//! Static page generation and incremental revalidation.
//!
//! Composes the three stages (enumerate → resolve → render) and writes the
//! results to the output directory:
//!
//! ```text
//! dist/
//! ├── .revalidate-ledger.json    # generation time + markup hash per slug
//! └── recipes/
//!     ├── _fallback.html         # skeleton served while a page is generated
//!     ├── banana-bread/
//!     │   └── index.html
//!     └── toast/
//!         └── index.html
//! ```
//!
//! ## Entry points
//!
//! - [`build`]: enumerate every slug and generate all pages.
//! - [`generate_slug`]: generate a single page on demand (first request for
//!   a slug that was not enumerated, or a stale page).
//! - [`revalidate`]: regenerate pages older than the revalidation interval,
//!   add newly published slugs, and rewrite only pages whose markup changed.
//!
//! Pages are resolved and rendered in parallel on the rayon pool; the ledger
//! and the filesystem writes are handled on the calling thread afterwards.

use crate::config::SiteConfig;
use crate::content::{ContentError, ContentSource};
use crate::ledger::{self, Ledger};
use crate::paths::{self, StaticPaths};
use crate::render;
use crate::resolve::{self, PageProps, ResolveError};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid slug {0:?}")]
    InvalidSlug(String),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("{slug}: {source}")]
    Resolve { slug: String, source: ResolveError },
}

/// What happened to a page's file during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// First generation for this slug.
    Added,
    /// Markup changed and the file was rewritten.
    Updated,
    /// Markup identical to the last generation; file left alone.
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct GeneratedPage {
    pub slug: String,
    /// `None` when no entry matched and the skeleton was written.
    pub title: Option<String>,
    pub status: PageStatus,
}

#[derive(Debug)]
pub struct BuildReport {
    pub paths: StaticPaths,
    pub pages: Vec<GeneratedPage>,
}

#[derive(Debug)]
pub struct RevalidateReport {
    pub pages: Vec<GeneratedPage>,
    /// Pages skipped because they are younger than the interval.
    pub fresh: usize,
}

impl RevalidateReport {
    pub fn count(&self, status: PageStatus) -> usize {
        self.pages.iter().filter(|p| p.status == status).count()
    }
}

/// A rendered page not yet written to disk.
struct RenderedPage {
    slug: String,
    title: Option<String>,
    html: String,
    hash: String,
}

/// Names under `recipes/` that belong to the generator, not to entries.
const RESERVED_SLUGS: &[&str] = &["_fallback", "_fallback.html"];

/// Reject slugs that cannot safely become a single path segment.
pub fn validate_slug(slug: &str) -> Result<(), GenerateError> {
    let invalid = slug.is_empty()
        || slug == "."
        || slug == ".."
        || RESERVED_SLUGS.contains(&slug)
        || slug
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control());
    if invalid {
        return Err(GenerateError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

/// `<output>/recipes/<slug>/index.html`
pub fn page_path(output_dir: &Path, slug: &str) -> PathBuf {
    output_dir.join("recipes").join(slug).join("index.html")
}

/// `<output>/recipes/_fallback.html`
pub fn fallback_path(output_dir: &Path) -> PathBuf {
    output_dir.join("recipes").join("_fallback.html")
}

fn render_slug(
    source: &dyn ContentSource,
    config: &SiteConfig,
    slug: &str,
) -> Result<RenderedPage, GenerateError> {
    validate_slug(slug)?;
    let props = resolve::resolve_entry(source, config, slug).map_err(|source| {
        GenerateError::Resolve {
            slug: slug.to_string(),
            source,
        }
    })?;
    let html = render::render_page(&props, config).into_string();
    Ok(RenderedPage {
        slug: slug.to_string(),
        title: props.recipe.map(|r| r.title),
        hash: ledger::hash_markup(&html),
        html,
    })
}

fn render_all(
    source: &dyn ContentSource,
    config: &SiteConfig,
    slugs: &[String],
) -> Result<Vec<RenderedPage>, GenerateError> {
    slugs
        .par_iter()
        .map(|slug| render_slug(source, config, slug))
        .collect()
}

/// Write a rendered page if its markup changed, and record it in the ledger.
fn write_page(
    output_dir: &Path,
    ledger: &mut Ledger,
    page: RenderedPage,
    now: u64,
) -> std::io::Result<GeneratedPage> {
    let path = page_path(output_dir, &page.slug);
    let status = match ledger.get(&page.slug) {
        None => PageStatus::Added,
        Some(entry) if entry.hash == page.hash && path.exists() => PageStatus::Unchanged,
        Some(_) => PageStatus::Updated,
    };

    if status != PageStatus::Unchanged {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &page.html)?;
        info!(slug = %page.slug, ?status, "wrote page");
    } else {
        debug!(slug = %page.slug, "page unchanged");
    }

    ledger.record(&page.slug, page.hash, now);
    Ok(GeneratedPage {
        slug: page.slug,
        title: page.title,
        status,
    })
}

/// Write the loading placeholder served for slugs without a page yet.
pub fn write_fallback(output_dir: &Path, config: &SiteConfig) -> std::io::Result<()> {
    let props = PageProps {
        recipe: None,
        revalidate: config.revalidate.interval(),
    };
    let path = fallback_path(output_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render::render_page(&props, config).into_string())
}

/// Generate every enumerated page.
pub fn build(
    source: &dyn ContentSource,
    config: &SiteConfig,
    output_dir: &Path,
) -> Result<BuildReport, GenerateError> {
    let paths = paths::enumerate_paths(source, &config.contentful)?;
    info!(count = paths.slugs.len(), "enumerated recipe paths");

    fs::create_dir_all(output_dir)?;
    write_fallback(output_dir, config)?;

    let rendered = render_all(source, config, &paths.slugs)?;

    let mut ledger = Ledger::load(output_dir);
    let now = ledger::unix_now();
    let pages = rendered
        .into_iter()
        .map(|page| write_page(output_dir, &mut ledger, page, now))
        .collect::<Result<Vec<_>, _>>()?;
    ledger.save(output_dir)?;

    Ok(BuildReport { paths, pages })
}

/// Generate a single page on demand.
///
/// Returns `None` when no entry matches a slug that has never been
/// generated; nothing is written and the ledger is left alone. A slug that
/// already has a page is rewritten even when its entry is gone, so the
/// stale recipe is replaced by the placeholder.
pub fn generate_slug(
    source: &dyn ContentSource,
    config: &SiteConfig,
    output_dir: &Path,
    slug: &str,
) -> Result<Option<GeneratedPage>, GenerateError> {
    let rendered = render_slug(source, config, slug)?;
    let mut ledger = Ledger::load(output_dir);
    if rendered.title.is_none() && ledger.get(slug).is_none() {
        debug!(slug, "no entry for unknown slug, nothing written");
        return Ok(None);
    }
    fs::create_dir_all(output_dir)?;
    let page = write_page(output_dir, &mut ledger, rendered, ledger::unix_now())?;
    ledger.save(output_dir)?;
    Ok(Some(page))
}

/// Regenerate stale pages and add newly published ones.
///
/// With `force`, every known page is regenerated regardless of age.
pub fn revalidate(
    source: &dyn ContentSource,
    config: &SiteConfig,
    output_dir: &Path,
    force: bool,
) -> Result<RevalidateReport, GenerateError> {
    revalidate_at(source, config, output_dir, force, ledger::unix_now())
}

fn revalidate_at(
    source: &dyn ContentSource,
    config: &SiteConfig,
    output_dir: &Path,
    force: bool,
    now: u64,
) -> Result<RevalidateReport, GenerateError> {
    let paths = paths::enumerate_paths(source, &config.contentful)?;
    let mut ledger = Ledger::load(output_dir);
    let interval = config.revalidate.interval();

    // Known pages first (including ones whose entry has since disappeared),
    // then slugs published since the last pass
    let mut due = Vec::new();
    let mut fresh = 0;
    for slug in ledger.pages.keys() {
        if force || ledger.is_stale(slug, now, interval) {
            due.push(slug.clone());
        } else {
            fresh += 1;
        }
    }
    due.extend(
        paths
            .slugs
            .into_iter()
            .filter(|slug| ledger.get(slug).is_none()),
    );
    debug!(due = due.len(), fresh, "revalidation plan");

    fs::create_dir_all(output_dir)?;
    write_fallback(output_dir, config)?;

    let rendered = render_all(source, config, &due)?;
    let pages = rendered
        .into_iter()
        .map(|page| write_page(output_dir, &mut ledger, page, now))
        .collect::<Result<Vec<_>, _>>()?;
    ledger.save(output_dir)?;

    Ok(RevalidateReport { pages, fresh })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn read_page(output_dir: &Path, slug: &str) -> String {
        fs::read_to_string(page_path(output_dir, slug)).unwrap()
    }

    #[test]
    fn validate_slug_rejects_traversal() {
        for bad in ["", ".", "..", "a/b", "a\\b", "_fallback", "_fallback.html", "tab\there"] {
            assert!(validate_slug(bad).is_err(), "{bad:?} should be rejected");
        }
        for good in ["toast", "banana-bread", "crème-brûlée", "v2.0", "_draft"] {
            assert!(validate_slug(good).is_ok(), "{good:?} should be accepted");
        }
    }

    #[test]
    fn build_writes_every_page_and_fallback() {
        let tmp = TempDir::new().unwrap();
        let source = fixture_source(vec![
            recipe_json("toast", "Toast", 5, &["bread"]),
            recipe_json("soup", "Soup", 40, &["water", "salt"]),
        ]);

        let report = build(&source, &SiteConfig::default(), tmp.path()).unwrap();

        assert_eq!(report.pages.len(), 2);
        assert!(report.pages.iter().all(|p| p.status == PageStatus::Added));
        assert!(read_page(tmp.path(), "toast").contains("<h2>Toast</h2>"));
        assert!(read_page(tmp.path(), "soup").contains("Takes about 40 minutes to cook."));
        assert!(
            fs::read_to_string(fallback_path(tmp.path()))
                .unwrap()
                .contains("skeleton")
        );
        assert_eq!(Ledger::load(tmp.path()).pages.len(), 2);
    }

    #[test]
    fn rebuild_without_changes_leaves_pages_unchanged() {
        let tmp = TempDir::new().unwrap();
        let source = fixture_source(vec![recipe_json("toast", "Toast", 5, &["bread"])]);
        let config = SiteConfig::default();

        build(&source, &config, tmp.path()).unwrap();
        let report = build(&source, &config, tmp.path()).unwrap();
        assert_eq!(report.pages[0].status, PageStatus::Unchanged);
    }

    #[test]
    fn build_propagates_malformed_entry() {
        let tmp = TempDir::new().unwrap();
        let mut entry = recipe_json("toast", "Toast", 5, &["bread"]);
        entry["fields"].as_object_mut().unwrap().remove("ingredients");
        let source = fixture_source(vec![entry]);

        let err = build(&source, &SiteConfig::default(), tmp.path()).unwrap_err();
        assert!(matches!(err, GenerateError::Resolve { ref slug, .. } if slug == "toast"));
    }

    #[test]
    fn build_propagates_api_failure() {
        let tmp = TempDir::new().unwrap();
        let err = build(&FailingSource, &SiteConfig::default(), tmp.path()).unwrap_err();
        assert!(matches!(err, GenerateError::Content(_)));
    }

    #[test]
    fn generate_unknown_slug_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let source = fixture_source(vec![recipe_json("toast", "Toast", 5, &["bread"])]);
        let config = SiteConfig::default();
        build(&source, &config, tmp.path()).unwrap();
        let before = fs::read_to_string(ledger::ledger_path(tmp.path())).unwrap();

        for i in 0..5 {
            let slug = format!("junk-{i}");
            assert!(generate_slug(&source, &config, tmp.path(), &slug).unwrap().is_none());
            assert!(!page_path(tmp.path(), &slug).exists());
        }

        let after = fs::read_to_string(ledger::ledger_path(tmp.path())).unwrap();
        assert_eq!(before, after);
        let report = revalidate(&source, &config, tmp.path(), true).unwrap();
        assert_eq!(report.pages.len(), 1);
    }

    #[test]
    fn generate_known_slug_after_unpublish_writes_placeholder() {
        let tmp = TempDir::new().unwrap();
        let config = SiteConfig::default();
        build(
            &fixture_source(vec![recipe_json("toast", "Toast", 5, &["bread"])]),
            &config,
            tmp.path(),
        )
        .unwrap();

        let page = generate_slug(&fixture_source(vec![]), &config, tmp.path(), "toast")
            .unwrap()
            .unwrap();
        assert_eq!(page.status, PageStatus::Updated);
        assert!(page.title.is_none());
        assert!(read_page(tmp.path(), "toast").contains("skeleton"));
    }

    #[test]
    fn underscore_slug_does_not_fail_build() {
        let tmp = TempDir::new().unwrap();
        let source = fixture_source(vec![recipe_json("_draft", "Draft", 5, &["bread"])]);
        let report = build(&source, &SiteConfig::default(), tmp.path()).unwrap();
        assert_eq!(report.pages[0].status, PageStatus::Added);
        assert!(read_page(tmp.path(), "_draft").contains("<h2>Draft</h2>"));
    }

    #[test]
    fn generate_slug_rejects_path_traversal() {
        let tmp = TempDir::new().unwrap();
        let source = fixture_source(vec![]);
        let err = generate_slug(&source, &SiteConfig::default(), tmp.path(), "../etc").unwrap_err();
        assert!(matches!(err, GenerateError::InvalidSlug(_)));
    }

    #[test]
    fn revalidate_skips_fresh_pages() {
        let tmp = TempDir::new().unwrap();
        let source = fixture_source(vec![recipe_json("toast", "Toast", 5, &["bread"])]);
        let mut config = SiteConfig::default();
        config.revalidate.interval_secs = 60;

        build(&source, &config, tmp.path()).unwrap();
        let generated_at = Ledger::load(tmp.path()).get("toast").unwrap().generated_at;

        let report = revalidate_at(&source, &config, tmp.path(), false, generated_at + 10).unwrap();
        assert_eq!(report.fresh, 1);
        assert!(report.pages.is_empty());
    }

    #[test]
    fn revalidate_rewrites_only_changed_pages() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("export.json");
        let out = tmp.path().join("dist");
        write_export(
            &path,
            vec![
                recipe_json("toast", "Toast", 5, &["bread"]),
                recipe_json("soup", "Soup", 40, &["water"]),
            ],
        );
        let source = crate::content::FixtureSource::watch(&path).unwrap();
        let config = SiteConfig::default();
        build(&source, &config, &out).unwrap();

        // Edit one entry upstream and publish a new one
        write_export(
            &path,
            vec![
                recipe_json("toast", "Toast", 5, &["bread"]),
                recipe_json("soup", "Soup", 45, &["water"]),
                recipe_json("salad", "Salad", 0, &["lettuce"]),
            ],
        );
        let report = revalidate_at(&source, &config, &out, true, u64::MAX / 2).unwrap();

        assert_eq!(report.count(PageStatus::Unchanged), 1);
        assert_eq!(report.count(PageStatus::Updated), 1);
        assert_eq!(report.count(PageStatus::Added), 1);
        assert!(read_page(&out, "soup").contains("Takes about 45 minutes to cook."));
        assert!(read_page(&out, "salad").contains("<h2>Salad</h2>"));
    }

    #[test]
    fn revalidate_replaces_unpublished_entry_with_placeholder() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("export.json");
        let out = tmp.path().join("dist");
        write_export(&path, vec![recipe_json("toast", "Toast", 5, &["bread"])]);
        let source = crate::content::FixtureSource::watch(&path).unwrap();
        let config = SiteConfig::default();
        build(&source, &config, &out).unwrap();

        write_export(&path, vec![]);
        let report = revalidate(&source, &config, &out, true).unwrap();

        assert_eq!(report.count(PageStatus::Updated), 1);
        assert!(report.pages[0].title.is_none());
        assert!(read_page(&out, "toast").contains("skeleton"));
    }
}
