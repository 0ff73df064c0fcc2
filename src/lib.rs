//! # Recipe Pages
//!
//! Static recipe pages generated from a headless CMS, kept fresh with
//! incremental revalidation.
//!
//! # Architecture: Three Stateless Stages
//!
//! ```text
//! 1. Enumerate   content API  →  slugs            (which pages exist)
//! 2. Resolve     slug         →  Option<Recipe>   (one entry per page)
//! 3. Render      recipe       →  HTML             (or the loading skeleton)
//! ```
//!
//! No stage keeps state between invocations. The [`generate`] module composes
//! them into full builds and revalidation passes, and the [`serve`] module
//! adds on-demand generation for slugs published after the last build.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `recipes.toml` loading, defaults merging, validation, color CSS |
//! | [`content`] | `ContentSource` trait, Delivery API client, offline fixture source |
//! | [`recipe`] | Typed projection of raw entries, with field-level errors |
//! | [`richtext`] | Rich-text node tree and its HTML renderer |
//! | [`paths`] | Stage 1: slug enumeration and fallback policy |
//! | [`resolve`] | Stage 2: slug → recipe lookup with revalidation interval |
//! | [`render`] | Stage 3: recipe page and skeleton markup (Maud) |
//! | [`ledger`] | Generation times and markup hashes for revalidation |
//! | [`generate`] | Build, on-demand, and revalidation passes over the output directory |
//! | [`serve`] | Local HTTP server with stale-while-revalidate recipe routes |
//! | [`output`] | CLI output formatting |
//! | [`types`] | Shared types (`AssetRef`) |
//!
//! # Design Decisions
//!
//! ## Explicit Configuration
//!
//! The API client is built from a [`config::ContentfulConfig`] value. Nothing
//! below `main` reads environment variables, so tests and multiple sites can
//! run side by side with different credentials.
//!
//! ## Rich Text as a Closed Tree
//!
//! Rich-text fields are lowered into [`richtext::Node`] before rendering.
//! The renderer is a plain `match` over node variants; node types the CMS
//! adds later fall back to rendering their children.
//!
//! ## Content-Hashed Revalidation
//!
//! A revalidation pass re-renders every page older than the interval but only
//! rewrites files whose markup hash changed, so a deploy sync after
//! `revalidate` uploads just the recipes that were actually edited.

pub mod config;
pub mod content;
pub mod generate;
pub mod ledger;
pub mod output;
pub mod paths;
pub mod recipe;
pub mod render;
pub mod resolve;
pub mod richtext;
pub mod serve;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
