//! Revalidation ledger for incremental regeneration.
//!
//! Every generated page is recorded with the time it was last generated and
//! a SHA-256 hash of its markup. Revalidation consults the ledger twice:
//!
//! - **Staleness**: a page is only resolved again once it is at least one
//!   revalidation interval old. Within the interval readers get the page as
//!   it was last generated.
//! - **Change detection**: a regenerated page is written to disk only when
//!   its markup hash differs from the recorded one. Unchanged pages keep
//!   their files and only get a fresh timestamp.
//!
//! ## Storage
//!
//! The ledger is a JSON file at `<output_dir>/.revalidate-ledger.json`, next
//! to the pages it describes. A missing, corrupt, or older-version ledger
//! loads as empty, which makes the next pass regenerate everything.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const LEDGER_FILENAME: &str = ".revalidate-ledger.json";

/// Bump to discard existing ledgers when the format or hashing changes.
const LEDGER_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Unix seconds of the last generation.
    pub generated_at: u64,
    /// SHA-256 of the page markup, hex.
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    pub version: u32,
    /// Keyed by slug.
    pub pages: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    pub fn empty() -> Self {
        Self {
            version: LEDGER_VERSION,
            pages: BTreeMap::new(),
        }
    }

    /// Load from the output directory, falling back to empty.
    pub fn load(output_dir: &Path) -> Self {
        let content = match std::fs::read_to_string(ledger_path(output_dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(ledger) if ledger.version == LEDGER_VERSION => ledger,
            Ok(ledger) => {
                tracing::info!(found = ledger.version, "ledger version changed, starting fresh");
                Self::empty()
            }
            Err(e) => {
                tracing::warn!(error = %e, "unreadable ledger, starting fresh");
                Self::empty()
            }
        }
    }

    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(ledger_path(output_dir), json)
    }

    pub fn get(&self, slug: &str) -> Option<&LedgerEntry> {
        self.pages.get(slug)
    }

    pub fn record(&mut self, slug: &str, hash: String, generated_at: u64) {
        self.pages
            .insert(slug.to_string(), LedgerEntry { generated_at, hash });
    }

    /// Whether `slug` is due for regeneration at `now`.
    ///
    /// Unknown slugs are always due.
    pub fn is_stale(&self, slug: &str, now: u64, interval: Duration) -> bool {
        match self.pages.get(slug) {
            Some(entry) => entry.generated_at.saturating_add(interval.as_secs()) <= now,
            None => true,
        }
    }
}

pub fn ledger_path(output_dir: &Path) -> PathBuf {
    output_dir.join(LEDGER_FILENAME)
}

/// SHA-256 of page markup, hex.
pub fn hash_markup(html: &str) -> String {
    format!("{:x}", Sha256::digest(html.as_bytes()))
}

/// Current time as unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
