use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::common::error::{ImportError, Result};
use crate::feed::normalizer::{normalize_listing, NormalizedListing};
use crate::feed::parser::parse_feed;
use crate::storage::ListingStore;

/// What to do when one listing's fields are unusable. `Abort` is the default:
/// a failed import leaves the previous table intact and is safe to retry.
/// `Skip` drops the bad records and reports how many were dropped, so the
/// loss is explicit, never silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingErrorPolicy {
    Abort,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported: u64,
    pub skipped: u64,
}

/// Use case for one feed import: parse, normalize every listing, replace the
/// table contents in a single storage call.
pub struct ImportUseCase {
    store: Arc<dyn ListingStore>,
    policy: MappingErrorPolicy,
    storage_timeout: Duration,
}

impl ImportUseCase {
    pub fn new(
        store: Arc<dyn ListingStore>,
        policy: MappingErrorPolicy,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            store,
            policy,
            storage_timeout,
        }
    }

    pub fn policy(&self) -> MappingErrorPolicy {
        self.policy
    }

    /// Imports the feed stored at `path` (the uploaded temp file).
    pub async fn import_file(&self, path: &Path) -> Result<ImportOutcome> {
        let xml = tokio::fs::read_to_string(path).await?;
        self.import_feed(&xml).await
    }

    /// Runs the full pipeline on raw feed text.
    pub async fn import_feed(&self, xml: &str) -> Result<ImportOutcome> {
        let listings = parse_feed(xml)?;
        info!(listings = listings.len(), "feed parsed");

        let mut rows: Vec<NormalizedListing> = Vec::with_capacity(listings.len());
        let mut skipped = 0u64;

        for (index, listing) in listings.iter().enumerate() {
            match normalize_listing(listing, index) {
                Ok(row) => rows.push(row),
                Err(err) if self.policy == MappingErrorPolicy::Skip => {
                    warn!(%err, "skipping unmappable listing");
                    skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        // The replace is all-or-nothing inside one transaction; the timeout
        // bounds how long we wait on storage before giving up and letting the
        // transaction roll back.
        let imported =
            match tokio::time::timeout(self.storage_timeout, self.store.replace_all(&rows)).await
            {
                Ok(result) => result?,
                Err(_) => return Err(ImportError::Timeout(self.storage_timeout)),
            };

        info!(imported, skipped, "import committed");
        Ok(ImportOutcome { imported, skipped })
    }
}
