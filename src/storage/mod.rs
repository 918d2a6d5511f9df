pub mod postgres;

pub use postgres::PgListingStore;

use async_trait::async_trait;

use crate::common::error::Result;
use crate::feed::normalizer::NormalizedListing;

/// Storage port for persisting an import. One call replaces the whole table.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Atomically swaps the table contents for `listings`, returning how many
    /// rows were written. An empty slice leaves the table cleared.
    async fn replace_all(&self, listings: &[NormalizedListing]) -> Result<u64>;
}
