use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::common::error::Result;
use crate::feed::normalizer::NormalizedListing;
use crate::storage::ListingStore;

// Postgres caps bind parameters at 65535 per statement; 12 columns per row
// keeps chunks of 1000 rows comfortably inside that.
const INSERT_CHUNK_ROWS: usize = 1000;

/// Postgres-backed listing store. The pool is constructed once at startup and
/// injected wherever storage is needed.
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Applies `sql/schema.sql`, which only creates what is missing.
    pub async fn apply_schema(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../../sql/schema.sql"))
            .execute(&self.pool)
            .await?;
        info!("schema applied to imoveis table");
        Ok(())
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn replace_all(&self, listings: &[NormalizedListing]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        // TRUNCATE takes an ACCESS EXCLUSIVE lock, which also serializes
        // concurrent imports for the whole clear+insert span.
        sqlx::query("TRUNCATE TABLE imoveis RESTART IDENTITY")
            .execute(&mut *tx)
            .await?;

        for chunk in listings.chunks(INSERT_CHUNK_ROWS) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO imoveis (descricao, tipo, finalidade, qtd_quartos, \
                 qtd_banheiros, qtd_vagas, preco, area_imovel, link, bairro, cidade, ref) ",
            );
            builder.push_values(chunk, |mut row, listing| {
                row.push_bind(&listing.descricao)
                    .push_bind(&listing.tipo)
                    .push_bind(&listing.finalidade)
                    .push_bind(listing.qtd_quartos)
                    .push_bind(listing.qtd_banheiros)
                    .push_bind(listing.qtd_vagas)
                    .push_bind(listing.preco)
                    .push_bind(listing.area_imovel)
                    .push_bind(&listing.link)
                    .push_bind(&listing.bairro)
                    .push_bind(&listing.cidade)
                    .push_bind(&listing.referencia);
            });
            builder.build().execute(&mut *tx).await?;
            debug!(rows = chunk.len(), "inserted listing chunk");
        }

        // Any failure above drops `tx`, which rolls the transaction back and
        // leaves the previous table contents untouched.
        tx.commit().await?;

        Ok(listings.len() as u64)
    }
}
