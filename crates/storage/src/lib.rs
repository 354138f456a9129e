pub mod dto;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use error::{Result, StorageError};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn catalog(&self) -> repository::CatalogRepository<'_> {
        repository::CatalogRepository::new(&self.pool)
    }

    pub fn associations(&self) -> repository::AssociationRepository<'_> {
        repository::AssociationRepository::new(&self.pool)
    }

    pub fn records(&self) -> repository::RecordRepository<'_> {
        repository::RecordRepository::new(&self.pool)
    }
}
