pub mod catalog;
pub mod error;

pub use catalog::{
    apply::{SeedReport, apply_seed},
    models::SeedCatalog,
    validator::{SeedValidator, ValidationReport},
};
pub use error::{Result, SeederError};

use std::path::Path;

/// Reads and parses a catalog file without validating it.
pub async fn load_catalog(path: &Path) -> Result<SeedCatalog> {
    let json_content = tokio::fs::read_to_string(path).await?;
    let catalog: SeedCatalog = serde_json::from_str(&json_content)?;
    Ok(catalog)
}
