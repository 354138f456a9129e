use std::path::Path;

use seeder::{SeedReport, SeedValidator, apply_seed, load_catalog};
use storage::models::{Gender, WeightUnit};
use storage::repository::InMemoryStore;
use storage::services::classification::{resolve_divisions, resolve_weight_options};

fn catalog_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data/catalog.json"))
}

#[tokio::test]
async fn test_bundled_catalog_is_valid() {
    let catalog = load_catalog(catalog_path()).await.unwrap();
    let report = SeedValidator::validate(&catalog).unwrap();

    assert!(
        report.warnings.iter().any(|w| w.contains("Mixed Team")),
        "expected a warning for the team division without weights"
    );
}

#[tokio::test]
async fn test_bundled_catalog_applies_and_resolves() {
    let catalog = load_catalog(catalog_path()).await.unwrap();
    let store = InMemoryStore::new();

    let report = apply_seed(&store, &catalog).await.unwrap();
    assert_eq!(
        report,
        SeedReport {
            weight_categories: 3,
            disciplines: 2,
            divisions: 4,
        }
    );

    let bjj = resolve_divisions(&store, "brazilian jiu-jitsu").await.unwrap();
    assert_eq!(bjj.len(), 1);
    assert_eq!(bjj[0].gender, Gender::Male);

    let options = resolve_weight_options(&store, &bjj[0].division_id)
        .await
        .unwrap();
    assert_eq!(options.unit, Some(WeightUnit::Lb));
    assert_eq!(options.items.len(), 9);
    assert_eq!(options.items[8].limit, None);
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let result = load_catalog(Path::new("/nonexistent/catalog.json")).await;
    assert!(matches!(result, Err(seeder::SeederError::IoError(_))));
}
