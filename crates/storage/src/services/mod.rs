pub mod catalog_cache;
pub mod classification;
pub mod ledger;
pub mod ownership;
pub mod snapshot;

pub use catalog_cache::{CacheConfig, CachedCatalog};
pub use ownership::{AthleteOwned, AthleteView};
