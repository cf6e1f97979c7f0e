pub mod anilist;
pub mod catalog;
pub mod jikan;
pub mod traits;

pub use catalog::{Catalog, CatalogError, CatalogKind, CatalogSettings};
pub use traits::{
    AnimeDetails, AnimeSearchResult, AnimeSeason, CatalogService, FuzzyDate, LookupError,
    SearchPage,
};
