mod anime;
mod favorite;
mod profile;
mod watchlist;

pub use anime::{CatalogLookup, CatalogSnapshot, ReleaseDate};
pub use favorite::{Favorite, FavoriteInput};
pub use profile::{Profile, ProfilePatch, DEFAULT_BANNER_IMAGE, DEFAULT_PROFILE_PICTURE};
pub use watchlist::{WatchStatus, WatchlistEntry};
