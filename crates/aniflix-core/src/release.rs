//! Release-date derivation.
//!
//! Catalogs hand out partial start dates (`year`/`month`/`day`, any of which
//! may be missing). Whether a title has released is always derived from that
//! date and the caller's notion of "today", never stored, so it cannot go
//! stale between the catalog fetch and the status gate.

use chrono::{Local, NaiveDate};

use crate::models::{CatalogSnapshot, ReleaseDate};

const UNANNOUNCED: &str = "Unannounced";

impl ReleaseDate {
    /// The full calendar date, if every part is present and valid.
    pub fn to_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year?, self.month?, self.day?)
    }

    /// True iff the full date is known and not after `today`.
    pub fn has_released(&self, today: NaiveDate) -> bool {
        self.to_date().is_some_and(|date| date <= today)
    }

    /// `has_released` against the local calendar date.
    pub fn has_released_now(&self) -> bool {
        self.has_released(Local::now().date_naive())
    }
}

impl std::fmt::Display for ReleaseDate {
    /// `day/month/year` with `??` for unknown parts, or `Unannounced`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some(year) = self.year else {
            return f.write_str(UNANNOUNCED);
        };
        let part = |v: Option<u32>| v.map_or_else(|| "??".to_string(), |v| v.to_string());
        write!(f, "{}/{}/{year}", part(self.day), part(self.month))
    }
}

impl CatalogSnapshot {
    pub fn has_released(&self, today: NaiveDate) -> bool {
        self.release_date.has_released(today)
    }
}
