use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};

use crate::error::AniflixError;
use crate::models::{
    Favorite, FavoriteInput, Profile, ProfilePatch, WatchStatus, WatchlistEntry,
    DEFAULT_BANNER_IMAGE, DEFAULT_PROFILE_PICTURE,
};
use crate::reconcile::CounterDelta;

const SCHEMA_V1: &str = include_str!("../../../migrations/001_initial.sql");

const ENTRY_COLUMNS: &str = "user_id, anime_id, anime_title, image_url, status, episodes_watched,
     user_score, total_episodes, created_at, updated_at";

const PROFILE_COLUMNS: &str = "user_id, username, description, profile_picture, banner_image,
     total_anime_watched, created_at, updated_at";

const FAVORITE_COLUMNS: &str =
    "user_id, anime_id, title, rating, episodes, image, created_at, updated_at";

/// SQLite-backed storage for watchlists, favorites and profiles.
pub struct Storage {
    conn: Connection,
}

/// Field values for one watchlist write, decided while the write
/// transaction holds the previous entry.
#[derive(Debug, Clone)]
pub struct EntryFields {
    pub anime_title: String,
    pub image_url: Option<String>,
    pub status: WatchStatus,
    pub episodes_watched: u32,
    pub user_score: f32,
    pub total_episodes: u32,
    pub delta: CounterDelta,
}

/// A committed watchlist write.
#[derive(Debug, Clone)]
pub struct EntryCommit {
    /// The entry as re-read after commit.
    pub entry: WatchlistEntry,
    pub previous: Option<WatchlistEntry>,
    pub delta: CounterDelta,
}

impl Storage {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, AniflixError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, AniflixError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    // ── Watchlist ───────────────────────────────────────────────

    /// Read-modify-write of one `(user, anime)` entry in a single immediate
    /// transaction.
    ///
    /// `decide` sees the previous entry (if any) and returns the fields to
    /// store. The entry upsert and the profile counter adjustment commit
    /// together; if `decide` fails nothing is written.
    pub fn write_watchlist_entry<F>(
        &mut self,
        user_id: i64,
        anime_id: i64,
        decide: F,
    ) -> Result<EntryCommit, AniflixError>
    where
        F: FnOnce(Option<&WatchlistEntry>) -> Result<EntryFields, AniflixError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let previous = query_entry(&tx, user_id, anime_id)?;
        let fields = decide(previous.as_ref())?;

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO watchlist_entry (user_id, anime_id, anime_title, image_url, status,
             episodes_watched, user_score, total_episodes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT(user_id, anime_id) DO UPDATE SET
               anime_title = excluded.anime_title,
               image_url = excluded.image_url,
               status = excluded.status,
               episodes_watched = excluded.episodes_watched,
               user_score = excluded.user_score,
               total_episodes = excluded.total_episodes,
               updated_at = excluded.updated_at",
            params![
                user_id,
                anime_id,
                fields.anime_title,
                fields.image_url,
                fields.status.as_db_str(),
                fields.episodes_watched,
                fields.user_score,
                fields.total_episodes,
                now,
            ],
        )?;

        if fields.delta != CounterDelta::Unchanged {
            apply_counter_delta(&tx, user_id, fields.delta.as_i64())?;
        }

        let entry = query_entry(&tx, user_id, anime_id)?
            .ok_or_else(|| AniflixError::NotFound(format!("watchlist entry {anime_id}")))?;
        tx.commit()?;

        Ok(EntryCommit {
            entry,
            previous,
            delta: fields.delta,
        })
    }

    /// Get the entry for one anime in a user's watchlist.
    pub fn get_watchlist_entry(
        &self,
        user_id: i64,
        anime_id: i64,
    ) -> Result<Option<WatchlistEntry>, AniflixError> {
        query_entry(&self.conn, user_id, anime_id)
    }

    /// Get a user's whole watchlist, most recently updated first.
    pub fn get_watchlist(&self, user_id: i64) -> Result<Vec<WatchlistEntry>, AniflixError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM watchlist_entry
             WHERE user_id = ?1
             ORDER BY updated_at DESC, anime_id"
        ))?;
        let rows = stmt
            .query_map(params![user_id], row_to_watchlist_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get a user's watchlist entries with the given status, by title.
    pub fn get_watchlist_by_status(
        &self,
        user_id: i64,
        status: WatchStatus,
    ) -> Result<Vec<WatchlistEntry>, AniflixError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM watchlist_entry
             WHERE user_id = ?1 AND status = ?2
             ORDER BY anime_title"
        ))?;
        let rows = stmt
            .query_map(
                params![user_id, status.as_db_str()],
                row_to_watchlist_entry,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Profile ─────────────────────────────────────────────────

    /// Get a profile, creating it with defaults on first use.
    pub fn ensure_profile(&self, user_id: i64) -> Result<Profile, AniflixError> {
        insert_default_profile(&self.conn, user_id)?;
        self.get_profile(user_id)?
            .ok_or_else(|| AniflixError::NotFound(format!("profile {user_id}")))
    }

    pub fn get_profile(&self, user_id: i64) -> Result<Option<Profile>, AniflixError> {
        self.conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profile WHERE user_id = ?1"),
                params![user_id],
                |row| Ok(row_to_profile(row)),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_profile_by_username(&self, username: &str) -> Result<Option<Profile>, AniflixError> {
        self.conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profile WHERE username = ?1"),
                params![username],
                |row| Ok(row_to_profile(row)),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Apply a partial profile update and return the result.
    pub fn update_profile(&self, user_id: i64, patch: &ProfilePatch) -> Result<Profile, AniflixError> {
        insert_default_profile(&self.conn, user_id)?;
        self.conn.execute(
            "UPDATE profile SET
               description = COALESCE(?1, description),
               profile_picture = COALESCE(?2, profile_picture),
               banner_image = COALESCE(?3, banner_image),
               updated_at = ?4
             WHERE user_id = ?5",
            params![
                patch.description,
                patch.profile_picture,
                patch.banner_image,
                Utc::now().to_rfc3339(),
                user_id,
            ],
        )?;
        self.ensure_profile(user_id)
    }

    /// Claim a username for an existing profile.
    pub fn set_username(&self, user_id: i64, username: &str) -> Result<(), AniflixError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AniflixError::MissingFields("username".into()));
        }
        let profile = self
            .get_profile(user_id)?
            .ok_or_else(|| AniflixError::NotFound(format!("profile {user_id}")))?;
        if profile.username.as_deref() == Some(username) {
            return Ok(());
        }
        if self.get_profile_by_username(username)?.is_some() {
            return Err(AniflixError::UsernameTaken(username.to_string()));
        }

        let result = self.conn.execute(
            "UPDATE profile SET username = ?1, updated_at = ?2 WHERE user_id = ?3",
            params![username, Utc::now().to_rfc3339(), user_id],
        );
        match result {
            Ok(_) => Ok(()),
            // Lost a race with another claim of the same name.
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(AniflixError::UsernameTaken(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically add `delta` to the completed counter (floored at zero).
    pub fn adjust_profile_counter(&self, user_id: i64, delta: i64) -> Result<(), AniflixError> {
        apply_counter_delta(&self.conn, user_id, delta)
    }

    /// Recompute the completed counter from the watchlist itself.
    ///
    /// Corrects any drift in `total_anime_watched`; returns the new value.
    pub fn recount_completed(&self, user_id: i64) -> Result<u32, AniflixError> {
        insert_default_profile(&self.conn, user_id)?;
        self.conn.execute(
            "UPDATE profile SET
               total_anime_watched = (SELECT COUNT(*) FROM watchlist_entry
                                      WHERE user_id = ?1 AND status = ?2),
               updated_at = ?3
             WHERE user_id = ?1",
            params![
                user_id,
                WatchStatus::Completed.as_db_str(),
                Utc::now().to_rfc3339()
            ],
        )?;
        let total: u32 = self.conn.query_row(
            "SELECT total_anime_watched FROM profile WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    // ── Favorites ───────────────────────────────────────────────

    /// Insert or update a favorite; `title` and `image` must be non-empty.
    pub fn upsert_favorite(
        &self,
        user_id: i64,
        anime_id: i64,
        input: &FavoriteInput,
    ) -> Result<Favorite, AniflixError> {
        if input.title.trim().is_empty() || input.image.trim().is_empty() {
            return Err(AniflixError::MissingFields("title and image are required".into()));
        }
        self.conn.execute(
            "INSERT INTO favorite (user_id, anime_id, title, rating, episodes, image,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(user_id, anime_id) DO UPDATE SET
               title = excluded.title,
               rating = excluded.rating,
               episodes = excluded.episodes,
               image = excluded.image,
               updated_at = excluded.updated_at",
            params![
                user_id,
                anime_id,
                input.title,
                input.rating,
                input.episodes,
                input.image,
                Utc::now().to_rfc3339(),
            ],
        )?;
        self.get_favorite(user_id, anime_id)?
            .ok_or_else(|| AniflixError::NotFound(format!("favorite {anime_id}")))
    }

    pub fn get_favorite(
        &self,
        user_id: i64,
        anime_id: i64,
    ) -> Result<Option<Favorite>, AniflixError> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {FAVORITE_COLUMNS} FROM favorite WHERE user_id = ?1 AND anime_id = ?2"
                ),
                params![user_id, anime_id],
                |row| Ok(row_to_favorite(row)),
            )
            .optional()
            .map_err(Into::into)
    }

    /// All favorites of a user, oldest first.
    pub fn get_favorites(&self, user_id: i64) -> Result<Vec<Favorite>, AniflixError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FAVORITE_COLUMNS} FROM favorite WHERE user_id = ?1
             ORDER BY created_at, anime_id"
        ))?;
        let rows = stmt
            .query_map(params![user_id], |row| Ok(row_to_favorite(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Remove a favorite. Returns whether one existed.
    pub fn delete_favorite(&self, user_id: i64, anime_id: i64) -> Result<bool, AniflixError> {
        let removed = self.conn.execute(
            "DELETE FROM favorite WHERE user_id = ?1 AND anime_id = ?2",
            params![user_id, anime_id],
        )?;
        Ok(removed > 0)
    }
}

// ── Migrations ──────────────────────────────────────────────────

/// Run schema migrations using `PRAGMA user_version` for version tracking.
fn run_migrations(conn: &Connection) -> Result<(), AniflixError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    Ok(())
}

// ── Shared statements ───────────────────────────────────────────

fn query_entry(
    conn: &Connection,
    user_id: i64,
    anime_id: i64,
) -> Result<Option<WatchlistEntry>, AniflixError> {
    conn.query_row(
        &format!(
            "SELECT {ENTRY_COLUMNS} FROM watchlist_entry WHERE user_id = ?1 AND anime_id = ?2"
        ),
        params![user_id, anime_id],
        row_to_watchlist_entry,
    )
    .optional()
    .map_err(Into::into)
}

fn insert_default_profile(conn: &Connection, user_id: i64) -> Result<(), AniflixError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR IGNORE INTO profile (user_id, username, description, profile_picture,
         banner_image, total_anime_watched, created_at, updated_at)
         VALUES (?1, NULL, '', ?2, ?3, 0, ?4, ?4)",
        params![user_id, DEFAULT_PROFILE_PICTURE, DEFAULT_BANNER_IMAGE, now],
    )?;
    Ok(())
}

/// In-SQL increment so concurrent completions never lose an update.
fn apply_counter_delta(conn: &Connection, user_id: i64, delta: i64) -> Result<(), AniflixError> {
    insert_default_profile(conn, user_id)?;
    conn.execute(
        "UPDATE profile SET
           total_anime_watched = MAX(total_anime_watched + ?1, 0),
           updated_at = ?2
         WHERE user_id = ?3",
        params![delta, Utc::now().to_rfc3339(), user_id],
    )?;
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────

/// Parse a datetime string from SQLite (either RFC 3339 or SQLite's `datetime('now')` format).
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return naive.and_utc();
    }
    DateTime::default()
}

// ── Row mapping helpers ─────────────────────────────────────────

/// An unknown status is an error, never a default: the stored status is
/// the previous status the completion counter is computed from.
fn row_to_watchlist_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<WatchlistEntry> {
    let status_str: String = row.get(4)?;
    let status = WatchStatus::from_db_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown watch status: {status_str:?}").into(),
        )
    })?;
    let created_str: String = row.get(8).unwrap_or_default();
    let updated_str: String = row.get(9).unwrap_or_default();

    Ok(WatchlistEntry {
        user_id: row.get(0)?,
        anime_id: row.get(1)?,
        anime_title: row.get(2).unwrap_or_default(),
        image_url: row.get(3).unwrap_or(None),
        status,
        episodes_watched: row.get(5).unwrap_or(0),
        user_score: row.get(6).unwrap_or(0.0),
        total_episodes: row.get(7).unwrap_or(0),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> Profile {
    let created_str: String = row.get(6).unwrap_or_default();
    let updated_str: String = row.get(7).unwrap_or_default();

    Profile {
        user_id: row.get(0).unwrap_or(0),
        username: row.get(1).unwrap_or(None),
        description: row.get(2).unwrap_or_default(),
        profile_picture: row
            .get(3)
            .unwrap_or_else(|_| DEFAULT_PROFILE_PICTURE.to_string()),
        banner_image: row
            .get(4)
            .unwrap_or_else(|_| DEFAULT_BANNER_IMAGE.to_string()),
        total_anime_watched: row.get(5).unwrap_or(0),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    }
}

fn row_to_favorite(row: &rusqlite::Row<'_>) -> Favorite {
    let created_str: String = row.get(6).unwrap_or_default();
    let updated_str: String = row.get(7).unwrap_or_default();

    Favorite {
        user_id: row.get(0).unwrap_or(0),
        anime_id: row.get(1).unwrap_or(0),
        title: row.get(2).unwrap_or_default(),
        rating: row.get(3).unwrap_or(None),
        episodes: row.get(4).unwrap_or(None),
        image: row.get(5).unwrap_or_default(),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    }
}
