use std::path::Path;

use chrono::NaiveDate;
use tokio::sync::{mpsc, oneshot};

use aniflix_core::error::AniflixError;
use aniflix_core::models::{
    CatalogLookup, Favorite, FavoriteInput, Profile, ProfilePatch, WatchStatus, WatchlistEntry,
};
use aniflix_core::storage::Storage;
use aniflix_core::watchlist::{self, EntrySubmission, SubmitOutcome};

type Reply<T> = oneshot::Sender<Result<T, AniflixError>>;

/// Handle to the thread that owns the SQLite connection.
#[derive(Clone)]
pub struct DbHandle {
    tx: mpsc::UnboundedSender<DbCommand>,
}

enum DbCommand {
    SubmitEntry {
        user_id: i64,
        anime_id: i64,
        submission: Box<EntrySubmission>,
        catalog: CatalogLookup,
        today: NaiveDate,
        reply: Reply<SubmitOutcome>,
    },
    GetWatchlist {
        user_id: i64,
        status: Option<WatchStatus>,
        reply: Reply<Vec<WatchlistEntry>>,
    },
    GetWatchlistEntry {
        user_id: i64,
        anime_id: i64,
        reply: Reply<Option<WatchlistEntry>>,
    },
    GetFavorites {
        user_id: i64,
        reply: Reply<Vec<Favorite>>,
    },
    GetFavorite {
        user_id: i64,
        anime_id: i64,
        reply: Reply<Option<Favorite>>,
    },
    UpsertFavorite {
        user_id: i64,
        anime_id: i64,
        input: FavoriteInput,
        reply: Reply<Favorite>,
    },
    DeleteFavorite {
        user_id: i64,
        anime_id: i64,
        reply: Reply<bool>,
    },
    EnsureProfile {
        user_id: i64,
        reply: Reply<Profile>,
    },
    GetProfileByUsername {
        username: String,
        reply: Reply<Option<Profile>>,
    },
    UpdateProfile {
        user_id: i64,
        patch: ProfilePatch,
        reply: Reply<Profile>,
    },
    SetUsername {
        user_id: i64,
        username: String,
        reply: Reply<Profile>,
    },
    RecountCompleted {
        user_id: i64,
        reply: Reply<u32>,
    },
}

impl DbHandle {
    /// Open the database file and start the actor thread.
    pub fn open(path: &Path) -> Result<Self, AniflixError> {
        let storage = Storage::open(path)?;
        Self::spawn(storage)
    }

    /// Start the actor thread around an already-open store.
    pub fn spawn(storage: Storage) -> Result<Self, AniflixError> {
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("db-actor".into())
            .spawn(move || actor_loop(storage, rx))?;

        Ok(Self { tx })
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> DbCommand,
    ) -> Result<T, AniflixError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .map_err(|_| AniflixError::StoreClosed)?;
        rx.await.unwrap_or(Err(AniflixError::StoreClosed))
    }

    pub async fn submit_entry(
        &self,
        user_id: i64,
        anime_id: i64,
        submission: EntrySubmission,
        catalog: CatalogLookup,
        today: NaiveDate,
    ) -> Result<SubmitOutcome, AniflixError> {
        self.request(|reply| DbCommand::SubmitEntry {
            user_id,
            anime_id,
            submission: Box::new(submission),
            catalog,
            today,
            reply,
        })
        .await
    }

    pub async fn get_watchlist(
        &self,
        user_id: i64,
        status: Option<WatchStatus>,
    ) -> Result<Vec<WatchlistEntry>, AniflixError> {
        self.request(|reply| DbCommand::GetWatchlist {
            user_id,
            status,
            reply,
        })
        .await
    }

    pub async fn get_watchlist_entry(
        &self,
        user_id: i64,
        anime_id: i64,
    ) -> Result<Option<WatchlistEntry>, AniflixError> {
        self.request(|reply| DbCommand::GetWatchlistEntry {
            user_id,
            anime_id,
            reply,
        })
        .await
    }

    pub async fn get_favorites(&self, user_id: i64) -> Result<Vec<Favorite>, AniflixError> {
        self.request(|reply| DbCommand::GetFavorites { user_id, reply })
            .await
    }

    pub async fn get_favorite(
        &self,
        user_id: i64,
        anime_id: i64,
    ) -> Result<Option<Favorite>, AniflixError> {
        self.request(|reply| DbCommand::GetFavorite {
            user_id,
            anime_id,
            reply,
        })
        .await
    }

    pub async fn upsert_favorite(
        &self,
        user_id: i64,
        anime_id: i64,
        input: FavoriteInput,
    ) -> Result<Favorite, AniflixError> {
        self.request(|reply| DbCommand::UpsertFavorite {
            user_id,
            anime_id,
            input,
            reply,
        })
        .await
    }

    pub async fn delete_favorite(&self, user_id: i64, anime_id: i64) -> Result<bool, AniflixError> {
        self.request(|reply| DbCommand::DeleteFavorite {
            user_id,
            anime_id,
            reply,
        })
        .await
    }

    pub async fn ensure_profile(&self, user_id: i64) -> Result<Profile, AniflixError> {
        self.request(|reply| DbCommand::EnsureProfile { user_id, reply })
            .await
    }

    pub async fn get_profile_by_username(
        &self,
        username: impl Into<String>,
    ) -> Result<Option<Profile>, AniflixError> {
        let username = username.into();
        self.request(|reply| DbCommand::GetProfileByUsername { username, reply })
            .await
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        patch: ProfilePatch,
    ) -> Result<Profile, AniflixError> {
        self.request(|reply| DbCommand::UpdateProfile {
            user_id,
            patch,
            reply,
        })
        .await
    }

    pub async fn set_username(
        &self,
        user_id: i64,
        username: impl Into<String>,
    ) -> Result<Profile, AniflixError> {
        let username = username.into();
        self.request(|reply| DbCommand::SetUsername {
            user_id,
            username,
            reply,
        })
        .await
    }

    pub async fn recount_completed(&self, user_id: i64) -> Result<u32, AniflixError> {
        self.request(|reply| DbCommand::RecountCompleted { user_id, reply })
            .await
    }
}

fn actor_loop(mut storage: Storage, mut rx: mpsc::UnboundedReceiver<DbCommand>) {
    tracing::debug!("DB actor started");

    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            DbCommand::SubmitEntry {
                user_id,
                anime_id,
                submission,
                catalog,
                today,
                reply,
            } => {
                let _ = reply.send(watchlist::submit_entry(
                    &mut storage,
                    user_id,
                    anime_id,
                    &submission,
                    &catalog,
                    today,
                ));
            }
            DbCommand::GetWatchlist {
                user_id,
                status,
                reply,
            } => {
                let result = match status {
                    Some(status) => storage.get_watchlist_by_status(user_id, status),
                    None => storage.get_watchlist(user_id),
                };
                let _ = reply.send(result);
            }
            DbCommand::GetWatchlistEntry {
                user_id,
                anime_id,
                reply,
            } => {
                let _ = reply.send(storage.get_watchlist_entry(user_id, anime_id));
            }
            DbCommand::GetFavorites { user_id, reply } => {
                let _ = reply.send(storage.get_favorites(user_id));
            }
            DbCommand::GetFavorite {
                user_id,
                anime_id,
                reply,
            } => {
                let _ = reply.send(storage.get_favorite(user_id, anime_id));
            }
            DbCommand::UpsertFavorite {
                user_id,
                anime_id,
                input,
                reply,
            } => {
                let _ = reply.send(storage.upsert_favorite(user_id, anime_id, &input));
            }
            DbCommand::DeleteFavorite {
                user_id,
                anime_id,
                reply,
            } => {
                let _ = reply.send(storage.delete_favorite(user_id, anime_id));
            }
            DbCommand::EnsureProfile { user_id, reply } => {
                let _ = reply.send(storage.ensure_profile(user_id));
            }
            DbCommand::GetProfileByUsername { username, reply } => {
                let _ = reply.send(storage.get_profile_by_username(&username));
            }
            DbCommand::UpdateProfile {
                user_id,
                patch,
                reply,
            } => {
                let _ = reply.send(storage.update_profile(user_id, &patch));
            }
            DbCommand::SetUsername {
                user_id,
                username,
                reply,
            } => {
                let result = storage
                    .ensure_profile(user_id)
                    .and_then(|_| storage.set_username(user_id, &username))
                    .and_then(|_| storage.ensure_profile(user_id));
                let _ = reply.send(result);
            }
            DbCommand::RecountCompleted { user_id, reply } => {
                let result = storage.recount_completed(user_id);
                if let Ok(total) = &result {
                    tracing::info!(user_id, total, "Recounted completed anime");
                }
                let _ = reply.send(result);
            }
        }
    }

    tracing::debug!("DB actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stopped_actor_is_retryable() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let db = DbHandle { tx };

        let err = db.ensure_profile(1).await.unwrap_err();
        assert!(matches!(err, AniflixError::StoreClosed));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_dropped_reply_is_retryable() {
        let (tx, mut rx) = mpsc::unbounded_channel::<DbCommand>();
        std::thread::spawn(move || {
            // Receive one command and drop it without replying.
            let _ = rx.blocking_recv();
        });
        let db = DbHandle { tx };

        let err = db.recount_completed(1).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
