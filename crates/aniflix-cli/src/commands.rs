use aniflix_core::models::{FavoriteInput, ProfilePatch};
use aniflix_core::watchlist::EntrySubmission;
use aniflix_runtime::{Runtime, RuntimeError};

use crate::cli::{AnimeCommand, Command, FavCommand, ListCommand, ProfileCommand};
use crate::output::{self, Output};

pub async fn run(
    runtime: &Runtime,
    user_id: i64,
    command: Command,
    out: &Output,
) -> Result<(), RuntimeError> {
    match command {
        Command::Anime { cmd } => anime(runtime, user_id, cmd, out).await,
        Command::List { cmd } => list(runtime, user_id, cmd, out).await,
        Command::Fav { cmd } => fav(runtime, user_id, cmd, out).await,
        Command::Profile { cmd } => profile(runtime, user_id, cmd, out).await,
    }
}

async fn anime(
    runtime: &Runtime,
    user_id: i64,
    cmd: AnimeCommand,
    out: &Output,
) -> Result<(), RuntimeError> {
    match cmd {
        AnimeCommand::Show { anime_id } => {
            let detail = runtime.anime_detail(user_id, anime_id).await?;
            out.emit(&detail, output::anime_detail);
        }
        AnimeCommand::Search { query, page } => {
            let results = runtime.search(&query, page.page).await?;
            out.emit(&results, output::search_page);
        }
        AnimeCommand::Trending { genre, page } => {
            let results = runtime.trending(genre.as_deref(), page.page).await?;
            out.emit(&results, output::search_page);
        }
        AnimeCommand::Season { season, year, page } => {
            let results = runtime.season(season, year, page.page).await?;
            out.emit(&results, output::search_page);
        }
    }
    Ok(())
}

async fn list(
    runtime: &Runtime,
    user_id: i64,
    cmd: ListCommand,
    out: &Output,
) -> Result<(), RuntimeError> {
    match cmd {
        ListCommand::Show { status } => {
            let rows = runtime.watchlist(user_id, status).await?;
            out.emit(&rows, |rows| output::watchlist(rows));
        }
        ListCommand::Set {
            anime_id,
            status,
            episodes,
            score,
            title,
            image,
        } => {
            let submission = EntrySubmission {
                status,
                episodes_watched: episodes,
                user_score: score,
                anime_title: title.unwrap_or_default(),
                image_url: image,
            };
            let outcome = runtime.submit_entry(user_id, anime_id, submission).await?;
            out.emit(&outcome, output::submit_outcome);
        }
    }
    Ok(())
}

async fn fav(
    runtime: &Runtime,
    user_id: i64,
    cmd: FavCommand,
    out: &Output,
) -> Result<(), RuntimeError> {
    match cmd {
        FavCommand::Add {
            anime_id,
            title,
            image,
            rating,
            episodes,
        } => {
            let input = FavoriteInput {
                title: title.unwrap_or_default(),
                rating,
                episodes,
                image: image.unwrap_or_default(),
            };
            let favorite = runtime.add_favorite(user_id, anime_id, input).await?;
            out.emit(&favorite, |f| format!("Added {} to favorites.", f.title));
        }
        FavCommand::Remove { anime_id } => {
            let removed = runtime.remove_favorite(user_id, anime_id).await?;
            out.emit(&removed, |removed| {
                if *removed {
                    "Removed from favorites.".into()
                } else {
                    "Not in your favorites.".into()
                }
            });
        }
        FavCommand::List => {
            let favorites = runtime.favorites(user_id).await?;
            out.emit(&favorites, |f| output::favorites(f));
        }
    }
    Ok(())
}

async fn profile(
    runtime: &Runtime,
    user_id: i64,
    cmd: ProfileCommand,
    out: &Output,
) -> Result<(), RuntimeError> {
    match cmd {
        ProfileCommand::Show { username } => {
            let profile = match username {
                Some(name) => runtime.profile_by_username(&name).await?,
                None => runtime.profile(user_id).await?,
            };
            out.emit(&profile, output::profile);
        }
        ProfileCommand::Edit {
            description,
            picture,
            banner,
        } => {
            let patch = ProfilePatch {
                description,
                profile_picture: picture,
                banner_image: banner,
            };
            let profile = runtime.update_profile(user_id, patch).await?;
            out.emit(&profile, output::profile);
        }
        ProfileCommand::Username { name } => {
            let profile = runtime.set_username(user_id, &name).await?;
            out.emit(&profile, output::profile);
        }
        ProfileCommand::Recount => {
            let total = runtime.recount_completed(user_id).await?;
            out.emit(&total, |t| format!("Completed anime: {t}"));
        }
    }
    Ok(())
}
