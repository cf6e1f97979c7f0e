use clap::{ArgAction, Args, Parser, Subcommand};

use aniflix_api::AnimeSeason;
use aniflix_core::models::WatchStatus;

#[derive(Debug, Parser)]
#[command(name = "aniflix")]
#[command(about = "Track the anime you watch, plan and finish")]
#[command(version)]
pub struct Cli {
    /// Profile to act on (defaults to `general.user_id` from config)
    #[arg(long, global = true)]
    pub user: Option<i64>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look anime up in the catalog
    Anime {
        #[command(subcommand)]
        cmd: AnimeCommand,
    },
    /// Show or edit your watchlist
    List {
        #[command(subcommand)]
        cmd: ListCommand,
    },
    /// Manage favorites
    Fav {
        #[command(subcommand)]
        cmd: FavCommand,
    },
    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        cmd: ProfileCommand,
    },
}

#[derive(Debug, Args)]
pub struct PageArg {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
}

#[derive(Debug, Subcommand)]
pub enum AnimeCommand {
    /// Details for one anime, with your entry and favorite flag
    Show { anime_id: i64 },
    /// Search by title
    Search {
        query: String,
        #[command(flatten)]
        page: PageArg,
    },
    /// Most popular anime
    Trending {
        /// Restrict to one genre ("All" for no filter)
        #[arg(long)]
        genre: Option<String>,
        #[command(flatten)]
        page: PageArg,
    },
    /// Browse a season (defaults to the current one)
    Season {
        #[arg(long)]
        season: Option<AnimeSeason>,
        #[arg(long)]
        year: Option<u32>,
        #[command(flatten)]
        page: PageArg,
    },
}

#[derive(Debug, Subcommand)]
pub enum ListCommand {
    /// Show the watchlist, most recently updated first
    Show {
        #[arg(long)]
        status: Option<WatchStatus>,
    },
    /// Add or update one anime
    Set {
        anime_id: i64,
        /// watching, completed, plan-to-watch, on-hold or dropped
        #[arg(long)]
        status: String,
        #[arg(long, default_value_t = 0.0)]
        episodes: f64,
        /// 0 to 10
        #[arg(long, default_value_t = 0.0)]
        score: f64,
        /// Display title (looked up when omitted)
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavCommand {
    /// Favorite an anime; missing fields come from the catalog
    Add {
        anime_id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        rating: Option<f32>,
        #[arg(long)]
        episodes: Option<u32>,
    },
    Remove { anime_id: i64 },
    List,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Show a profile, yours or another user's by name
    Show {
        #[arg(long)]
        username: Option<String>,
    },
    Edit {
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        picture: Option<String>,
        #[arg(long)]
        banner: Option<String>,
    },
    /// Claim a username
    Username { name: String },
    /// Recompute the completed counter from the watchlist
    Recount,
}
