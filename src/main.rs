mod catalog;
mod config;
mod errors;
mod media;
mod models;
mod storage;
mod youtube;

use anyhow::Result;
use catalog::{filter_shows_by_title, group_shows_by_category, CatalogStore};
use clap::{Parser, Subcommand};
use config::Configuration;
use errors::CatalogError;
use models::{parse_tags, Show, Video, VideoDraft};
use std::path::PathBuf;
use storage::{FileSlotStorage, MemorySlotStorage, SlotStorage};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "kflix.yaml")]
    config: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Turn on admin mode (adding and removing content)
    #[arg(long)]
    admin: bool,

    /// Apply the command without saving the catalog
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the video id a URL or bare id resolves to
    Resolve { input: String },

    /// List the video library
    Videos,

    /// List shows, optionally filtered by title
    Shows {
        #[arg(short, long, default_value = "")]
        query: String,
    },

    /// Home page rows: shows grouped by category
    Rows {
        #[arg(short, long, default_value = "")]
        query: String,
    },

    /// Seasons and episodes of a show
    Show {
        id: String,
        /// Also print each episode's thumbnail
        #[arg(long)]
        thumbnails: bool,
    },

    /// Print the embed URL for a video
    Play { id: String },

    /// Add a video to the library
    AddVideo {
        /// YouTube URL or ID
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        category: Option<String>,
        /// Comma-separated
        #[arg(long, default_value = "")]
        tags: String,
        /// Image file to embed as the thumbnail
        #[arg(long)]
        thumbnail: Option<PathBuf>,
    },

    /// Delete a video added in admin mode, along with its episodes
    DeleteVideo { id: String },

    /// Create a show with empty seasons
    AddShow {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 1)]
        seasons: u32,
        #[arg(long)]
        thumbnail: Option<PathBuf>,
    },

    /// Delete a show with all of its seasons and episodes
    DeleteShow { id: String },

    /// Attach an episode to a season, from the library or a pasted URL
    AddEpisode {
        #[arg(long)]
        show: String,
        #[arg(long)]
        season: u32,
        /// Id of a library video
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        video: Option<String>,
        /// YouTube URL or ID; the video is added to the library too
        #[arg(long)]
        url: Option<String>,
        /// Title for a video added through --url
        #[arg(long, default_value = "")]
        title: String,
    },

    /// Remove one episode from a season
    RemoveEpisode {
        #[arg(long)]
        show: String,
        #[arg(long)]
        season: u32,
        #[arg(long)]
        episode: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, command output to stdout
    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = Configuration::load_or_default(&cli.config)?;
    debug!("Configuration loaded from: {}", cli.config);

    let admin = cli.admin || config.admin();
    let key = config.storage_key();
    let storage = FileSlotStorage::new(config.storage_dir());
    info!("Catalog storage: {}", storage.dir().display());

    let result = if cli.dry_run {
        // Work on an in-memory copy of the slot; nothing is written back
        let mut memory = MemorySlotStorage::new();
        if let Some(raw) = storage.read(&key)? {
            memory.write(&key, &raw)?;
        }
        run(cli.command, &mut CatalogStore::open(memory, key), &config, admin)
    } else {
        run(cli.command, &mut CatalogStore::open(storage, key), &config, admin)
    };

    if let Err(e) = result {
        if let Some(err) = e.downcast_ref::<CatalogError>() {
            if err.is_validation() {
                warn!("{}", err);
                std::process::exit(2);
            }
        }
        return Err(e);
    }
    Ok(())
}

fn require_admin(admin: bool, action: &'static str) -> Result<(), CatalogError> {
    if admin {
        Ok(())
    } else {
        Err(CatalogError::AdminModeRequired(action))
    }
}

fn run<S: SlotStorage>(
    command: Command,
    store: &mut CatalogStore<S>,
    config: &Configuration,
    admin: bool,
) -> Result<()> {
    match command {
        Command::Resolve { input } => {
            let id = youtube::require_video_id(&input)?;
            println!("{}", id);
            println!("thumbnail: {}", youtube::thumbnail_url(&id));
            println!("embed:     {}", youtube::embed_url(&id));
        }
        Command::Videos => {
            let snapshot = store.snapshot();
            for video in &snapshot.videos {
                let origin = if video.added_by_admin { "admin" } else { "seed" };
                println!(
                    "{}\t{}\t[{}]\t{}\t{}",
                    video.id,
                    video.title,
                    video.category,
                    video.tags.join(","),
                    origin
                );
            }
        }
        Command::Shows { query } => {
            let snapshot = store.snapshot();
            if let Some(featured) = snapshot.featured() {
                debug!("Featured show: {}", featured.title);
            }
            for show in filter_shows_by_title(&snapshot.shows, &query) {
                print_show_line(show);
            }
        }
        Command::Rows { query } => {
            let snapshot = store.snapshot();
            let filtered = filter_shows_by_title(&snapshot.shows, &query);
            for group in group_shows_by_category(filtered) {
                println!("== {}", group.category);
                for show in group.shows {
                    print_show_line(show);
                }
            }
        }
        Command::Show { id, thumbnails } => {
            let snapshot = store.snapshot();
            let Some(show) = snapshot.show(&id) else {
                warn!("Show not found: {}", id);
                return Ok(());
            };
            println!("{} ({} season(s)) - {}", show.title, show.seasons.len(), show.category);
            for season in &show.seasons {
                println!("Season {}: {} episode(s)", season.season_number, season.episodes.len());
                for entry in snapshot.episode_entries(season) {
                    println!("  {}\t{}\t{}", entry.episode.id, entry.episode.video_id, entry.title());
                    if thumbnails {
                        println!("    {}", entry.thumbnail());
                    }
                }
            }
        }
        Command::Play { id } => {
            let snapshot = store.snapshot();
            let video = match snapshot.video(&id) {
                Some(video) => video.clone(),
                None => {
                    warn!("Video {} is not in the library, playing bare id", id);
                    Video::new(id)
                }
            };
            println!("{}", video.title);
            if !video.description.is_empty() {
                println!("{}", video.description);
            }
            println!("{}", youtube::embed_url(&video.id));
        }
        Command::AddVideo {
            url,
            title,
            description,
            category,
            tags,
            thumbnail,
        } => {
            require_admin(admin, "add videos")?;
            let thumbnail = thumbnail.as_deref().map(media::thumbnail_from_file).transpose()?;
            let draft = VideoDraft {
                title,
                description,
                category: category.unwrap_or_else(|| config.video_category()),
                tags: parse_tags(&tags),
                thumbnail,
            };
            let id = store.add_video_from_input(&url, draft)?;
            println!("{}", id);
        }
        Command::DeleteVideo { id } => {
            require_admin(admin, "delete videos")?;
            store.delete_video(&id)?;
        }
        Command::AddShow {
            title,
            category,
            seasons,
            thumbnail,
        } => {
            require_admin(admin, "create shows")?;
            let thumbnail = thumbnail.as_deref().map(media::thumbnail_from_file).transpose()?;
            let category = category.unwrap_or_else(|| config.show_category());
            let id = store.add_show(Show::with_seasons(&title, &category, seasons, thumbnail));
            println!("{}", id);
        }
        Command::DeleteShow { id } => {
            require_admin(admin, "delete shows")?;
            if !store.delete_show(&id) {
                warn!("Show not found: {}", id);
            }
        }
        Command::AddEpisode {
            show,
            season,
            video,
            url,
            title,
        } => {
            require_admin(admin, "add episodes")?;
            let episode = match (video, url) {
                (Some(video), _) => store.add_episode(&show, season, &video),
                (None, Some(url)) => store.add_episode_from_input(&show, season, &url, &title)?,
                (None, None) => anyhow::bail!("either --video or --url is required"),
            };
            match episode {
                Some(id) => println!("{}", id),
                None => warn!("Show {} has no season {}", show, season),
            }
        }
        Command::RemoveEpisode {
            show,
            season,
            episode,
        } => {
            require_admin(admin, "remove episodes")?;
            if !store.remove_episode(&show, season, &episode) {
                warn!("Episode {} not found in {} season {}", episode, show, season);
            }
        }
    }
    Ok(())
}

fn print_show_line(show: &Show) {
    println!(
        "{}\t{}\t{} season(s)\t{} episode(s)\t{}",
        show.id,
        show.title,
        show.seasons.len(),
        show.episode_count(),
        show.category
    );
}
