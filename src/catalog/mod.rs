use crate::errors::CatalogError;
use crate::models::{Episode, Season, Show, Snapshot, Video, VideoDraft, UNCATEGORIZED};
use crate::storage::{load_snapshot, save_snapshot, SlotStorage};
use crate::youtube;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// Every operation below builds a new snapshot and leaves `self` untouched, so
// anyone still holding the previous one keeps a consistent view.
impl Snapshot {
    pub fn video(&self, id: &str) -> Option<&Video> {
        self.videos.iter().find(|v| v.id == id)
    }

    pub fn show(&self, id: &str) -> Option<&Show> {
        self.shows.iter().find(|s| s.id == id)
    }

    /// Show highlighted at the top of the home page.
    pub fn featured(&self) -> Option<&Show> {
        self.shows.first()
    }

    /// Newest first. A video whose id is already present is ignored.
    pub fn add_video(&self, video: Video) -> Snapshot {
        if self.video(&video.id).is_some() {
            return self.clone();
        }
        let mut videos = Vec::with_capacity(self.videos.len() + 1);
        videos.push(video);
        videos.extend(self.videos.iter().cloned());
        Snapshot {
            videos,
            shows: self.shows.clone(),
        }
    }

    /// Remove an admin-added video and every episode pointing at it.
    pub fn delete_video(&self, id: &str) -> Result<Snapshot, CatalogError> {
        let target = self
            .video(id)
            .ok_or_else(|| CatalogError::VideoNotFound(id.to_string()))?;
        if !target.added_by_admin {
            return Err(CatalogError::DeleteForbidden(id.to_string()));
        }

        Ok(Snapshot {
            videos: self.videos.iter().filter(|v| v.id != id).cloned().collect(),
            shows: self
                .shows
                .iter()
                .map(|show| {
                    map_seasons(show, |_| true, |season| {
                        season.episodes.iter().filter(|ep| ep.video_id != id).cloned().collect()
                    })
                })
                .collect(),
        })
    }

    pub fn add_show(&self, show: Show) -> Snapshot {
        let mut shows = Vec::with_capacity(self.shows.len() + 1);
        shows.push(show);
        shows.extend(self.shows.iter().cloned());
        Snapshot {
            videos: self.videos.clone(),
            shows,
        }
    }

    pub fn delete_show(&self, id: &str) -> Snapshot {
        Snapshot {
            videos: self.videos.clone(),
            shows: self.shows.iter().filter(|s| s.id != id).cloned().collect(),
        }
    }

    /// Append `episode` to the given season. The video id is not checked
    /// against the library.
    pub fn add_episode(&self, show_id: &str, season_number: u32, episode: Episode) -> Snapshot {
        self.update_season(show_id, season_number, |season| {
            let mut episodes = season.episodes.clone();
            episodes.push(episode.clone());
            episodes
        })
    }

    pub fn remove_episode(&self, show_id: &str, season_number: u32, episode_id: &str) -> Snapshot {
        self.update_season(show_id, season_number, |season| {
            season.episodes.iter().filter(|ep| ep.id != episode_id).cloned().collect()
        })
    }

    fn update_season<F>(&self, show_id: &str, season_number: u32, episodes: F) -> Snapshot
    where
        F: Fn(&Season) -> Vec<Episode>,
    {
        Snapshot {
            videos: self.videos.clone(),
            shows: self
                .shows
                .iter()
                .map(|show| {
                    if show.id != show_id {
                        return show.clone();
                    }
                    map_seasons(show, |s| s.season_number == season_number, &episodes)
                })
                .collect(),
        }
    }

    /// Episodes of a season paired with their library video, if it still exists.
    pub fn episode_entries<'a>(&'a self, season: &'a Season) -> Vec<EpisodeEntry<'a>> {
        season
            .episodes
            .iter()
            .map(|episode| EpisodeEntry {
                episode,
                video: self.video(&episode.video_id),
            })
            .collect()
    }
}

fn map_seasons<P, F>(show: &Show, matches: P, episodes: F) -> Show
where
    P: Fn(&Season) -> bool,
    F: Fn(&Season) -> Vec<Episode>,
{
    Show {
        seasons: show
            .seasons
            .iter()
            .map(|season| {
                if !matches(season) {
                    return season.clone();
                }
                Season {
                    season_number: season.season_number,
                    episodes: episodes(season),
                }
            })
            .collect(),
        ..show.clone()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EpisodeEntry<'a> {
    pub episode: &'a Episode,
    pub video: Option<&'a Video>,
}

impl EpisodeEntry<'_> {
    /// Video title, or the bare id when the video is gone.
    pub fn title(&self) -> &str {
        self.video
            .map(|v| v.title.as_str())
            .unwrap_or(&self.episode.video_id)
    }

    pub fn thumbnail(&self) -> String {
        self.video
            .and_then(|v| v.thumbnail.clone())
            .unwrap_or_else(|| youtube::thumbnail_url(&self.episode.video_id))
    }
}

/// Case-insensitive title search. A blank query keeps everything.
pub fn filter_shows_by_title<'a>(shows: &'a [Show], query: &str) -> Vec<&'a Show> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return shows.iter().collect();
    }
    shows
        .iter()
        .filter(|s| s.title.to_lowercase().contains(&query))
        .collect()
}

/// A home page row.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowGroup<'a> {
    pub category: String,
    pub shows: Vec<&'a Show>,
}

/// Group shows into rows, keeping first-seen category order and show order.
pub fn group_shows_by_category<'a, I>(shows: I) -> Vec<ShowGroup<'a>>
where
    I: IntoIterator<Item = &'a Show>,
{
    let mut groups: Vec<ShowGroup<'a>> = Vec::new();
    for show in shows {
        let key = if show.category.is_empty() {
            UNCATEGORIZED
        } else {
            show.category.as_str()
        };
        match groups.iter_mut().find(|g| g.category == key) {
            Some(group) => group.shows.push(show),
            None => groups.push(ShowGroup {
                category: key.to_string(),
                shows: vec![show],
            }),
        }
    }
    groups
}

/// Owns the catalog for a session and writes it back after every change.
pub struct CatalogStore<S: SlotStorage> {
    storage: S,
    key: String,
    snapshot: Arc<Snapshot>,
}

impl<S: SlotStorage> CatalogStore<S> {
    pub fn open(mut storage: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let snapshot = load_snapshot(&mut storage, &key);
        Self {
            storage,
            key,
            snapshot: Arc::new(snapshot),
        }
    }

    /// Current catalog. Later changes never alter a snapshot already handed out.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn commit(&mut self, next: Snapshot) {
        if next == *self.snapshot {
            return;
        }
        self.snapshot = Arc::new(next);
        save_snapshot(&mut self.storage, &self.key, &self.snapshot);
    }

    /// Returns `false` if a video with this id already existed.
    #[instrument(skip(self, video), fields(id = %video.id))]
    pub fn add_video(&mut self, video: Video) -> bool {
        if self.snapshot.video(&video.id).is_some() {
            debug!("Video already in library, ignoring");
            return false;
        }
        info!("Adding video: {}", video.title);
        let next = self.snapshot.add_video(video);
        self.commit(next);
        true
    }

    /// Resolve user input and add the result as an admin upload.
    pub fn add_video_from_input(&mut self, raw: &str, draft: VideoDraft) -> Result<String, CatalogError> {
        let id = youtube::require_video_id(raw)?;
        self.add_video(Video::admin_upload(id.clone(), draft));
        Ok(id)
    }

    #[instrument(skip(self))]
    pub fn delete_video(&mut self, id: &str) -> Result<(), CatalogError> {
        match self.snapshot.delete_video(id) {
            Ok(next) => {
                info!("Deleted video {} and its episodes", id);
                self.commit(next);
                Ok(())
            }
            Err(e) => {
                warn!("Refusing to delete video: {}", e);
                Err(e)
            }
        }
    }

    #[instrument(skip(self, show), fields(title = %show.title))]
    pub fn add_show(&mut self, show: Show) -> String {
        let id = show.id.clone();
        if self.snapshot.show(&id).is_some() {
            warn!("Show id {} already in use", id);
        }
        info!("Creating show with {} season(s)", show.seasons.len());
        let next = self.snapshot.add_show(show);
        self.commit(next);
        id
    }

    /// Returns `false` when no show had this id.
    #[instrument(skip(self))]
    pub fn delete_show(&mut self, id: &str) -> bool {
        if self.snapshot.show(id).is_none() {
            debug!("Show not found, nothing to delete");
            return false;
        }
        info!("Deleting show {}", id);
        let next = self.snapshot.delete_show(id);
        self.commit(next);
        true
    }

    /// Returns the new episode id, or `None` if the show or season is unknown.
    #[instrument(skip(self))]
    pub fn add_episode(&mut self, show_id: &str, season_number: u32, video_id: &str) -> Option<String> {
        let found = self
            .snapshot
            .show(show_id)
            .and_then(|s| s.season(season_number))
            .is_some();
        if !found {
            debug!("Show or season not found, episode not added");
            return None;
        }

        let episode = Episode::new(video_id);
        let episode_id = episode.id.clone();
        let next = self.snapshot.add_episode(show_id, season_number, episode);
        self.commit(next);
        info!("Added episode {}", episode_id);
        Some(episode_id)
    }

    /// Paste-a-URL flavour of [`add_episode`](Self::add_episode): the video is
    /// added to the library (unless already there) together with the episode.
    /// Nothing changes when the show or season is unknown.
    #[instrument(skip(self, title))]
    pub fn add_episode_from_input(
        &mut self,
        show_id: &str,
        season_number: u32,
        raw: &str,
        title: &str,
    ) -> Result<Option<String>, CatalogError> {
        let id = youtube::require_video_id(raw)?;
        let found = self
            .snapshot
            .show(show_id)
            .and_then(|s| s.season(season_number))
            .is_some();
        if !found {
            debug!("Show or season not found, video and episode not added");
            return Ok(None);
        }

        let video = Video::admin_upload(
            id.clone(),
            VideoDraft {
                title: title.to_string(),
                ..Default::default()
            },
        );
        let episode = Episode::new(id);
        let episode_id = episode.id.clone();
        let next = self
            .snapshot
            .add_video(video)
            .add_episode(show_id, season_number, episode);
        self.commit(next);
        info!("Added episode {}", episode_id);
        Ok(Some(episode_id))
    }

    /// Returns `false` when nothing matched.
    #[instrument(skip(self))]
    pub fn remove_episode(&mut self, show_id: &str, season_number: u32, episode_id: &str) -> bool {
        let found = self
            .snapshot
            .show(show_id)
            .and_then(|s| s.season(season_number))
            .map(|season| season.episodes.iter().any(|ep| ep.id == episode_id))
            .unwrap_or(false);
        if !found {
            debug!("Episode not found, nothing to remove");
            return false;
        }
        let next = self.snapshot.remove_episode(show_id, season_number, episode_id);
        self.commit(next);
        info!("Removed episode {}", episode_id);
        true
    }
}
