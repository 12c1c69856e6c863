use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const UNCATEGORIZED: &str = "Uncategorized";

fn default_category() -> String {
    UNCATEGORIZED.to_string()
}

fn category_or_default(category: &str) -> String {
    let category = category.trim();
    if category.is_empty() {
        default_category()
    } else {
        category.to_string()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A playable YouTube video in the library. `id` is the YouTube video id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredVideo")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(rename = "addedByAdmin")]
    pub added_by_admin: bool,
    /// Embedded image data; `None` means "derive from the id".
    pub thumbnail: Option<String>,
}

/// Stored video record; fields absent from older snapshots take defaults.
#[derive(Deserialize)]
struct StoredVideo {
    id: String,
    title: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(rename = "addedByAdmin", default)]
    added_by_admin: bool,
    #[serde(default)]
    thumbnail: Option<String>,
}

impl From<StoredVideo> for Video {
    fn from(stored: StoredVideo) -> Self {
        Self {
            title: stored.title.unwrap_or_else(|| stored.id.clone()),
            id: stored.id,
            description: stored.description,
            category: stored.category,
            tags: stored.tags,
            added_by_admin: stored.added_by_admin,
            thumbnail: stored.thumbnail,
        }
    }
}

/// Form input for a new video, before an id has been resolved.
#[derive(Debug, Clone, Default)]
pub struct VideoDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub thumbnail: Option<String>,
}

impl Video {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            description: String::new(),
            category: default_category(),
            tags: Vec::new(),
            added_by_admin: false,
            thumbnail: None,
        }
    }

    /// A video created through admin mode, and therefore deletable later.
    pub fn admin_upload(id: impl Into<String>, draft: VideoDraft) -> Self {
        let id = id.into();
        let title = draft.title.trim();
        Self {
            title: if title.is_empty() { id.clone() } else { title.to_string() },
            id,
            description: draft.description,
            category: category_or_default(&draft.category),
            tags: draft.tags,
            added_by_admin: true,
            thumbnail: draft.thumbnail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    /// Weak reference into the video library; may dangle after a delete.
    #[serde(rename = "videoId")]
    pub video_id: String,
}

impl Episode {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            video_id: video_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    #[serde(rename = "seasonNumber")]
    pub season_number: u32,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

impl Season {
    pub fn empty(season_number: u32) -> Self {
        Self {
            season_number,
            episodes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub seasons: Vec<Season>,
}

impl Show {
    /// A new show with seasons numbered `1..=seasons` (at least one), all empty.
    pub fn with_seasons(title: &str, category: &str, seasons: u32, thumbnail: Option<String>) -> Self {
        let title = title.trim();
        let title = if title.is_empty() {
            format!("Untitled Show {}", Utc::now().timestamp_millis())
        } else {
            title.to_string()
        };

        Self {
            id: new_id(),
            title,
            thumbnail,
            category: category_or_default(category),
            seasons: (1..=seasons.max(1)).map(Season::empty).collect(),
        }
    }

    pub fn season(&self, season_number: u32) -> Option<&Season> {
        self.seasons.iter().find(|s| s.season_number == season_number)
    }

    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|s| s.episodes.len()).sum()
    }
}

/// The whole persisted catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub videos: Vec<Video>,
    pub shows: Vec<Show>,
}

impl Snapshot {
    /// First-run catalog: no videos and a single empty show.
    pub fn seed() -> Self {
        Self {
            videos: Vec::new(),
            shows: vec![Show {
                id: "show1".to_string(),
                title: "ENHYPEN Live Collection".to_string(),
                thumbnail: None,
                category: "Concerts".to_string(),
                seasons: vec![Season::empty(1)],
            }],
        }
    }
}

/// Split comma-separated form input into tags, dropping blanks.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_defaults() {
        let video = Video::new("abc123");
        assert_eq!(video.title, "abc123");
        assert_eq!(video.category, UNCATEGORIZED);
        assert!(!video.added_by_admin);
        assert!(video.thumbnail.is_none());
    }

    #[test]
    fn test_admin_upload_applies_defaults() {
        let video = Video::admin_upload(
            "abc123",
            VideoDraft {
                title: "  ".to_string(),
                category: String::new(),
                tags: parse_tags("live, ,dance,"),
                ..Default::default()
            },
        );
        assert_eq!(video.title, "abc123");
        assert_eq!(video.category, UNCATEGORIZED);
        assert_eq!(video.tags, vec!["live", "dance"]);
        assert!(video.added_by_admin);
    }

    #[test]
    fn test_show_with_seasons_numbers_contiguously() {
        let show = Show::with_seasons("Dance Practice", "Practice", 3, None);
        let numbers: Vec<u32> = show.seasons.iter().map(|s| s.season_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(show.seasons.iter().all(|s| s.episodes.is_empty()));
        assert_eq!(show.category, "Practice");
    }

    #[test]
    fn test_show_with_zero_seasons_gets_one() {
        let show = Show::with_seasons("", "", 0, None);
        assert_eq!(show.seasons.len(), 1);
        assert!(show.title.starts_with("Untitled Show "));
        assert_eq!(show.category, UNCATEGORIZED);
    }

    #[test]
    fn test_generated_ids_do_not_collide() {
        let a = Show::with_seasons("A", "", 1, None);
        let b = Show::with_seasons("A", "", 1, None);
        assert_ne!(a.id, b.id);

        let ids: std::collections::HashSet<String> =
            (0..1000).map(|_| Episode::new("v1").id).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_field_names_on_the_wire() {
        let json = serde_json::to_value(Video::new("v1")).unwrap();
        assert_eq!(json["addedByAdmin"], false);
        assert!(json["thumbnail"].is_null());

        let json = serde_json::to_value(Snapshot::seed()).unwrap();
        assert_eq!(json["shows"][0]["seasons"][0]["seasonNumber"], 1);

        let json = serde_json::to_value(Episode::new("v1")).unwrap();
        assert_eq!(json["videoId"], "v1");
    }

    #[test]
    fn test_seed_shape() {
        let seed = Snapshot::seed();
        assert!(seed.videos.is_empty());
        assert_eq!(seed.shows.len(), 1);
        assert_eq!(seed.shows[0].episode_count(), 0);
        assert!(seed.shows[0].season(1).is_some());
    }
}
