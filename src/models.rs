use serde::{Deserialize, Serialize};

/// Source label used for tracks added outside any configured pool
pub const AD_HOC_SOURCE: &str = "ad-hoc";

/// A track as the mixing engine sees it. Display metadata is passed through
/// unchanged; the engine only looks at duration, popularity, year and source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Duration in milliseconds
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    /// Externally supplied popularity score (play count on OpenSubsonic servers)
    pub popularity: Option<u32>,
    pub year: Option<i32>,
    /// Which pool this track came from
    pub source: String,
}

impl Default for Track {
    fn default() -> Self {
        Track {
            id: String::new(),
            title: "Unknown".to_string(),
            artist: "Unknown".to_string(),
            album: "Unknown".to_string(),
            duration_ms: 0,
            popularity: None,
            year: None,
            source: AD_HOC_SOURCE.to_string(),
        }
    }
}

/// One entry of a playlist as returned by the getPlaylist API call.
/// Entries without an id are not playable tracks (e.g. removed from the
/// library) and get filtered out during fetching.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Duration in seconds, as the API reports it
    pub duration: Option<u64>,
    #[serde(rename = "playCount")]
    pub play_count: Option<u32>,
    pub year: Option<i32>,
}

impl PlaylistEntry {
    /// Convert a playable entry into an engine track tagged with its source
    /// pool. Returns None for entries without a track id.
    pub fn into_track(self, source: &str) -> Option<Track> {
        let id = self.id?;
        Some(Track {
            id,
            title: self.title.unwrap_or_else(|| "Unknown".to_string()),
            artist: self.artist.unwrap_or_else(|| "Unknown".to_string()),
            album: self.album.unwrap_or_else(|| "Unknown".to_string()),
            duration_ms: self.duration.unwrap_or(0) * 1000,
            popularity: self.play_count,
            year: self.year,
            source: source.to_string(),
        })
    }
}

/// Response structure for getPlaylist API call
#[derive(Debug, Deserialize)]
pub struct GetPlaylistResponse {
    #[serde(rename = "subsonic-response")]
    pub subsonic_response: GetPlaylistSubsonicResponse,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct GetPlaylistSubsonicResponse {
    pub status: String,
    pub version: String,
    pub playlist: Option<PlaylistWithEntries>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct PlaylistWithEntries {
    pub id: String,
    pub name: String,
    pub entry: Option<Vec<PlaylistEntry>>,
}

/// Response structure for createPlaylist API call
#[derive(Debug, Deserialize)]
pub struct CreatePlaylistResponse {
    #[serde(rename = "subsonic-response")]
    pub subsonic_response: CreatePlaylistSubsonicResponse,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct CreatePlaylistSubsonicResponse {
    pub status: String,
    pub version: String,
    pub playlist: Option<CreatedPlaylist>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct CreatedPlaylist {
    pub id: String,
    pub name: String,
    #[serde(rename = "songCount")]
    pub song_count: Option<u32>,
    pub duration: Option<u32>,
    pub public: Option<bool>,
    pub created: Option<String>,
    pub changed: Option<String>,
}

/// Response structure for getPlaylists API call
#[derive(Debug, Deserialize)]
pub struct GetPlaylistsResponse {
    #[serde(rename = "subsonic-response")]
    pub subsonic_response: GetPlaylistsSubsonicResponse,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct GetPlaylistsSubsonicResponse {
    pub status: String,
    pub version: String,
    pub playlists: Option<PlaylistsContainer>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistsContainer {
    pub playlist: Vec<PlaylistInfo>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct PlaylistInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "songCount")]
    pub song_count: Option<u32>,
    pub duration: Option<u32>,
    pub public: Option<bool>,
    pub created: Option<String>,
    pub changed: Option<String>,
}
