use crate::config::Config;
use crate::models::{
    CreatePlaylistResponse, GetPlaylistResponse, GetPlaylistsResponse, PlaylistInfo, Track,
};
use anyhow::Result;
use ureq::Agent;
use urlencoding::encode;

/// Page size for playlist reads
const PAGE_SIZE: usize = 100;

/// Maximum track ids per updatePlaylist call
const TRACKS_PER_REQUEST: usize = 100;

/// A simple Subsonic API client using MD5 authentication
pub struct SubsonicClient {
    agent: Agent,
    base_url: String,
    username: String,
    password: String,
}

impl SubsonicClient {
    /// Create a new client with configuration from environment
    pub fn new(config: Config) -> Self {
        let agent = Agent::new();

        SubsonicClient {
            agent,
            base_url: config.base_url,
            username: config.username,
            password: config.password,
        }
    }

    /// Generate authentication parameters using salt + token method
    fn generate_auth_params(&self) -> (String, String) {
        // Generate a random salt (at least 6 characters)
        let salt = format!(
            "{:x}",
            md5::compute(format!(
                "{}{}",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap()
                    .as_nanos(),
                "playlist-mixer"
            ))
        )[..8]
            .to_string();

        // Calculate token = md5(password + salt)
        let token = format!("{:x}", md5::compute(format!("{}{}", self.password, salt)));

        (salt, token)
    }

    /// Build the common authenticated URL prefix for an endpoint
    fn endpoint_url(&self, endpoint: &str) -> String {
        let (salt, token) = self.generate_auth_params();
        format!(
            "{}/rest/{}?u={}&t={}&s={}&v=1.16.1&c=playlist-mixer&f=json",
            self.base_url.trim_end_matches('/'),
            endpoint,
            encode(&self.username),
            token,
            salt
        )
    }

    /// Test the API connection with a simple ping - try both auth methods
    pub fn ping(&self) -> Result<String> {
        // First try token-based auth (v1.13.0+)
        let url_token = self.endpoint_url("ping");

        let response = self
            .agent
            .get(&url_token)
            .call()
            .map_err(|e| anyhow::anyhow!("Ping failed: {}", e))?;

        let response_text = response.into_string()?;

        // If token auth failed, try password auth
        if response_text.contains("\"status\":\"failed\"") {
            let url_password = format!(
                "{}/rest/ping?u={}&p={}&v=1.12.0&c=playlist-mixer&f=json",
                self.base_url.trim_end_matches('/'),
                encode(&self.username),
                encode(&self.password)
            );

            let response2 = self
                .agent
                .get(&url_password)
                .call()
                .map_err(|e| anyhow::anyhow!("Password ping failed: {}", e))?;

            let response_text2 = response2.into_string()?;

            Ok(response_text2)
        } else {
            Ok(response_text)
        }
    }

    /// Fetch all playable tracks of a source playlist, tagged with the given
    /// source label. Reads in pages of 100 until a short page signals the end
    /// of the list; entries without a track id are skipped.
    pub fn fetch_playlist_tracks(&self, playlist_id: &str, source: &str) -> Result<Vec<Track>> {
        let mut tracks = Vec::new();
        let mut offset = 0usize;

        loop {
            let url = format!(
                "{}&id={}&offset={}&count={}",
                self.endpoint_url("getPlaylist"),
                encode(playlist_id),
                offset,
                PAGE_SIZE
            );

            let response = self
                .agent
                .get(&url)
                .call()
                .map_err(|e| anyhow::anyhow!("HTTP request failed: {}", e))?;

            let response_text = response.into_string()?;

            let parsed: GetPlaylistResponse = serde_json::from_str(&response_text)
                .map_err(|e| anyhow::anyhow!("Failed to parse JSON response: {}", e))?;

            if parsed.subsonic_response.status != "ok" {
                return Err(anyhow::anyhow!(
                    "API returned error status: {}",
                    parsed.subsonic_response.status
                ));
            }

            let entries = parsed
                .subsonic_response
                .playlist
                .and_then(|p| p.entry)
                .unwrap_or_default();

            let page_len = entries.len();
            offset += page_len;

            tracks.extend(
                entries
                    .into_iter()
                    .filter_map(|entry| entry.into_track(source)),
            );

            // A short page means we reached the end of the playlist
            if page_len < PAGE_SIZE {
                break;
            }
        }

        Ok(tracks)
    }

    /// Get all existing playlists
    pub fn get_playlists(&self) -> Result<Vec<PlaylistInfo>> {
        let url = self.endpoint_url("getPlaylists");

        let response = self.agent.get(&url).call()?;
        let response_text = response.into_string()?;

        let parsed_response: GetPlaylistsResponse = serde_json::from_str(&response_text)?;

        if parsed_response.subsonic_response.status != "ok" {
            return Err(anyhow::anyhow!("API error: Response status was not 'ok'"));
        }

        match parsed_response.subsonic_response.playlists {
            Some(playlists_container) => Ok(playlists_container.playlist),
            None => Ok(vec![]),
        }
    }

    /// Create the mixed playlist, reusing an existing playlist whose name
    /// starts with the base pattern instead of piling up duplicates.
    pub fn create_mixed_playlist(
        &self,
        name: &str,
        base_name_pattern: &str,
        track_ids: &[String],
    ) -> Result<String> {
        if let Ok(existing_playlists) = self.get_playlists() {
            let matching = existing_playlists.iter().find(|p| {
                p.name
                    .to_lowercase()
                    .starts_with(base_name_pattern.to_lowercase().as_str())
            });

            if let Some(existing) = matching {
                println!(
                    "Found existing playlist '{}' matching pattern '{}' (ID: {})",
                    existing.name, base_name_pattern, existing.id
                );
                self.clear_playlist(&existing.id, name, existing.song_count.unwrap_or(0) as usize)?;
                self.append_tracks(&existing.id, track_ids)?;
                return Ok(existing.id.clone());
            }
        }

        // No matching playlist: create an empty one, then upload in chunks
        let playlist_id = self.create_empty_playlist(name)?;
        self.append_tracks(&playlist_id, track_ids)?;
        Ok(playlist_id)
    }

    /// Create a new empty playlist and return its id
    fn create_empty_playlist(&self, name: &str) -> Result<String> {
        let url = format!(
            "{}&name={}",
            self.endpoint_url("createPlaylist"),
            encode(name)
        );

        println!("Creating playlist '{name}'...");

        let response = self.agent.get(&url).call()?;
        let response_text = response.into_string()?;

        let parsed_response: CreatePlaylistResponse = serde_json::from_str(&response_text)?;

        if parsed_response.subsonic_response.status != "ok" {
            return Err(anyhow::anyhow!("API error: Response status was not 'ok'"));
        }

        match parsed_response.subsonic_response.playlist {
            Some(playlist) => Ok(playlist.id),
            None => Err(anyhow::anyhow!("No playlist returned in create response")),
        }
    }

    /// Remove all existing entries from a playlist and rename it.
    /// Removal indices are sent in descending order so earlier removals do
    /// not shift the positions of later ones, chunked like the uploads.
    fn clear_playlist(&self, playlist_id: &str, name: &str, song_count: usize) -> Result<()> {
        println!(
            "Clearing {} existing songs from playlist ID {}...",
            song_count, playlist_id
        );

        let indices: Vec<usize> = (0..song_count).rev().collect();
        for chunk in indices.chunks(TRACKS_PER_REQUEST) {
            let mut url = format!(
                "{}&playlistId={}&name={}",
                self.endpoint_url("updatePlaylist"),
                encode(playlist_id),
                encode(name)
            );
            for idx in chunk {
                url.push_str(&format!("&songIndexToRemove={idx}"));
            }
            self.check_update_status(&url)?;
        }
        Ok(())
    }

    /// Append track ids to a playlist in ordered chunks of at most 100,
    /// preserving relative order across chunks.
    fn append_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        println!(
            "Uploading {} tracks to playlist ID {} in chunks of {}...",
            track_ids.len(),
            playlist_id,
            TRACKS_PER_REQUEST
        );

        for chunk in track_ids.chunks(TRACKS_PER_REQUEST) {
            let mut url = format!(
                "{}&playlistId={}",
                self.endpoint_url("updatePlaylist"),
                encode(playlist_id)
            );
            for track_id in chunk {
                url.push_str(&format!("&songIdToAdd={}", encode(track_id)));
            }
            self.check_update_status(&url)?;
        }

        println!("✓ Successfully uploaded {} tracks", track_ids.len());
        Ok(())
    }

    /// Issue an updatePlaylist call and check the response status
    fn check_update_status(&self, url: &str) -> Result<()> {
        let response = self.agent.get(url).call()?;
        let response_text = response.into_string()?;

        let parsed: serde_json::Value = serde_json::from_str(&response_text)?;
        if let Some(status) = parsed
            .get("subsonic-response")
            .and_then(|r| r.get("status"))
            .and_then(|s| s.as_str())
        {
            if status == "ok" {
                Ok(())
            } else {
                Err(anyhow::anyhow!(
                    "API error: Update playlist status was not 'ok': {}",
                    status
                ))
            }
        } else {
            Err(anyhow::anyhow!(
                "Invalid response format from update playlist"
            ))
        }
    }

}
