//! Client for the Last.fm-style scrobbling API.
//!
//! Wraps the three `user.gettop*` JSON endpoints. Numeric fields arrive as
//! strings on the wire; the DTOs keep them as strings and expose parsed
//! accessors.

pub mod refresh;

pub use refresh::{ListeningRefresher, RefreshError};

use serde::Deserialize;
use thiserror::Error;

const API_ROOT: &str = "https://ws.audioscrobbler.com/2.0/";

/// Config table key holding the API key.
pub const API_KEY_CONFIG_KEY: &str = "LAST_FM_API_KEY";

/// How many entries to pull per list.
pub const TOP_LIMIT: u32 = 50;

/// Errors that can occur talking to the scrobbling API.
#[derive(Debug, Error)]
pub enum LastFmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No API key configured; set {API_KEY_CONFIG_KEY} with the set-config command")]
    MissingApiKey,

    #[error("Unexpected playcount value: {0}")]
    BadPlayCount(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiArtist {
    pub name: String,
    #[serde(default)]
    pub mbid: Option<String>,
    pub playcount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiAlbumArtist {
    pub name: String,
    #[serde(default)]
    pub mbid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiAlbum {
    pub name: String,
    #[serde(default)]
    pub mbid: Option<String>,
    pub playcount: String,
    pub artist: ApiAlbumArtist,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTrack {
    pub name: String,
    #[serde(default)]
    pub mbid: Option<String>,
    pub playcount: String,
    #[serde(default)]
    pub url: Option<String>,
    pub artist: ApiAlbumArtist,
}

#[derive(Debug, Deserialize)]
struct TopArtistsEnvelope {
    topartists: TopArtistsPayload,
}

#[derive(Debug, Deserialize)]
struct TopArtistsPayload {
    #[serde(default)]
    artist: Vec<ApiArtist>,
}

#[derive(Debug, Deserialize)]
struct TopAlbumsEnvelope {
    topalbums: TopAlbumsPayload,
}

#[derive(Debug, Deserialize)]
struct TopAlbumsPayload {
    #[serde(default)]
    album: Vec<ApiAlbum>,
}

#[derive(Debug, Deserialize)]
struct TopTracksEnvelope {
    toptracks: TopTracksPayload,
}

#[derive(Debug, Deserialize)]
struct TopTracksPayload {
    #[serde(default)]
    track: Vec<ApiTrack>,
}

pub(crate) fn parse_playcount(raw: &str) -> Result<i32, LastFmError> {
    raw.parse()
        .map_err(|_| LastFmError::BadPlayCount(raw.to_string()))
}

/// Async client for the scrobbling API, keyed by one API key.
#[derive(Clone)]
pub struct LastFmClient {
    http: reqwest::Client,
    api_key: String,
}

impl LastFmClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        username: &str,
        period: &str,
    ) -> Result<T, LastFmError> {
        let response = self
            .http
            .get(API_ROOT)
            .query(&[
                ("method", method),
                ("user", username),
                ("api_key", &self.api_key),
                ("format", "json"),
                ("limit", &TOP_LIMIT.to_string()),
                ("period", period),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    pub async fn top_artists(
        &self,
        username: &str,
        period: &str,
    ) -> Result<Vec<ApiArtist>, LastFmError> {
        let envelope: TopArtistsEnvelope =
            self.get("user.gettopartists", username, period).await?;
        Ok(envelope.topartists.artist)
    }

    pub async fn top_albums(
        &self,
        username: &str,
        period: &str,
    ) -> Result<Vec<ApiAlbum>, LastFmError> {
        let envelope: TopAlbumsEnvelope = self.get("user.gettopalbums", username, period).await?;
        Ok(envelope.topalbums.album)
    }

    pub async fn top_tracks(
        &self,
        username: &str,
        period: &str,
    ) -> Result<Vec<ApiTrack>, LastFmError> {
        let envelope: TopTracksEnvelope = self.get("user.gettoptracks", username, period).await?;
        Ok(envelope.toptracks.track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_top_artists_payload() {
        let json = r#"{
            "topartists": {
                "artist": [
                    {"name": "Larry June", "mbid": "", "playcount": "412", "url": "x"},
                    {"name": "Men I Trust", "playcount": "71"}
                ],
                "@attr": {"user": "cjonas41", "page": "1"}
            }
        }"#;
        let envelope: TopArtistsEnvelope = serde_json::from_str(json).unwrap();
        let artists = envelope.topartists.artist;
        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].name, "Larry June");
        assert_eq!(parse_playcount(&artists[0].playcount).unwrap(), 412);
        assert!(artists[1].mbid.is_none());
    }

    #[test]
    fn test_parse_top_tracks_payload() {
        let json = r#"{
            "toptracks": {
                "track": [
                    {
                        "name": "Smoothies in 1991",
                        "playcount": "33",
                        "url": "https://www.last.fm/music/t/1",
                        "artist": {"name": "Larry June", "mbid": ""}
                    }
                ]
            }
        }"#;
        let envelope: TopTracksEnvelope = serde_json::from_str(json).unwrap();
        let tracks = envelope.toptracks.track;
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artist.name, "Larry June");
        assert_eq!(tracks[0].url.as_deref(), Some("https://www.last.fm/music/t/1"));
    }

    #[test]
    fn test_empty_list_is_not_an_error() {
        let json = r#"{"topalbums": {"@attr": {"user": "newuser"}}}"#;
        let envelope: TopAlbumsEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.topalbums.album.is_empty());
    }

    #[test]
    fn test_bad_playcount_is_reported() {
        assert!(matches!(
            parse_playcount("a lot"),
            Err(LastFmError::BadPlayCount(_))
        ));
    }
}
