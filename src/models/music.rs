//! Music reference data models: artists, albums, tracks, and the per-period
//! top-listening aggregates pulled from the scrobbling service.

use serde::Serialize;

/// The named time windows top-listening data is aggregated over.
pub const REFRESH_PERIODS: [&str; 4] = ["overall", "7day", "1month", "12month"];

#[derive(Debug, Clone, Serialize)]
pub struct Artist {
    pub id: i32,
    pub name: String,
    pub musicbrainz_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Album {
    pub id: i32,
    pub name: String,
    pub artist_id: i32,
    pub musicbrainz_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub id: i32,
    pub name: String,
    pub artist_id: i32,
    pub musicbrainz_id: Option<String>,
    pub track_url: Option<String>,
}

/// One entry of a user's top-artists list for a period.
#[derive(Debug, Clone, Serialize)]
pub struct TopArtistView {
    pub id: i32,
    pub name: String,
    pub scrobbles: i32,
}

/// One entry of a user's top-albums list for a period.
#[derive(Debug, Clone, Serialize)]
pub struct TopAlbumView {
    pub id: i32,
    pub album: String,
    pub artist: String,
    pub playcount: i32,
}

/// One entry of a user's top-tracks list for a period.
#[derive(Debug, Clone, Serialize)]
pub struct TopTrackView {
    pub id: i32,
    pub track: String,
    pub artist: String,
    pub playcount: i32,
    pub lastfmtrackurl: Option<String>,
}

/// One listener of an artist, ranked by playcount.
#[derive(Debug, Clone, Serialize)]
pub struct ListenerView {
    pub username: String,
    pub playcount: i32,
}

/// A Track-kind broadcast ranked by like count.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastedTrackView {
    pub broadcastid: i32,
    pub trackid: i32,
    pub track: String,
    pub artist: String,
    pub lastfmtrackurl: Option<String>,
    pub likes: i64,
}
