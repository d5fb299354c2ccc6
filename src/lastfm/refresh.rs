//! Pulls a user's top-listening data from the scrobbling API into the local
//! tables, one period at a time.

use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::db::DbPool;
use crate::db::repository::{
    AlbumRepository, ArtistRepository, MusicRepoError, TopDataRepository, TrackRepository,
};
use crate::lastfm::{LastFmClient, LastFmError, parse_playcount};
use crate::models::music::REFRESH_PERIODS;

/// Pause between successive API calls, to stay polite.
const CALL_SPACING: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Api(#[from] LastFmError),

    #[error(transparent)]
    Storage(#[from] MusicRepoError),
}

/// Refreshes a user's stored listening data from the scrobbling API.
#[derive(Clone)]
pub struct ListeningRefresher {
    client: LastFmClient,
    artists: ArtistRepository,
    albums: AlbumRepository,
    tracks: TrackRepository,
    tops: TopDataRepository,
}

impl ListeningRefresher {
    pub fn new(client: LastFmClient, pool: DbPool) -> Self {
        Self {
            client,
            artists: ArtistRepository::new(pool.clone()),
            albums: AlbumRepository::new(pool.clone()),
            tracks: TrackRepository::new(pool.clone()),
            tops: TopDataRepository::new(pool),
        }
    }

    /// Replace the user's top artists, albums, and tracks for every period
    /// with fresh snapshots. A failed period aborts the refresh; earlier
    /// periods keep their new data.
    pub async fn refresh_user(&self, user_id: i32, username: &str) -> Result<(), RefreshError> {
        for period in REFRESH_PERIODS {
            let Some(period_id) = self.tops.period_id(period)? else {
                warn!(period, "skipping unseeded refresh period");
                continue;
            };

            let top_artists = self.client.top_artists(username, period).await?;
            let mut artist_rows = Vec::with_capacity(top_artists.len());
            for entry in &top_artists {
                let artist = self
                    .artists
                    .find_or_create(&entry.name, non_empty(entry.mbid.as_deref()))?;
                artist_rows.push((artist.id, parse_playcount(&entry.playcount)?));
            }
            self.tops
                .replace_top_artists(user_id, period_id, &artist_rows)?;
            tokio::time::sleep(CALL_SPACING).await;

            let top_albums = self.client.top_albums(username, period).await?;
            let mut album_rows = Vec::with_capacity(top_albums.len());
            for entry in &top_albums {
                let artist = self
                    .artists
                    .find_or_create(&entry.artist.name, non_empty(entry.artist.mbid.as_deref()))?;
                let album = self.albums.find_or_create(
                    &entry.name,
                    artist.id,
                    non_empty(entry.mbid.as_deref()),
                )?;
                album_rows.push((album.id, parse_playcount(&entry.playcount)?));
            }
            self.tops
                .replace_top_albums(user_id, period_id, &album_rows)?;
            tokio::time::sleep(CALL_SPACING).await;

            let top_tracks = self.client.top_tracks(username, period).await?;
            let mut track_rows = Vec::with_capacity(top_tracks.len());
            for entry in &top_tracks {
                let artist = self
                    .artists
                    .find_or_create(&entry.artist.name, non_empty(entry.artist.mbid.as_deref()))?;
                let track = self.tracks.find_or_create(
                    &entry.name,
                    artist.id,
                    non_empty(entry.mbid.as_deref()),
                    entry.url.as_deref(),
                )?;
                track_rows.push((track.id, parse_playcount(&entry.playcount)?));
            }
            self.tops
                .replace_top_tracks(user_id, period_id, &track_rows)?;
            tokio::time::sleep(CALL_SPACING).await;

            info!(
                username,
                period,
                artists = artist_rows.len(),
                albums = album_rows.len(),
                tracks = track_rows.len(),
                "refreshed listening data"
            );
        }

        Ok(())
    }
}

/// The API reports absent MusicBrainz ids as empty strings.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_filters_blank_mbids() {
        assert_eq!(non_empty(Some("abc")), Some("abc"));
        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(None), None);
    }
}
