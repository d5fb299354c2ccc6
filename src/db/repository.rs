//! Repositories for users, runtime config, and listening data.

use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use thiserror::Error;

use crate::db::DbPool;
use crate::db::schema::{
    albums, artists, config, periods, top_albums, top_artists, top_tracks, tracks, users,
};
use crate::models::music::{
    Album, Artist, ListenerView, TopAlbumView, TopArtistView, TopTrackView, Track,
};
use crate::models::user::{SWAG_STARTING_BALANCE, User};

/// Errors that can occur during user repository operations.
#[derive(Debug, Error)]
pub enum UserRepoError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User with that profile name already exists")]
    UsernameExists,

    #[error("User with that email address already exists")]
    EmailExists,
}

/// Database row representation for users.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub bootstrapped: bool,
    pub admin: bool,
    pub swag: i32,
    pub image_url: Option<String>,
    pub last_fm_url: Option<String>,
    pub last_login: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            bootstrapped: row.bootstrapped,
            admin: row.admin,
            swag: row.swag,
            image_url: row.image_url,
            last_fm_url: row.last_fm_url,
            last_login: row.last_login,
            created_at: row.created_at,
        }
    }
}

/// Data for inserting a new user profile.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub bootstrapped: bool,
    pub swag: i32,
}

impl<'a> NewUser<'a> {
    pub fn new(
        username: &'a str,
        first_name: &'a str,
        last_name: &'a str,
        email: &'a str,
        password_hash: &'a str,
        bootstrapped: bool,
    ) -> Self {
        Self {
            username,
            first_name,
            last_name,
            email,
            password_hash,
            bootstrapped,
            swag: SWAG_STARTING_BALANCE,
        }
    }
}

/// Repository for user database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a user by their Last.fm profile name.
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>, UserRepoError> {
        let mut conn = self.pool.get()?;

        let result = users::table
            .filter(users::username.eq(username))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Find a user by ID.
    pub fn find_by_id(&self, user_id: i32) -> Result<Option<User>, UserRepoError> {
        let mut conn = self.pool.get()?;

        let result = users::table
            .filter(users::id.eq(user_id))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Find a user by email address.
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepoError> {
        let mut conn = self.pool.get()?;

        let result = users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Create a new user profile. Profile name and email must both be unused.
    pub fn create(&self, new_user: &NewUser) -> Result<User, UserRepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, UserRepoError, _>(|conn| {
            let name_taken: i64 = users::table
                .filter(users::username.eq(new_user.username))
                .count()
                .get_result(conn)?;
            if name_taken > 0 {
                return Err(UserRepoError::UsernameExists);
            }

            let email_taken: i64 = users::table
                .filter(users::email.eq(new_user.email))
                .count()
                .get_result(conn)?;
            if email_taken > 0 {
                return Err(UserRepoError::EmailExists);
            }

            diesel::insert_into(users::table)
                .values(new_user)
                .execute(conn)?;

            let user = users::table
                .filter(users::username.eq(new_user.username))
                .select(UserRow::as_select())
                .first(conn)?;

            Ok(User::from(user))
        })
    }

    /// Search profiles by name. With `partial` the term matches anywhere in
    /// the profile name; otherwise it must match exactly.
    pub fn search_profiles(
        &self,
        term: &str,
        partial: bool,
        limit: i64,
    ) -> Result<Vec<User>, UserRepoError> {
        let mut conn = self.pool.get()?;

        let results = if partial {
            let pattern = format!("%{}%", term);
            users::table
                .filter(users::username.like(pattern))
                .select(UserRow::as_select())
                .order(users::username.asc())
                .limit(limit)
                .load(&mut conn)?
        } else {
            users::table
                .filter(users::username.eq(term))
                .select(UserRow::as_select())
                .order(users::username.asc())
                .limit(limit)
                .load(&mut conn)?
        };

        Ok(results.into_iter().map(User::from).collect())
    }

    /// Record a successful login.
    pub fn touch_last_login(&self, user_id: i32) -> Result<bool, UserRepoError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(users::table.filter(users::id.eq(user_id)))
            .set(users::last_login.eq(diesel::dsl::now))
            .execute(&mut conn)?;

        Ok(updated > 0)
    }

    /// Update a user's password hash.
    pub fn update_password(&self, user_id: i32, password_hash: &str) -> Result<bool, UserRepoError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(users::table.filter(users::id.eq(user_id)))
            .set(users::password_hash.eq(password_hash))
            .execute(&mut conn)?;

        Ok(updated > 0)
    }

    /// Atomically add swag to a user's balance and return the new balance.
    pub fn add_swag(&self, user_id: i32, amount: i32) -> Result<i32, UserRepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, UserRepoError, _>(|conn| {
            let updated = diesel::update(users::table.filter(users::id.eq(user_id)))
                .set(users::swag.eq(users::swag + amount))
                .execute(conn)?;
            if updated == 0 {
                return Err(UserRepoError::NotFound(format!("user id {user_id}")));
            }

            let balance = users::table
                .filter(users::id.eq(user_id))
                .select(users::swag)
                .first(conn)?;
            Ok(balance)
        })
    }

    /// Update the profile URLs fetched from the scrobbling service.
    pub fn set_profile_urls(
        &self,
        user_id: i32,
        last_fm_url: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<bool, UserRepoError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(users::table.filter(users::id.eq(user_id)))
            .set((
                users::last_fm_url.eq(last_fm_url),
                users::image_url.eq(image_url),
            ))
            .execute(&mut conn)?;

        Ok(updated > 0)
    }
}

// ============================================================================
// Config Repository
// ============================================================================

/// Repository for runtime configuration values (e.g. the Last.fm API key).
#[derive(Clone)]
pub struct ConfigRepository {
    pool: DbPool,
}

impl ConfigRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, UserRepoError> {
        let mut conn = self.pool.get()?;

        let result = config::table
            .filter(config::key.eq(key))
            .select(config::value)
            .first(&mut conn)
            .optional()?;

        Ok(result)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), UserRepoError> {
        let mut conn = self.pool.get()?;

        diesel::sql_query("INSERT OR REPLACE INTO config (key, value) VALUES (?, ?)")
            .bind::<diesel::sql_types::Text, _>(key)
            .bind::<diesel::sql_types::Text, _>(value)
            .execute(&mut conn)?;

        Ok(())
    }
}

// ============================================================================
// Music Reference Repositories
// ============================================================================

/// Errors that can occur during music data repository operations.
#[derive(Debug, Error)]
pub enum MusicRepoError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = artists)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct ArtistRow {
    id: i32,
    name: String,
    musicbrainz_id: Option<String>,
}

impl From<ArtistRow> for Artist {
    fn from(row: ArtistRow) -> Self {
        Artist {
            id: row.id,
            name: row.name,
            musicbrainz_id: row.musicbrainz_id,
        }
    }
}

/// Repository for artist reference data. Lookups are by name; MusicBrainz ids
/// from the external API are stored but not used as keys (they are often blank).
#[derive(Clone)]
pub struct ArtistRepository {
    pool: DbPool,
}

impl ArtistRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn find_by_id(&self, artist_id: i32) -> Result<Option<Artist>, MusicRepoError> {
        let mut conn = self.pool.get()?;

        let result = artists::table
            .filter(artists::id.eq(artist_id))
            .select(ArtistRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Artist::from))
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<Artist>, MusicRepoError> {
        let mut conn = self.pool.get()?;

        let result = artists::table
            .filter(artists::name.eq(name))
            .select(ArtistRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Artist::from))
    }

    /// Look an artist up by name, inserting it if missing.
    pub fn find_or_create(&self, name: &str, mbid: Option<&str>) -> Result<Artist, MusicRepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, MusicRepoError, _>(|conn| {
            let existing = artists::table
                .filter(artists::name.eq(name))
                .select(ArtistRow::as_select())
                .first(conn)
                .optional()?;
            if let Some(row) = existing {
                return Ok(Artist::from(row));
            }

            diesel::insert_into(artists::table)
                .values((artists::name.eq(name), artists::musicbrainz_id.eq(mbid)))
                .execute(conn)?;

            let row = artists::table
                .filter(artists::name.eq(name))
                .select(ArtistRow::as_select())
                .first(conn)?;
            Ok(Artist::from(row))
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = albums)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct AlbumRow {
    id: i32,
    name: String,
    artist_id: i32,
    musicbrainz_id: Option<String>,
}

impl From<AlbumRow> for Album {
    fn from(row: AlbumRow) -> Self {
        Album {
            id: row.id,
            name: row.name,
            artist_id: row.artist_id,
            musicbrainz_id: row.musicbrainz_id,
        }
    }
}

/// Repository for album reference data, keyed by (name, artist).
#[derive(Clone)]
pub struct AlbumRepository {
    pool: DbPool,
}

impl AlbumRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn find_or_create(
        &self,
        name: &str,
        artist_id: i32,
        mbid: Option<&str>,
    ) -> Result<Album, MusicRepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, MusicRepoError, _>(|conn| {
            let existing = albums::table
                .filter(albums::name.eq(name))
                .filter(albums::artist_id.eq(artist_id))
                .select(AlbumRow::as_select())
                .first(conn)
                .optional()?;
            if let Some(row) = existing {
                return Ok(Album::from(row));
            }

            diesel::insert_into(albums::table)
                .values((
                    albums::name.eq(name),
                    albums::artist_id.eq(artist_id),
                    albums::musicbrainz_id.eq(mbid),
                ))
                .execute(conn)?;

            let row = albums::table
                .filter(albums::name.eq(name))
                .filter(albums::artist_id.eq(artist_id))
                .select(AlbumRow::as_select())
                .first(conn)?;
            Ok(Album::from(row))
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tracks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct TrackRow {
    id: i32,
    name: String,
    artist_id: i32,
    musicbrainz_id: Option<String>,
    track_url: Option<String>,
}

impl From<TrackRow> for Track {
    fn from(row: TrackRow) -> Self {
        Track {
            id: row.id,
            name: row.name,
            artist_id: row.artist_id,
            musicbrainz_id: row.musicbrainz_id,
            track_url: row.track_url,
        }
    }
}

/// Repository for track reference data, keyed by (name, artist).
#[derive(Clone)]
pub struct TrackRepository {
    pool: DbPool,
}

impl TrackRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn find_by_id(&self, track_id: i32) -> Result<Option<Track>, MusicRepoError> {
        let mut conn = self.pool.get()?;

        let result = tracks::table
            .filter(tracks::id.eq(track_id))
            .select(TrackRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Track::from))
    }

    /// Look a track up by (name, artist), inserting it if missing. An existing
    /// track's url and mbid are refreshed with the latest values from the API.
    pub fn find_or_create(
        &self,
        name: &str,
        artist_id: i32,
        mbid: Option<&str>,
        track_url: Option<&str>,
    ) -> Result<Track, MusicRepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, MusicRepoError, _>(|conn| {
            let existing = tracks::table
                .filter(tracks::name.eq(name))
                .filter(tracks::artist_id.eq(artist_id))
                .select(TrackRow::as_select())
                .first(conn)
                .optional()?;

            if let Some(row) = existing {
                diesel::update(tracks::table.filter(tracks::id.eq(row.id)))
                    .set((
                        tracks::musicbrainz_id.eq(mbid),
                        tracks::track_url.eq(track_url),
                    ))
                    .execute(conn)?;
                return Ok(Track {
                    musicbrainz_id: mbid.map(str::to_string),
                    track_url: track_url.map(str::to_string),
                    ..Track::from(row)
                });
            }

            diesel::insert_into(tracks::table)
                .values((
                    tracks::name.eq(name),
                    tracks::artist_id.eq(artist_id),
                    tracks::musicbrainz_id.eq(mbid),
                    tracks::track_url.eq(track_url),
                ))
                .execute(conn)?;

            let row = tracks::table
                .filter(tracks::name.eq(name))
                .filter(tracks::artist_id.eq(artist_id))
                .select(TrackRow::as_select())
                .first(conn)?;
            Ok(Track::from(row))
        })
    }
}

// ============================================================================
// Top Data Repository
// ============================================================================

/// Repository for per-user, per-period top-listening aggregates.
#[derive(Clone)]
pub struct TopDataRepository {
    pool: DbPool,
}

impl TopDataRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Resolve a period name ("overall", "7day", ...) to its id.
    pub fn period_id(&self, period: &str) -> Result<Option<i32>, MusicRepoError> {
        let mut conn = self.pool.get()?;

        let result = periods::table
            .filter(periods::name.eq(period))
            .select(periods::id)
            .first(&mut conn)
            .optional()?;

        Ok(result)
    }

    /// Replace a user's top-artist rows for one period with a fresh snapshot.
    pub fn replace_top_artists(
        &self,
        user_id: i32,
        period_id: i32,
        entries: &[(i32, i32)],
    ) -> Result<(), MusicRepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, MusicRepoError, _>(|conn| {
            diesel::delete(
                top_artists::table
                    .filter(top_artists::user_id.eq(user_id))
                    .filter(top_artists::period_id.eq(period_id)),
            )
            .execute(conn)?;

            for (artist_id, play_count) in entries {
                diesel::insert_into(top_artists::table)
                    .values((
                        top_artists::user_id.eq(user_id),
                        top_artists::artist_id.eq(artist_id),
                        top_artists::period_id.eq(period_id),
                        top_artists::play_count.eq(play_count),
                    ))
                    .execute(conn)?;
            }
            Ok(())
        })
    }

    /// Replace a user's top-album rows for one period with a fresh snapshot.
    pub fn replace_top_albums(
        &self,
        user_id: i32,
        period_id: i32,
        entries: &[(i32, i32)],
    ) -> Result<(), MusicRepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, MusicRepoError, _>(|conn| {
            diesel::delete(
                top_albums::table
                    .filter(top_albums::user_id.eq(user_id))
                    .filter(top_albums::period_id.eq(period_id)),
            )
            .execute(conn)?;

            for (album_id, play_count) in entries {
                diesel::insert_into(top_albums::table)
                    .values((
                        top_albums::user_id.eq(user_id),
                        top_albums::album_id.eq(album_id),
                        top_albums::period_id.eq(period_id),
                        top_albums::play_count.eq(play_count),
                    ))
                    .execute(conn)?;
            }
            Ok(())
        })
    }

    /// Replace a user's top-track rows for one period with a fresh snapshot.
    pub fn replace_top_tracks(
        &self,
        user_id: i32,
        period_id: i32,
        entries: &[(i32, i32)],
    ) -> Result<(), MusicRepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, MusicRepoError, _>(|conn| {
            diesel::delete(
                top_tracks::table
                    .filter(top_tracks::user_id.eq(user_id))
                    .filter(top_tracks::period_id.eq(period_id)),
            )
            .execute(conn)?;

            for (track_id, play_count) in entries {
                diesel::insert_into(top_tracks::table)
                    .values((
                        top_tracks::user_id.eq(user_id),
                        top_tracks::track_id.eq(track_id),
                        top_tracks::period_id.eq(period_id),
                        top_tracks::play_count.eq(play_count),
                    ))
                    .execute(conn)?;
            }
            Ok(())
        })
    }

    /// A user's top artists for a period, highest playcount first.
    pub fn top_artists(
        &self,
        user_id: i32,
        period_id: i32,
        limit: i64,
    ) -> Result<Vec<TopArtistView>, MusicRepoError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<(i32, String, i32)> = top_artists::table
            .inner_join(artists::table)
            .filter(top_artists::user_id.eq(user_id))
            .filter(top_artists::period_id.eq(period_id))
            .order(top_artists::play_count.desc())
            .limit(limit)
            .select((artists::id, artists::name, top_artists::play_count))
            .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(id, name, scrobbles)| TopArtistView { id, name, scrobbles })
            .collect())
    }

    /// A user's top albums for a period, highest playcount first.
    pub fn top_albums(
        &self,
        user_id: i32,
        period_id: i32,
        limit: i64,
    ) -> Result<Vec<TopAlbumView>, MusicRepoError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<(i32, String, String, i32)> = top_albums::table
            .inner_join(albums::table.inner_join(artists::table))
            .filter(top_albums::user_id.eq(user_id))
            .filter(top_albums::period_id.eq(period_id))
            .order(top_albums::play_count.desc())
            .limit(limit)
            .select((
                albums::id,
                albums::name,
                artists::name,
                top_albums::play_count,
            ))
            .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(id, album, artist, playcount)| TopAlbumView {
                id,
                album,
                artist,
                playcount,
            })
            .collect())
    }

    /// A user's top tracks for a period, highest playcount first.
    pub fn top_tracks(
        &self,
        user_id: i32,
        period_id: i32,
        limit: i64,
    ) -> Result<Vec<TopTrackView>, MusicRepoError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<(i32, String, String, i32, Option<String>)> = top_tracks::table
            .inner_join(tracks::table.inner_join(artists::table))
            .filter(top_tracks::user_id.eq(user_id))
            .filter(top_tracks::period_id.eq(period_id))
            .order(top_tracks::play_count.desc())
            .limit(limit)
            .select((
                tracks::id,
                tracks::name,
                artists::name,
                top_tracks::play_count,
                tracks::track_url,
            ))
            .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(id, track, artist, playcount, lastfmtrackurl)| TopTrackView {
                id,
                track,
                artist,
                playcount,
                lastfmtrackurl,
            })
            .collect())
    }

    /// Playcount for one user+artist+period, 0 when no record exists.
    pub fn listens_for_artist(
        &self,
        username: &str,
        artist_name: &str,
        period: &str,
    ) -> Result<i32, MusicRepoError> {
        let mut conn = self.pool.get()?;

        let result: Option<i32> = top_artists::table
            .inner_join(users::table)
            .inner_join(artists::table)
            .inner_join(periods::table)
            .filter(users::username.eq(username))
            .filter(artists::name.eq(artist_name))
            .filter(periods::name.eq(period))
            .select(top_artists::play_count)
            .first(&mut conn)
            .optional()?;

        Ok(result.unwrap_or(0))
    }

    /// The top listeners of an artist for a period, by playcount descending.
    pub fn top_listeners_for_artist(
        &self,
        artist_name: &str,
        period: &str,
        limit: i64,
    ) -> Result<Vec<ListenerView>, MusicRepoError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<(String, i32)> = top_artists::table
            .inner_join(users::table)
            .inner_join(artists::table)
            .inner_join(periods::table)
            .filter(artists::name.eq(artist_name))
            .filter(periods::name.eq(period))
            .order(top_artists::play_count.desc())
            .limit(limit)
            .select((users::username, top_artists::play_count))
            .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(username, playcount)| ListenerView { username, playcount })
            .collect())
    }

    /// Whether a user's stored top data is stale (no rows, or none updated
    /// within the last day).
    pub fn refresh_due(&self, user_id: i32) -> Result<bool, MusicRepoError> {
        let mut conn = self.pool.get()?;

        let artist_latest: Option<NaiveDateTime> = top_artists::table
            .filter(top_artists::user_id.eq(user_id))
            .select(diesel::dsl::max(top_artists::updated_at))
            .first(&mut conn)?;
        let album_latest: Option<NaiveDateTime> = top_albums::table
            .filter(top_albums::user_id.eq(user_id))
            .select(diesel::dsl::max(top_albums::updated_at))
            .first(&mut conn)?;
        let track_latest: Option<NaiveDateTime> = top_tracks::table
            .filter(top_tracks::user_id.eq(user_id))
            .select(diesel::dsl::max(top_tracks::updated_at))
            .first(&mut conn)?;

        let latest = [artist_latest, album_latest, track_latest]
            .into_iter()
            .flatten()
            .max();

        let cutoff = Utc::now().naive_utc() - Duration::days(1);
        Ok(latest.is_none_or(|stamp| stamp < cutoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn test_create_and_find_user() {
        let pool = test_pool();
        let repo = UserRepository::new(pool);

        let user = repo
            .create(&NewUser::new(
                "cjonas41",
                "Christian",
                "Jonas",
                "cjonas@example.edu",
                "$argon2id$fake",
                false,
            ))
            .unwrap();
        assert_eq!(user.username, "cjonas41");
        assert_eq!(user.swag, SWAG_STARTING_BALANCE);
        assert!(user.last_login.is_none());

        let found = repo.find_by_username("cjonas41").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(repo.find_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_profile_rejected() {
        let pool = test_pool();
        let repo = UserRepository::new(pool);

        let base = NewUser::new("dup", "A", "B", "dup@example.edu", "h", false);
        repo.create(&base).unwrap();

        let same_name = NewUser::new("dup", "A", "B", "other@example.edu", "h", false);
        assert!(matches!(
            repo.create(&same_name),
            Err(UserRepoError::UsernameExists)
        ));

        let same_email = NewUser::new("dup2", "A", "B", "dup@example.edu", "h", false);
        assert!(matches!(
            repo.create(&same_email),
            Err(UserRepoError::EmailExists)
        ));
    }

    #[test]
    fn test_add_swag_is_an_increment() {
        let pool = test_pool();
        let repo = UserRepository::new(pool);

        let user = repo
            .create(&NewUser::new("swaggy", "S", "W", "s@example.edu", "h", false))
            .unwrap();
        let balance = repo.add_swag(user.id, 3).unwrap();
        assert_eq!(balance, SWAG_STARTING_BALANCE + 3);

        assert!(matches!(
            repo.add_swag(9999, 1),
            Err(UserRepoError::NotFound(_))
        ));
    }

    #[test]
    fn test_config_roundtrip() {
        let pool = test_pool();
        let repo = ConfigRepository::new(pool);

        assert!(repo.get("LAST_FM_API_KEY").unwrap().is_none());
        repo.set("LAST_FM_API_KEY", "abc123").unwrap();
        assert_eq!(repo.get("LAST_FM_API_KEY").unwrap().unwrap(), "abc123");
        repo.set("LAST_FM_API_KEY", "def456").unwrap();
        assert_eq!(repo.get("LAST_FM_API_KEY").unwrap().unwrap(), "def456");
    }

    #[test]
    fn test_find_or_create_is_idempotent() {
        let pool = test_pool();
        let artists = ArtistRepository::new(pool.clone());
        let tracks = TrackRepository::new(pool);

        let a1 = artists.find_or_create("Larry June", None).unwrap();
        let a2 = artists.find_or_create("Larry June", Some("mbid-1")).unwrap();
        assert_eq!(a1.id, a2.id);

        let t1 = tracks
            .find_or_create("Smoothies in 1991", a1.id, None, Some("https://last.fm/t/1"))
            .unwrap();
        let t2 = tracks
            .find_or_create("Smoothies in 1991", a1.id, None, Some("https://last.fm/t/2"))
            .unwrap();
        assert_eq!(t1.id, t2.id);
        assert_eq!(t2.track_url.as_deref(), Some("https://last.fm/t/2"));
    }

    #[test]
    fn test_top_data_replace_and_query() {
        let pool = test_pool();
        let users_repo = UserRepository::new(pool.clone());
        let artists = ArtistRepository::new(pool.clone());
        let tops = TopDataRepository::new(pool);

        let user = users_repo
            .create(&NewUser::new("listener", "L", "I", "l@example.edu", "h", false))
            .unwrap();
        let period = tops.period_id("7day").unwrap().unwrap();
        assert!(tops.period_id("2week").unwrap().is_none());

        let a = artists.find_or_create("Men I Trust", None).unwrap();
        let b = artists.find_or_create("Khruangbin", None).unwrap();

        assert!(tops.refresh_due(user.id).unwrap());

        tops.replace_top_artists(user.id, period, &[(a.id, 12), (b.id, 40)])
            .unwrap();
        let top = tops.top_artists(user.id, period, 10).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Khruangbin");
        assert_eq!(top[0].scrobbles, 40);

        // A second snapshot replaces, never accumulates.
        tops.replace_top_artists(user.id, period, &[(a.id, 13)]).unwrap();
        let top = tops.top_artists(user.id, period, 10).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "Men I Trust");

        assert!(!tops.refresh_due(user.id).unwrap());

        assert_eq!(
            tops.listens_for_artist("listener", "Men I Trust", "7day").unwrap(),
            13
        );
        assert_eq!(
            tops.listens_for_artist("listener", "Khruangbin", "7day").unwrap(),
            0
        );

        let listeners = tops
            .top_listeners_for_artist("Men I Trust", "7day", 10)
            .unwrap();
        assert_eq!(listeners.len(), 1);
        assert_eq!(listeners[0].username, "listener");
    }
}
