//! Database connection pool, schema migrations, and seed data.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::time::Duration;

use crate::models::RelatedKind;
use crate::models::user::SYSTEM_ACCOUNT_ID;

/// Type alias for our connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Type alias for a pooled connection.
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection timeout in seconds.
    pub connection_timeout: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "broadcastr.db".to_string(),
            max_connections: 10,
            connection_timeout: 30,
        }
    }
}

impl DbConfig {
    /// Create a new database configuration.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    /// Build a connection pool from this configuration.
    pub fn build_pool(&self) -> Result<DbPool, Box<dyn std::error::Error>> {
        let manager = ConnectionManager::<SqliteConnection>::new(&self.database_url);

        Pool::builder()
            .max_size(self.max_connections)
            .connection_timeout(Duration::from_secs(self.connection_timeout))
            .build(manager)
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }
}

/// Run the SQL migrations to set up the database schema, then seed the static
/// reference data (periods, related kinds, the reaction phrase bank, and the
/// system account).
pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            username TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            password_hash TEXT NOT NULL DEFAULT '',
            bootstrapped BOOLEAN NOT NULL DEFAULT FALSE,
            admin BOOLEAN NOT NULL DEFAULT FALSE,
            swag INTEGER NOT NULL DEFAULT 0,
            image_url TEXT,
            last_fm_url TEXT,
            last_login TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_users_username ON users(username)")
        .execute(conn)?;
    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
        .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS artists (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            name TEXT NOT NULL,
            musicbrainz_id TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_artists_name ON artists(name)")
        .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS albums (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            name TEXT NOT NULL,
            artist_id INTEGER NOT NULL REFERENCES artists(id),
            musicbrainz_id TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_albums_name ON albums(name)")
        .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            name TEXT NOT NULL,
            artist_id INTEGER NOT NULL REFERENCES artists(id),
            musicbrainz_id TEXT,
            track_url TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_tracks_name ON tracks(name)")
        .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS periods (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(conn)?;

    for table in ["top_artists", "top_albums", "top_tracks"] {
        let entity_column = match table {
            "top_artists" => "artist_id",
            "top_albums" => "album_id",
            _ => "track_id",
        };
        diesel::sql_query(format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id),
                {entity_column} INTEGER NOT NULL,
                period_id INTEGER NOT NULL REFERENCES periods(id),
                play_count INTEGER NOT NULL DEFAULT 0,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        ))
        .execute(conn)?;
        diesel::sql_query(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_user_period ON {table}(user_id, period_id)"
        ))
        .execute(conn)?;
    }

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS broadcasts (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id),
            title TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL DEFAULT '',
            related_type_id INTEGER NOT NULL REFERENCES related_types(id),
            related_id INTEGER NOT NULL DEFAULT 0,
            deleted BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE INDEX IF NOT EXISTS idx_broadcasts_user_id ON broadcasts(user_id)",
    )
    .execute(conn)?;
    diesel::sql_query(
        "CREATE INDEX IF NOT EXISTS idx_broadcasts_related ON broadcasts(related_type_id, related_id)",
    )
    .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS likes (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id),
            related_type_id INTEGER NOT NULL REFERENCES related_types(id),
            related_id INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    // Backstop for the at-most-one-like invariant; the repository also checks
    // inside a transaction so duplicates surface as conflicts, not 500s.
    diesel::sql_query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_unique_triple \
         ON likes(user_id, related_type_id, related_id)",
    )
    .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS followings (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            follower_id INTEGER NOT NULL REFERENCES users(id),
            followee_id INTEGER NOT NULL REFERENCES users(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_followings_unique_pair \
         ON followings(follower_id, followee_id)",
    )
    .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS direct_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            sender_id INTEGER NOT NULL REFERENCES users(id),
            recipient_id INTEGER NOT NULL REFERENCES users(id),
            body TEXT NOT NULL,
            is_read BOOLEAN NOT NULL DEFAULT FALSE,
            sent_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE INDEX IF NOT EXISTS idx_direct_messages_recipient \
         ON direct_messages(recipient_id, sender_id)",
    )
    .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS song_swaps (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            initiated_user_id INTEGER NOT NULL REFERENCES users(id),
            matched_user_id INTEGER NOT NULL REFERENCES users(id),
            initiated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            initiated_track_id INTEGER REFERENCES tracks(id),
            initiated_track_at TIMESTAMP,
            matched_track_id INTEGER REFERENCES tracks(id),
            matched_track_at TIMESTAMP,
            initiated_reaction INTEGER,
            initiated_reaction_at TIMESTAMP,
            matched_reaction INTEGER,
            matched_reaction_at TIMESTAMP,
            CHECK (initiated_user_id <> matched_user_id)
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE INDEX IF NOT EXISTS idx_song_swaps_users \
         ON song_swaps(initiated_user_id, matched_user_id)",
    )
    .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS swap_reactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            score INTEGER NOT NULL,
            title TEXT NOT NULL
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS related_types (
            id INTEGER PRIMARY KEY NOT NULL,
            description TEXT NOT NULL UNIQUE,
            db_table TEXT,
            db_id_column TEXT,
            db_name_column TEXT
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS config (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(conn)?;

    seed_periods(conn)?;
    seed_related_types(conn)?;
    seed_system_account(conn)?;
    seed_swap_reactions(conn)?;

    Ok(())
}

fn seed_periods(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    for period in crate::models::music::REFRESH_PERIODS {
        diesel::sql_query("INSERT OR IGNORE INTO periods (name) VALUES (?)")
            .bind::<diesel::sql_types::Text, _>(period)
            .execute(conn)?;
    }
    Ok(())
}

/// Mirror the `RelatedKind` enum into the `related_types` table so the
/// `(related_type_id, related_id)` pairs stored on likes and broadcasts stay
/// inspectable in the database. The enum is the source of truth.
fn seed_related_types(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    for kind in RelatedKind::ALL {
        let target = kind.target();
        diesel::sql_query(
            "INSERT OR REPLACE INTO related_types \
             (id, description, db_table, db_id_column, db_name_column) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind::<diesel::sql_types::Integer, _>(kind.id())
        .bind::<diesel::sql_types::Text, _>(kind.description())
        .bind::<diesel::sql_types::Nullable<diesel::sql_types::Text>, _>(
            target.map(|t| t.table),
        )
        .bind::<diesel::sql_types::Nullable<diesel::sql_types::Text>, _>(
            target.map(|t| t.id_column),
        )
        .bind::<diesel::sql_types::Nullable<diesel::sql_types::Text>, _>(
            target.map(|t| t.name_column),
        )
        .execute(conn)?;
    }
    Ok(())
}

/// Create the distinguished system account. It carries no password hash and
/// never logs in; all automated broadcasts are authored by it.
fn seed_system_account(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    diesel::sql_query(
        "INSERT OR IGNORE INTO users (id, username, first_name, last_name, email, admin) \
         VALUES (?, 'broadcastr', 'Broadcastr', 'System', 'system@broadcastr.invalid', TRUE)",
    )
    .bind::<diesel::sql_types::Integer, _>(SYSTEM_ACCOUNT_ID)
    .execute(conn)?;
    Ok(())
}

/// Canned broadcast titles for song swap reactions, several per score tier.
/// Score 1 is scathing, score 5 is rapturous.
pub(crate) const REACTION_PHRASES: [(i32, &[&str]); 5] = [
    (1, &[
        "Straight to the skip pile",
        "My ears want a refund",
        "That was a choice, I guess",
        "Not even on shuffle, sorry",
        "We need to talk about your taste",
    ]),
    (2, &[
        "It's giving elevator music",
        "Heard worse, wanted better",
        "One and a half stars, rounded up",
        "Background noise at best",
        "I checked how long was left. Twice.",
    ]),
    (3, &[
        "Solid middle of the road",
        "Wouldn't skip it, wouldn't seek it",
        "Respectable pick, honestly",
        "A perfectly fine tune",
        "It grew on me by the bridge",
    ]),
    (4, &[
        "Okay, this one slaps",
        "Added to the rotation",
        "You might be onto something",
        "Second listen already queued",
        "Strong pick, no notes. Almost.",
    ]),
    (5, &[
        "New favorite song unlocked",
        "Repeat button is begging for mercy",
        "An all-timer, instantly",
        "This one rewired my brain",
        "Taste officially certified",
    ]),
];

fn seed_swap_reactions(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    let existing: i64 = crate::db::schema::swap_reactions::table
        .count()
        .get_result(conn)?;
    if existing > 0 {
        return Ok(());
    }
    for (score, titles) in REACTION_PHRASES {
        for title in titles {
            diesel::sql_query("INSERT INTO swap_reactions (score, title) VALUES (?, ?)")
                .bind::<diesel::sql_types::Integer, _>(score)
                .bind::<diesel::sql_types::Text, _>(*title)
                .execute(conn)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.database_url, "broadcastr.db");
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_in_memory_pool() {
        let config = DbConfig::new(":memory:");
        let pool = config.build_pool();
        assert!(pool.is_ok());
    }

    #[test]
    fn test_migrations_seed_reference_data() {
        use diesel::sql_types::BigInt;

        #[derive(QueryableByName)]
        struct CountRow {
            #[diesel(sql_type = BigInt)]
            n: i64,
        }

        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        run_migrations(&mut conn).unwrap();
        // Re-running must be harmless.
        run_migrations(&mut conn).unwrap();

        let kinds: CountRow = diesel::sql_query("SELECT COUNT(*) AS n FROM related_types")
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(kinds.n, RelatedKind::ALL.len() as i64);

        let periods: CountRow = diesel::sql_query("SELECT COUNT(*) AS n FROM periods")
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(periods.n, 4);

        let system: CountRow = diesel::sql_query(
            "SELECT COUNT(*) AS n FROM users WHERE id = 1 AND password_hash = ''",
        )
        .get_result(&mut conn)
        .unwrap();
        assert_eq!(system.n, 1);

        // Every score tier has phrases to draw from.
        for score in 1..=5 {
            let phrases: CountRow = diesel::sql_query(format!(
                "SELECT COUNT(*) AS n FROM swap_reactions WHERE score = {score}"
            ))
            .get_result(&mut conn)
            .unwrap();
            assert!(phrases.n >= 2, "score {score} needs candidate phrases");
        }
    }
}
