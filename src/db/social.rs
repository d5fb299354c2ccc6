//! Repositories for the social features: broadcasts and the polymorphic feed,
//! likes, follows, direct messages, and song swaps.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Nullable, Text, Timestamp};
use diesel::sqlite::SqliteConnection;
use thiserror::Error;
use tracing::debug;

use crate::db::DbPool;
use crate::db::schema::{
    broadcasts, direct_messages, followings, likes, song_swaps, swap_reactions, users,
};
use crate::models::music::BroadcastedTrackView;
use crate::models::social::{
    BroadcastView, ConversationView, DirectMessageView, FollowerView, FollowingView, RelatedKind,
    SongSwap, SongSwapView, SwapRole,
};
use crate::models::user::{SWAG_LIKED_BROADCAST, SYSTEM_ACCOUNT_ID};

diesel::define_sql_function! {
    /// SQLite rowid of the most recent successful INSERT on this connection.
    fn last_insert_rowid() -> diesel::sql_types::Integer;
}

/// Errors that can occur during social repository operations.
#[derive(Debug, Error)]
pub enum SocialRepoError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    Validation(String),
}

/// Map a unique-index violation to a conflict. The existence checks inside
/// the write transactions catch duplicates first; the index catches a
/// concurrent writer that slips past them, and the loser must see the same
/// conflict as everyone else.
fn unique_conflict(message: &'static str) -> impl Fn(diesel::result::Error) -> SocialRepoError {
    move |err| match err {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ) => SocialRepoError::Conflict(message.into()),
        other => SocialRepoError::Database(other),
    }
}

/// Insert a broadcast row and return its id. Used directly by the broadcast
/// repository and from inside other repositories' transactions, so system
/// announcements commit or roll back together with the action they describe.
fn insert_broadcast(
    conn: &mut SqliteConnection,
    user_id: i32,
    title: &str,
    body: &str,
    kind: RelatedKind,
    related_id: i32,
) -> QueryResult<i32> {
    diesel::insert_into(broadcasts::table)
        .values((
            broadcasts::user_id.eq(user_id),
            broadcasts::title.eq(title),
            broadcasts::body.eq(body),
            broadcasts::related_type_id.eq(kind.id()),
            broadcasts::related_id.eq(related_id),
        ))
        .execute(conn)?;

    diesel::select(last_insert_rowid()).get_result(conn)
}

/// Insert a broadcast authored by the system account. Every automated
/// announcement in the codebase goes through here.
fn insert_system_broadcast(
    conn: &mut SqliteConnection,
    title: &str,
    body: &str,
    kind: RelatedKind,
    related_id: i32,
) -> QueryResult<i32> {
    insert_broadcast(conn, SYSTEM_ACCOUNT_ID, title, body, kind, related_id)
}

// ============================================================================
// Broadcast Repository
// ============================================================================

#[derive(Debug, QueryableByName)]
struct BroadcastFeedRow {
    #[diesel(sql_type = Integer)]
    id: i32,
    #[diesel(sql_type = Text)]
    author: String,
    #[diesel(sql_type = Text)]
    title: String,
    #[diesel(sql_type = Text)]
    body: String,
    #[diesel(sql_type = Timestamp)]
    stamp: NaiveDateTime,
    #[diesel(sql_type = Text)]
    kind: String,
    #[diesel(sql_type = Integer)]
    related_id: i32,
    #[diesel(sql_type = Text)]
    related_to: String,
    #[diesel(sql_type = Text)]
    track_url: String,
    #[diesel(sql_type = BigInt)]
    likes: i64,
    #[diesel(sql_type = Integer)]
    liked_by_viewer: i32,
}

impl From<BroadcastFeedRow> for BroadcastView {
    fn from(row: BroadcastFeedRow) -> Self {
        BroadcastView {
            id: row.id,
            user: row.author,
            title: row.title,
            body: row.body,
            timestamp: row.stamp,
            kind: row.kind,
            relatedid: row.related_id,
            relatedto: row.related_to,
            track_url: row.track_url,
            likes: row.likes,
            liked_by_viewer: row.liked_by_viewer != 0,
        }
    }
}

#[derive(Debug, QueryableByName)]
struct BroadcastedTrackRow {
    #[diesel(sql_type = Integer)]
    broadcast_id: i32,
    #[diesel(sql_type = Integer)]
    track_id: i32,
    #[diesel(sql_type = Text)]
    track: String,
    #[diesel(sql_type = Text)]
    artist: String,
    #[diesel(sql_type = Nullable<Text>)]
    track_url: Option<String>,
    #[diesel(sql_type = BigInt)]
    likes: i64,
}

/// Repository for broadcasts and the polymorphic feed query.
#[derive(Clone)]
pub struct BroadcastRepository {
    pool: DbPool,
}

impl BroadcastRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a user-authored broadcast and return its id.
    pub fn create(
        &self,
        user_id: i32,
        title: &str,
        body: &str,
        kind: RelatedKind,
        related_id: i32,
    ) -> Result<i32, SocialRepoError> {
        let mut conn = self.pool.get()?;
        let id = insert_broadcast(&mut conn, user_id, title, body, kind, related_id)?;
        Ok(id)
    }

    /// Store a broadcast authored by the system account.
    pub fn create_system(
        &self,
        title: &str,
        body: &str,
        kind: RelatedKind,
        related_id: i32,
    ) -> Result<i32, SocialRepoError> {
        let mut conn = self.pool.get()?;
        let id = insert_system_broadcast(&mut conn, title, body, kind, related_id)?;
        Ok(id)
    }

    /// Soft-delete a broadcast. The row stays; the feed filters it out.
    pub fn delete(&self, broadcast_id: i32) -> Result<(), SocialRepoError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(broadcasts::table.filter(broadcasts::id.eq(broadcast_id)))
            .set(broadcasts::deleted.eq(true))
            .execute(&mut conn)?;

        if updated == 0 {
            return Err(SocialRepoError::NotFound(format!(
                "broadcast id {broadcast_id}"
            )));
        }
        Ok(())
    }

    /// The author of a broadcast, or `None` for an unknown id.
    pub fn author_of(&self, broadcast_id: i32) -> Result<Option<i32>, SocialRepoError> {
        let mut conn = self.pool.get()?;

        let result = broadcasts::table
            .filter(broadcasts::id.eq(broadcast_id))
            .select(broadcasts::user_id)
            .first(&mut conn)
            .optional()?;

        Ok(result)
    }

    /// The broadcast feed: one UNION branch per related kind, each resolving
    /// the `(related_type_id, related_id)` pair against that kind's target
    /// table to get a display name (and, for tracks, a track url). An outer
    /// aggregation joins in like counts and the viewer's own like.
    ///
    /// The SQL is synthesized from `RelatedKind`'s static metadata plus
    /// already-resolved integer ids; no caller-supplied text is interpolated.
    pub fn feed(
        &self,
        viewer_id: Option<i32>,
        author_id: Option<i32>,
        kind: Option<RelatedKind>,
        limit: i64,
    ) -> Result<Vec<BroadcastView>, SocialRepoError> {
        let mut conn = self.pool.get()?;

        let branches: Vec<String> = RelatedKind::ALL
            .into_iter()
            .filter(|k| kind.is_none_or(|wanted| wanted == *k))
            .map(|k| feed_branch(k, author_id))
            .collect();

        let viewer_flag = match viewer_id {
            Some(viewer) => format!(
                "COALESCE(MAX(CASE WHEN l.user_id = {viewer} THEN 1 ELSE 0 END), 0)"
            ),
            None => "0".to_string(),
        };

        let sql = format!(
            "SELECT f.id AS id, f.author AS author, f.title AS title, f.body AS body, \
                    f.stamp AS stamp, f.kind AS kind, f.related_id AS related_id, \
                    f.related_to AS related_to, f.track_url AS track_url, \
                    COUNT(l.id) AS likes, \
                    {viewer_flag} AS liked_by_viewer \
             FROM ({branches}) AS f \
             LEFT JOIN likes l ON f.id = l.related_id \
                 AND l.related_type_id = {broadcast_kind} \
             WHERE f.deleted = 0 \
             GROUP BY f.id, f.author, f.title, f.body, f.stamp, f.kind, \
                      f.related_id, f.related_to, f.track_url \
             ORDER BY f.stamp DESC, f.id DESC \
             LIMIT ?",
            branches = branches.join(" UNION ALL "),
            broadcast_kind = RelatedKind::Broadcast.id(),
        );

        debug!(branch_count = branches.len(), "synthesized broadcast feed query");

        let rows: Vec<BroadcastFeedRow> = diesel::sql_query(sql)
            .bind::<BigInt, _>(limit)
            .load(&mut conn)?;

        Ok(rows.into_iter().map(BroadcastView::from).collect())
    }

    /// A user's Track-kind broadcasts ranked by like count.
    pub fn top_broadcasted_tracks(
        &self,
        author_id: i32,
        limit: i64,
    ) -> Result<Vec<BroadcastedTrackView>, SocialRepoError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<BroadcastedTrackRow> = diesel::sql_query(
            "SELECT b.id AS broadcast_id, t.id AS track_id, t.name AS track, \
                    a.name AS artist, t.track_url AS track_url, COUNT(l.id) AS likes \
             FROM broadcasts b \
             INNER JOIN tracks t ON b.related_id = t.id \
             INNER JOIN artists a ON t.artist_id = a.id \
             LEFT JOIN likes l ON b.id = l.related_id AND l.related_type_id = ? \
             WHERE b.related_type_id = ? AND b.user_id = ? AND b.deleted = 0 \
             GROUP BY b.id, t.id, t.name, a.name, t.track_url \
             ORDER BY COUNT(l.id) DESC, b.created_at DESC \
             LIMIT ?",
        )
        .bind::<Integer, _>(RelatedKind::Broadcast.id())
        .bind::<Integer, _>(RelatedKind::Track.id())
        .bind::<Integer, _>(author_id)
        .bind::<BigInt, _>(limit)
        .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|row| BroadcastedTrackView {
                broadcastid: row.broadcast_id,
                trackid: row.track_id,
                track: row.track,
                artist: row.artist,
                lastfmtrackurl: row.track_url,
                likes: row.likes,
            })
            .collect())
    }
}

/// One UNION branch of the feed, selecting broadcasts of a single kind.
/// Kinds with a concrete target LEFT JOIN it for the display name; the rest
/// emit empty-string placeholders so every branch has the same shape.
fn feed_branch(kind: RelatedKind, author_id: Option<i32>) -> String {
    let related_to = match kind.target() {
        Some(target) => format!("COALESCE(t.{}, '')", target.name_column),
        None => "''".to_string(),
    };
    let track_url = if kind == RelatedKind::Track {
        "COALESCE(t.track_url, '')"
    } else {
        "''"
    };
    let target_join = match kind.target() {
        Some(target) => format!(
            "LEFT JOIN {table} t ON b.related_id = t.{id_column} ",
            table = target.table,
            id_column = target.id_column,
        ),
        None => String::new(),
    };
    let author_filter = match author_id {
        Some(author) => format!("AND b.user_id = {author} "),
        None => String::new(),
    };

    format!(
        "SELECT b.id AS id, u.username AS author, b.title AS title, b.body AS body, \
                b.created_at AS stamp, '{kind_name}' AS kind, b.related_id AS related_id, \
                {related_to} AS related_to, {track_url} AS track_url, b.deleted AS deleted \
         FROM broadcasts b \
         INNER JOIN users u ON b.user_id = u.id \
         {target_join}\
         WHERE b.related_type_id = {kind_id} {author_filter}",
        kind_name = kind.description(),
        kind_id = kind.id(),
    )
}

// ============================================================================
// Like Repository
// ============================================================================

/// Repository for likes against any related kind.
#[derive(Clone)]
pub struct LikeRepository {
    pool: DbPool,
}

impl LikeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Record a like and return its id. At most one like per user per target:
    /// a duplicate is a conflict, checked inside the transaction (the unique
    /// index backstops concurrent writers).
    ///
    /// Liking someone else's broadcast awards its author swag, committed
    /// atomically with the like itself.
    pub fn create(
        &self,
        user_id: i32,
        kind: RelatedKind,
        related_id: i32,
    ) -> Result<i32, SocialRepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, SocialRepoError, _>(|conn| {
            let existing: i64 = likes::table
                .filter(likes::user_id.eq(user_id))
                .filter(likes::related_type_id.eq(kind.id()))
                .filter(likes::related_id.eq(related_id))
                .count()
                .get_result(conn)?;
            if existing > 0 {
                return Err(SocialRepoError::Conflict("like already exists".into()));
            }

            diesel::insert_into(likes::table)
                .values((
                    likes::user_id.eq(user_id),
                    likes::related_type_id.eq(kind.id()),
                    likes::related_id.eq(related_id),
                ))
                .execute(conn)
                .map_err(unique_conflict("like already exists"))?;
            let like_id: i32 = diesel::select(last_insert_rowid()).get_result(conn)?;

            if kind == RelatedKind::Broadcast {
                let author: Option<i32> = broadcasts::table
                    .filter(broadcasts::id.eq(related_id))
                    .select(broadcasts::user_id)
                    .first(conn)
                    .optional()?;
                if let Some(author_id) = author
                    && author_id != user_id
                {
                    diesel::update(users::table.filter(users::id.eq(author_id)))
                        .set(users::swag.eq(users::swag + SWAG_LIKED_BROADCAST))
                        .execute(conn)?;
                }
            }

            Ok(like_id)
        })
    }

    /// Remove a like. Missing likes are reported, not ignored.
    pub fn remove(
        &self,
        user_id: i32,
        kind: RelatedKind,
        related_id: i32,
    ) -> Result<(), SocialRepoError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(
            likes::table
                .filter(likes::user_id.eq(user_id))
                .filter(likes::related_type_id.eq(kind.id()))
                .filter(likes::related_id.eq(related_id)),
        )
        .execute(&mut conn)?;

        if deleted == 0 {
            return Err(SocialRepoError::NotFound("like does not exist".into()));
        }
        Ok(())
    }

    /// The id of a user's like on a target, if one exists.
    pub fn find(
        &self,
        user_id: i32,
        kind: RelatedKind,
        related_id: i32,
    ) -> Result<Option<i32>, SocialRepoError> {
        let mut conn = self.pool.get()?;

        let result = likes::table
            .filter(likes::user_id.eq(user_id))
            .filter(likes::related_type_id.eq(kind.id()))
            .filter(likes::related_id.eq(related_id))
            .select(likes::id)
            .first(&mut conn)
            .optional()?;

        Ok(result)
    }
}

// ============================================================================
// Following Repository
// ============================================================================

/// Repository for follower/followee relationships.
#[derive(Clone)]
pub struct FollowingRepository {
    pool: DbPool,
}

impl FollowingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Record that `follower_id` follows `followee_id` and return the row id.
    pub fn follow(&self, follower_id: i32, followee_id: i32) -> Result<i32, SocialRepoError> {
        if follower_id == followee_id {
            return Err(SocialRepoError::Validation(
                "a user cannot follow themselves".into(),
            ));
        }

        let mut conn = self.pool.get()?;

        conn.transaction::<_, SocialRepoError, _>(|conn| {
            let existing: i64 = followings::table
                .filter(followings::follower_id.eq(follower_id))
                .filter(followings::followee_id.eq(followee_id))
                .count()
                .get_result(conn)?;
            if existing > 0 {
                return Err(SocialRepoError::Conflict("already following".into()));
            }

            diesel::insert_into(followings::table)
                .values((
                    followings::follower_id.eq(follower_id),
                    followings::followee_id.eq(followee_id),
                ))
                .execute(conn)
                .map_err(unique_conflict("already following"))?;

            let id = diesel::select(last_insert_rowid()).get_result(conn)?;
            Ok(id)
        })
    }

    pub fn unfollow(&self, follower_id: i32, followee_id: i32) -> Result<(), SocialRepoError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(
            followings::table
                .filter(followings::follower_id.eq(follower_id))
                .filter(followings::followee_id.eq(followee_id)),
        )
        .execute(&mut conn)?;

        if deleted == 0 {
            return Err(SocialRepoError::NotFound("not following that user".into()));
        }
        Ok(())
    }

    /// Who follows `user_id`, most recent first.
    pub fn followers(&self, user_id: i32, limit: i64) -> Result<Vec<FollowerView>, SocialRepoError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<(String, NaiveDateTime)> = followings::table
            .inner_join(users::table.on(users::id.eq(followings::follower_id)))
            .filter(followings::followee_id.eq(user_id))
            .order(followings::created_at.desc())
            .limit(limit)
            .select((users::username, followings::created_at))
            .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(follower, followingsince)| FollowerView {
                follower,
                followingsince,
            })
            .collect())
    }

    /// Who `user_id` follows, most recent first.
    pub fn following(&self, user_id: i32, limit: i64) -> Result<Vec<FollowingView>, SocialRepoError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<(String, NaiveDateTime)> = followings::table
            .inner_join(users::table.on(users::id.eq(followings::followee_id)))
            .filter(followings::follower_id.eq(user_id))
            .order(followings::created_at.desc())
            .limit(limit)
            .select((users::username, followings::created_at))
            .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(following, followingsince)| FollowingView {
                following,
                followingsince,
            })
            .collect())
    }
}

// ============================================================================
// Direct Message Repository
// ============================================================================

#[derive(Debug, QueryableByName)]
struct ConversationRow {
    #[diesel(sql_type = Text)]
    conversant: String,
    #[diesel(sql_type = BigInt)]
    message_count: i64,
    #[diesel(sql_type = BigInt)]
    unread_count: i64,
    #[diesel(sql_type = Timestamp)]
    last_conversation: NaiveDateTime,
}

#[derive(Debug, QueryableByName)]
struct ThreadMessageRow {
    #[diesel(sql_type = Integer)]
    id: i32,
    #[diesel(sql_type = Text)]
    direction: String,
    #[diesel(sql_type = Text)]
    sender: String,
    #[diesel(sql_type = Text)]
    recipient: String,
    #[diesel(sql_type = Text)]
    message: String,
    #[diesel(sql_type = Timestamp)]
    sent: NaiveDateTime,
}

/// Repository for direct messages between pairs of users.
#[derive(Clone)]
pub struct MessageRepository {
    pool: DbPool,
}

impl MessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Send a message and return its id.
    pub fn send(
        &self,
        sender_id: i32,
        recipient_id: i32,
        body: &str,
    ) -> Result<i32, SocialRepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, SocialRepoError, _>(|conn| {
            diesel::insert_into(direct_messages::table)
                .values((
                    direct_messages::sender_id.eq(sender_id),
                    direct_messages::recipient_id.eq(recipient_id),
                    direct_messages::body.eq(body),
                ))
                .execute(conn)?;

            let id = diesel::select(last_insert_rowid()).get_result(conn)?;
            Ok(id)
        })
    }

    /// A user's conversations, one row per counterpart, with message and
    /// unread counts, most recently active first. Only received messages can
    /// be unread.
    pub fn conversations(
        &self,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<ConversationView>, SocialRepoError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<ConversationRow> = diesel::sql_query(
            "SELECT conversant, COUNT(id) AS message_count, SUM(unread) AS unread_count, \
                    MAX(sent) AS last_conversation \
             FROM ( \
                 SELECT s.username AS conversant, m.id AS id, \
                        CASE WHEN m.is_read THEN 0 ELSE 1 END AS unread, m.sent_at AS sent \
                 FROM direct_messages m \
                 INNER JOIN users s ON m.sender_id = s.id \
                 WHERE m.recipient_id = ? \
                 UNION ALL \
                 SELECT r.username AS conversant, m.id AS id, 0 AS unread, m.sent_at AS sent \
                 FROM direct_messages m \
                 INNER JOIN users r ON m.recipient_id = r.id \
                 WHERE m.sender_id = ? \
             ) AS threads \
             GROUP BY conversant \
             ORDER BY last_conversation DESC \
             LIMIT ?",
        )
        .bind::<Integer, _>(user_id)
        .bind::<Integer, _>(user_id)
        .bind::<BigInt, _>(limit)
        .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|row| ConversationView {
                conversant: row.conversant,
                messagecount: row.message_count,
                unreadcount: row.unread_count,
                lastconversation: row.last_conversation,
            })
            .collect())
    }

    /// The thread between two users: the newest `limit` messages, presented
    /// oldest first so a client can render them top to bottom.
    pub fn thread(
        &self,
        user_id: i32,
        conversant_id: i32,
        limit: i64,
    ) -> Result<Vec<DirectMessageView>, SocialRepoError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<ThreadMessageRow> = diesel::sql_query(
            "SELECT * FROM ( \
                 SELECT 'Incoming' AS direction, m.id AS id, s.username AS sender, \
                        r.username AS recipient, m.body AS message, m.sent_at AS sent \
                 FROM direct_messages m \
                 INNER JOIN users s ON m.sender_id = s.id \
                 INNER JOIN users r ON m.recipient_id = r.id \
                 WHERE m.recipient_id = ? AND m.sender_id = ? \
                 UNION ALL \
                 SELECT 'Outgoing' AS direction, m.id AS id, s.username AS sender, \
                        r.username AS recipient, m.body AS message, m.sent_at AS sent \
                 FROM direct_messages m \
                 INNER JOIN users s ON m.sender_id = s.id \
                 INNER JOIN users r ON m.recipient_id = r.id \
                 WHERE m.sender_id = ? AND m.recipient_id = ? \
                 ORDER BY sent DESC, id DESC \
                 LIMIT ? \
             ) AS page \
             ORDER BY page.sent ASC, page.id ASC",
        )
        .bind::<Integer, _>(user_id)
        .bind::<Integer, _>(conversant_id)
        .bind::<Integer, _>(user_id)
        .bind::<Integer, _>(conversant_id)
        .bind::<BigInt, _>(limit)
        .load(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|row| DirectMessageView {
                id: row.id,
                direction: row.direction,
                sender: row.sender,
                recipient: row.recipient,
                message: row.message,
                timestamp: row.sent,
            })
            .collect())
    }

    /// Mark everything `sender_id` sent to `recipient_id` as read. Returns the
    /// number of messages affected.
    pub fn mark_read(&self, sender_id: i32, recipient_id: i32) -> Result<usize, SocialRepoError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(
            direct_messages::table
                .filter(direct_messages::sender_id.eq(sender_id))
                .filter(direct_messages::recipient_id.eq(recipient_id)),
        )
        .set(direct_messages::is_read.eq(true))
        .execute(&mut conn)?;

        Ok(updated)
    }
}

// ============================================================================
// Song Swap Repository
// ============================================================================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = song_swaps)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct SongSwapRow {
    id: i32,
    initiated_user_id: i32,
    matched_user_id: i32,
    initiated_at: NaiveDateTime,
    initiated_track_id: Option<i32>,
    initiated_track_at: Option<NaiveDateTime>,
    matched_track_id: Option<i32>,
    matched_track_at: Option<NaiveDateTime>,
    initiated_reaction: Option<i32>,
    initiated_reaction_at: Option<NaiveDateTime>,
    matched_reaction: Option<i32>,
    matched_reaction_at: Option<NaiveDateTime>,
}

impl From<SongSwapRow> for SongSwap {
    fn from(row: SongSwapRow) -> Self {
        SongSwap {
            id: row.id,
            initiated_user_id: row.initiated_user_id,
            matched_user_id: row.matched_user_id,
            initiated_at: row.initiated_at,
            initiated_track_id: row.initiated_track_id,
            initiated_track_at: row.initiated_track_at,
            matched_track_id: row.matched_track_id,
            matched_track_at: row.matched_track_at,
            initiated_reaction: row.initiated_reaction,
            initiated_reaction_at: row.initiated_reaction_at,
            matched_reaction: row.matched_reaction,
            matched_reaction_at: row.matched_reaction_at,
        }
    }
}

#[derive(Debug, QueryableByName)]
struct SongSwapListRow {
    #[diesel(sql_type = Integer)]
    id: i32,
    #[diesel(sql_type = Integer)]
    initiated_user_id: i32,
    #[diesel(sql_type = Text)]
    initiated_user: String,
    #[diesel(sql_type = Integer)]
    matched_user_id: i32,
    #[diesel(sql_type = Text)]
    matched_user: String,
    #[diesel(sql_type = Nullable<Integer>)]
    initiated_track_id: Option<i32>,
    #[diesel(sql_type = Nullable<Text>)]
    initiated_track_name: Option<String>,
    #[diesel(sql_type = Nullable<Integer>)]
    initiated_artist_id: Option<i32>,
    #[diesel(sql_type = Nullable<Text>)]
    initiated_artist_name: Option<String>,
    #[diesel(sql_type = Nullable<Integer>)]
    matched_track_id: Option<i32>,
    #[diesel(sql_type = Nullable<Text>)]
    matched_track_name: Option<String>,
    #[diesel(sql_type = Nullable<Integer>)]
    matched_artist_id: Option<i32>,
    #[diesel(sql_type = Nullable<Text>)]
    matched_artist_name: Option<String>,
    #[diesel(sql_type = Nullable<Integer>)]
    initiated_reaction: Option<i32>,
    #[diesel(sql_type = Nullable<Integer>)]
    matched_reaction: Option<i32>,
    #[diesel(sql_type = Timestamp)]
    swap_initiated_at: NaiveDateTime,
    #[diesel(sql_type = Nullable<Timestamp>)]
    initiated_track_at: Option<NaiveDateTime>,
    #[diesel(sql_type = Nullable<Timestamp>)]
    matched_track_at: Option<NaiveDateTime>,
    #[diesel(sql_type = Nullable<Timestamp>)]
    initiated_reaction_at: Option<NaiveDateTime>,
    #[diesel(sql_type = Nullable<Timestamp>)]
    matched_reaction_at: Option<NaiveDateTime>,
}

impl From<SongSwapListRow> for SongSwapView {
    fn from(row: SongSwapListRow) -> Self {
        SongSwapView {
            id: row.id,
            initiated_user_id: row.initiated_user_id,
            initiated_user: row.initiated_user,
            matched_user_id: row.matched_user_id,
            matched_user: row.matched_user,
            initiated_track_id: row.initiated_track_id,
            initiated_track_name: row.initiated_track_name,
            initiated_artist_id: row.initiated_artist_id,
            initiated_artist_name: row.initiated_artist_name,
            matched_track_id: row.matched_track_id,
            matched_track_name: row.matched_track_name,
            matched_artist_id: row.matched_artist_id,
            matched_artist_name: row.matched_artist_name,
            initiated_reaction: row.initiated_reaction,
            matched_reaction: row.matched_reaction,
            swap_initiated_timestamp: row.swap_initiated_at,
            initiated_track_timestamp: row.initiated_track_at,
            matched_track_timestamp: row.matched_track_at,
            initiated_reaction_timestamp: row.initiated_reaction_at,
            matched_reaction_timestamp: row.matched_reaction_at,
        }
    }
}

/// Repository for the two-party song swap game.
#[derive(Clone)]
pub struct SongSwapRepository {
    pool: DbPool,
}

impl SongSwapRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn find_by_id(&self, swap_id: i32) -> Result<Option<SongSwap>, SocialRepoError> {
        let mut conn = self.pool.get()?;

        let row = song_swaps::table
            .filter(song_swaps::id.eq(swap_id))
            .select(SongSwapRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(SongSwap::from))
    }

    /// Start a swap. When no counterpart is named, one is drawn at random from
    /// users who logged in within the last 7 days (the initiator excluded; the
    /// system account never qualifies since it never logs in). The swap row
    /// and its announcement broadcast commit together.
    ///
    /// Returns the new swap id and the matched user id.
    pub fn initiate(
        &self,
        user_id: i32,
        matched_user_id: Option<i32>,
    ) -> Result<(i32, i32), SocialRepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, SocialRepoError, _>(|conn| {
            let matched_id = match matched_user_id {
                Some(id) => id,
                None => draw_swap_match(conn, user_id)?.ok_or_else(|| {
                    SocialRepoError::Validation(
                        "could not locate a matched user for song swap".into(),
                    )
                })?,
            };
            if matched_id == user_id {
                return Err(SocialRepoError::Validation(
                    "a user cannot swap songs with themselves".into(),
                ));
            }

            let initiator: String = users::table
                .filter(users::id.eq(user_id))
                .select(users::username)
                .first(conn)?;
            let matched: Option<String> = users::table
                .filter(users::id.eq(matched_id))
                .select(users::username)
                .first(conn)
                .optional()?;
            let matched = matched.ok_or_else(|| {
                SocialRepoError::NotFound(format!("matched user id {matched_id}"))
            })?;

            diesel::insert_into(song_swaps::table)
                .values((
                    song_swaps::initiated_user_id.eq(user_id),
                    song_swaps::matched_user_id.eq(matched_id),
                ))
                .execute(conn)?;
            let swap_id: i32 = diesel::select(last_insert_rowid()).get_result(conn)?;

            insert_system_broadcast(
                conn,
                "New Song Swap",
                &format!("{initiator} has initiated a Song Swap with {matched}!"),
                RelatedKind::SongSwap,
                swap_id,
            )?;

            Ok((swap_id, matched_id))
        })
    }

    /// Record the track a party is sending. The caller's role is inferred from
    /// the swap's stored user ids; resubmission overwrites the earlier pick.
    pub fn submit_track(
        &self,
        swap_id: i32,
        user_id: i32,
        track_id: i32,
    ) -> Result<(), SocialRepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, SocialRepoError, _>(|conn| {
            let swap = load_swap(conn, swap_id)?;
            let role = swap.role_of(user_id).ok_or_else(|| {
                SocialRepoError::Validation("user is not a party to this song swap".into())
            })?;

            let now = diesel::dsl::now;
            match role {
                SwapRole::Initiated => {
                    diesel::update(song_swaps::table.filter(song_swaps::id.eq(swap_id)))
                        .set((
                            song_swaps::initiated_track_id.eq(track_id),
                            song_swaps::initiated_track_at.eq(now),
                        ))
                        .execute(conn)?;
                }
                SwapRole::Matched => {
                    diesel::update(song_swaps::table.filter(song_swaps::id.eq(swap_id)))
                        .set((
                            song_swaps::matched_track_id.eq(track_id),
                            song_swaps::matched_track_at.eq(now),
                        ))
                        .execute(conn)?;
                }
            }
            Ok(())
        })
    }

    /// Record a party's 1-5 reaction score and announce it. With `auto_title`
    /// the announcement title is a random canned phrase for the score tier;
    /// otherwise a plain "Song Swap Reaction". The update and the broadcast
    /// commit together.
    pub fn submit_reaction(
        &self,
        swap_id: i32,
        user_id: i32,
        score: i32,
        auto_title: bool,
    ) -> Result<(), SocialRepoError> {
        if !(1..=5).contains(&score) {
            return Err(SocialRepoError::Validation(
                "reaction score must be between 1 and 5".into(),
            ));
        }

        let mut conn = self.pool.get()?;

        conn.transaction::<_, SocialRepoError, _>(|conn| {
            let swap = load_swap(conn, swap_id)?;
            let role = swap.role_of(user_id).ok_or_else(|| {
                SocialRepoError::Validation("user is not a party to this song swap".into())
            })?;

            let now = diesel::dsl::now;
            let track_id = match role {
                SwapRole::Initiated => {
                    diesel::update(song_swaps::table.filter(song_swaps::id.eq(swap_id)))
                        .set((
                            song_swaps::initiated_reaction.eq(score),
                            song_swaps::initiated_reaction_at.eq(now),
                        ))
                        .execute(conn)?;
                    swap.initiated_track_id
                }
                SwapRole::Matched => {
                    diesel::update(song_swaps::table.filter(song_swaps::id.eq(swap_id)))
                        .set((
                            song_swaps::matched_reaction.eq(score),
                            song_swaps::matched_reaction_at.eq(now),
                        ))
                        .execute(conn)?;
                    swap.matched_track_id
                }
            };

            let username: String = users::table
                .filter(users::id.eq(user_id))
                .select(users::username)
                .first(conn)?;
            let track_name = match track_id {
                Some(id) => crate::db::schema::tracks::table
                    .filter(crate::db::schema::tracks::id.eq(id))
                    .select(crate::db::schema::tracks::name)
                    .first(conn)
                    .optional()?
                    .unwrap_or_else(|| "unknown".to_string()),
                None => "unknown".to_string(),
            };

            let title = if auto_title {
                reaction_phrase(conn, score)?
            } else {
                "Song Swap Reaction".to_string()
            };

            insert_system_broadcast(
                conn,
                &title,
                &format!(
                    "{username} has given their Song Swap track, {track_name}, a score of {score}!"
                ),
                RelatedKind::SongSwap,
                swap_id,
            )?;

            Ok(())
        })
    }

    /// List swaps with both parties' user, track, and artist names joined in,
    /// newest first. Optionally scoped to one swap or one participant.
    pub fn list(
        &self,
        user_id: Option<i32>,
        swap_id: Option<i32>,
        limit: i64,
    ) -> Result<Vec<SongSwapView>, SocialRepoError> {
        let mut conn = self.pool.get()?;

        let mut sql = String::from(
            "SELECT s.id AS id, \
                    iu.id AS initiated_user_id, iu.username AS initiated_user, \
                    mu.id AS matched_user_id, mu.username AS matched_user, \
                    it.id AS initiated_track_id, it.name AS initiated_track_name, \
                    ia.id AS initiated_artist_id, ia.name AS initiated_artist_name, \
                    mt.id AS matched_track_id, mt.name AS matched_track_name, \
                    ma.id AS matched_artist_id, ma.name AS matched_artist_name, \
                    s.initiated_reaction AS initiated_reaction, \
                    s.matched_reaction AS matched_reaction, \
                    s.initiated_at AS swap_initiated_at, \
                    s.initiated_track_at AS initiated_track_at, \
                    s.matched_track_at AS matched_track_at, \
                    s.initiated_reaction_at AS initiated_reaction_at, \
                    s.matched_reaction_at AS matched_reaction_at \
             FROM song_swaps s \
             INNER JOIN users iu ON s.initiated_user_id = iu.id \
             INNER JOIN users mu ON s.matched_user_id = mu.id \
             LEFT JOIN tracks it ON s.initiated_track_id = it.id \
             LEFT JOIN artists ia ON it.artist_id = ia.id \
             LEFT JOIN tracks mt ON s.matched_track_id = mt.id \
             LEFT JOIN artists ma ON mt.artist_id = ma.id \
             WHERE 1=1 ",
        );
        if let Some(swap) = swap_id {
            sql.push_str(&format!("AND s.id = {swap} "));
        }
        if let Some(user) = user_id {
            sql.push_str(&format!("AND (iu.id = {user} OR mu.id = {user}) "));
        }
        sql.push_str("ORDER BY s.id DESC LIMIT ?");

        let rows: Vec<SongSwapListRow> = diesel::sql_query(sql)
            .bind::<BigInt, _>(limit)
            .load(&mut conn)?;

        Ok(rows.into_iter().map(SongSwapView::from).collect())
    }
}

fn load_swap(conn: &mut SqliteConnection, swap_id: i32) -> Result<SongSwap, SocialRepoError> {
    let row = song_swaps::table
        .filter(song_swaps::id.eq(swap_id))
        .select(SongSwapRow::as_select())
        .first(conn)
        .optional()?;
    row.map(SongSwap::from)
        .ok_or_else(|| SocialRepoError::NotFound(format!("song swap id {swap_id}")))
}

/// Draw a random counterpart for a swap: any user other than the initiator
/// who has logged in within the last 7 days.
fn draw_swap_match(conn: &mut SqliteConnection, exclude_user_id: i32) -> QueryResult<Option<i32>> {
    users::table
        .filter(users::id.ne(exclude_user_id))
        .filter(diesel::dsl::sql::<diesel::sql_types::Bool>(
            "last_login > datetime('now', '-7 days')",
        ))
        .order(diesel::dsl::sql::<diesel::sql_types::Bool>("RANDOM()"))
        .select(users::id)
        .first(conn)
        .optional()
}

/// A random canned phrase for a reaction score tier. The fallback only fires
/// if the seed data is missing.
fn reaction_phrase(conn: &mut SqliteConnection, score: i32) -> QueryResult<String> {
    let phrase: Option<String> = swap_reactions::table
        .filter(swap_reactions::score.eq(score))
        .order(diesel::dsl::sql::<diesel::sql_types::Bool>("RANDOM()"))
        .select(swap_reactions::title)
        .first(conn)
        .optional()?;
    Ok(phrase.unwrap_or_else(|| "That's nice, dear.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::REACTION_PHRASES;
    use crate::db::repository::{ArtistRepository, NewUser, TrackRepository, UserRepository};
    use crate::db::test_pool;
    use crate::models::user::SWAG_STARTING_BALANCE;

    fn make_user(pool: &DbPool, username: &str) -> i32 {
        let repo = UserRepository::new(pool.clone());
        let email = format!("{username}@example.edu");
        repo.create(&NewUser::new(username, "Test", "User", &email, "h", false))
            .unwrap()
            .id
    }

    fn make_track(pool: &DbPool, artist: &str, track: &str, url: &str) -> i32 {
        let artists = ArtistRepository::new(pool.clone());
        let tracks = TrackRepository::new(pool.clone());
        let artist = artists.find_or_create(artist, None).unwrap();
        tracks
            .find_or_create(track, artist.id, None, Some(url))
            .unwrap()
            .id
    }

    #[test]
    fn test_feed_resolves_related_names_and_counts_likes() {
        let pool = test_pool();
        let broadcasts = BroadcastRepository::new(pool.clone());
        let likes = LikeRepository::new(pool.clone());

        let alice = make_user(&pool, "alice");
        let bob = make_user(&pool, "bob");
        let track_id = make_track(&pool, "Men I Trust", "Show Me How", "https://last.fm/t/1");

        let general_id = broadcasts
            .create(alice, "hello", "first post", RelatedKind::General, 0)
            .unwrap();
        let track_post_id = broadcasts
            .create(alice, "earworm", "on repeat", RelatedKind::Track, track_id)
            .unwrap();
        likes.create(bob, RelatedKind::Broadcast, track_post_id).unwrap();

        let feed = broadcasts.feed(Some(bob), None, None, 50).unwrap();
        assert_eq!(feed.len(), 2);
        // Newest first; ids break the tie within one timestamp.
        assert_eq!(feed[0].id, track_post_id);
        assert_eq!(feed[1].id, general_id);

        let track_post = &feed[0];
        assert_eq!(track_post.user, "alice");
        assert_eq!(track_post.kind, "Track");
        assert_eq!(track_post.relatedto, "Show Me How");
        assert_eq!(track_post.track_url, "https://last.fm/t/1");
        assert_eq!(track_post.likes, 1);
        assert!(track_post.liked_by_viewer);

        let general = &feed[1];
        assert_eq!(general.kind, "General");
        assert_eq!(general.relatedto, "");
        assert_eq!(general.track_url, "");
        assert_eq!(general.likes, 0);
        assert!(!general.liked_by_viewer);

        // Alice never liked anything.
        let feed = broadcasts.feed(Some(alice), None, None, 50).unwrap();
        assert!(feed.iter().all(|b| !b.liked_by_viewer));
    }

    #[test]
    fn test_feed_filters_author_kind_and_deleted() {
        let pool = test_pool();
        let broadcasts = BroadcastRepository::new(pool.clone());

        let alice = make_user(&pool, "alice");
        let bob = make_user(&pool, "bob");

        broadcasts
            .create(alice, "a1", "", RelatedKind::General, 0)
            .unwrap();
        let doomed = broadcasts
            .create(alice, "a2", "", RelatedKind::General, 0)
            .unwrap();
        broadcasts
            .create(bob, "b1", "", RelatedKind::General, 0)
            .unwrap();

        broadcasts.delete(doomed).unwrap();
        assert!(matches!(
            broadcasts.delete(9999),
            Err(SocialRepoError::NotFound(_))
        ));

        let alices = broadcasts.feed(None, Some(alice), None, 50).unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].title, "a1");

        let generals = broadcasts
            .feed(None, None, Some(RelatedKind::General), 50)
            .unwrap();
        assert_eq!(generals.len(), 2);

        let tracks_only = broadcasts
            .feed(None, None, Some(RelatedKind::Track), 50)
            .unwrap();
        assert!(tracks_only.is_empty());
    }

    #[test]
    fn test_liking_a_broadcast_awards_the_author_swag() {
        let pool = test_pool();
        let users_repo = UserRepository::new(pool.clone());
        let broadcasts = BroadcastRepository::new(pool.clone());
        let likes = LikeRepository::new(pool.clone());

        let alice = make_user(&pool, "alice");
        let bob = make_user(&pool, "bob");
        let post = broadcasts
            .create(alice, "hi", "", RelatedKind::General, 0)
            .unwrap();

        likes.create(bob, RelatedKind::Broadcast, post).unwrap();
        let alice_swag = users_repo.find_by_id(alice).unwrap().unwrap().swag;
        assert_eq!(alice_swag, SWAG_STARTING_BALANCE + SWAG_LIKED_BROADCAST);

        // Self-likes earn nothing; likes of non-broadcast kinds earn nothing.
        likes.create(alice, RelatedKind::Broadcast, post).unwrap();
        likes.create(bob, RelatedKind::Artist, 1).unwrap();
        let alice_swag = users_repo.find_by_id(alice).unwrap().unwrap().swag;
        assert_eq!(alice_swag, SWAG_STARTING_BALANCE + SWAG_LIKED_BROADCAST);
    }

    #[test]
    fn test_duplicate_like_conflicts_and_undo_removes() {
        let pool = test_pool();
        let likes = LikeRepository::new(pool.clone());
        let user = make_user(&pool, "liker");

        let like_id = likes.create(user, RelatedKind::Artist, 7).unwrap();
        assert_eq!(likes.find(user, RelatedKind::Artist, 7).unwrap(), Some(like_id));

        assert!(matches!(
            likes.create(user, RelatedKind::Artist, 7),
            Err(SocialRepoError::Conflict(_))
        ));

        likes.remove(user, RelatedKind::Artist, 7).unwrap();
        assert_eq!(likes.find(user, RelatedKind::Artist, 7).unwrap(), None);
        assert!(matches!(
            likes.remove(user, RelatedKind::Artist, 7),
            Err(SocialRepoError::NotFound(_))
        ));
    }

    #[test]
    fn test_unique_index_loser_sees_conflict() {
        let pool = test_pool();
        let user = make_user(&pool, "racer");
        let mut conn = pool.get().unwrap();

        // A concurrent writer bypasses the in-transaction existence check and
        // lands on the unique index instead.
        let insert = |conn: &mut SqliteConnection| {
            diesel::insert_into(likes::table)
                .values((
                    likes::user_id.eq(user),
                    likes::related_type_id.eq(RelatedKind::Artist.id()),
                    likes::related_id.eq(7),
                ))
                .execute(conn)
        };
        insert(&mut conn).unwrap();
        let err = insert(&mut conn).unwrap_err();

        assert!(matches!(
            unique_conflict("like already exists")(err),
            SocialRepoError::Conflict(_)
        ));
    }

    #[test]
    fn test_follow_lifecycle() {
        let pool = test_pool();
        let follows = FollowingRepository::new(pool.clone());
        let alice = make_user(&pool, "alice");
        let bob = make_user(&pool, "bob");

        assert!(matches!(
            follows.follow(alice, alice),
            Err(SocialRepoError::Validation(_))
        ));

        follows.follow(alice, bob).unwrap();
        assert!(matches!(
            follows.follow(alice, bob),
            Err(SocialRepoError::Conflict(_))
        ));

        let bobs_followers = follows.followers(bob, 50).unwrap();
        assert_eq!(bobs_followers.len(), 1);
        assert_eq!(bobs_followers[0].follower, "alice");

        let alice_following = follows.following(alice, 50).unwrap();
        assert_eq!(alice_following.len(), 1);
        assert_eq!(alice_following[0].following, "bob");

        // Following is directional.
        assert!(follows.followers(alice, 50).unwrap().is_empty());

        follows.unfollow(alice, bob).unwrap();
        assert!(matches!(
            follows.unfollow(alice, bob),
            Err(SocialRepoError::NotFound(_))
        ));
    }

    #[test]
    fn test_conversations_and_thread() {
        let pool = test_pool();
        let messages = MessageRepository::new(pool.clone());
        let alice = make_user(&pool, "alice");
        let bob = make_user(&pool, "bob");
        let carol = make_user(&pool, "carol");

        messages.send(alice, bob, "hey bob").unwrap();
        messages.send(bob, alice, "hey alice").unwrap();
        messages.send(bob, alice, "you there?").unwrap();
        messages.send(carol, alice, "unrelated").unwrap();

        let convos = messages.conversations(alice, 50).unwrap();
        assert_eq!(convos.len(), 2);
        let with_bob = convos.iter().find(|c| c.conversant == "bob").unwrap();
        assert_eq!(with_bob.messagecount, 3);
        assert_eq!(with_bob.unreadcount, 2);

        // Oldest first, carol's message excluded.
        let thread = messages.thread(alice, bob, 50).unwrap();
        assert_eq!(thread.len(), 3);
        assert_eq!(thread[0].message, "hey bob");
        assert_eq!(thread[0].direction, "Outgoing");
        assert_eq!(thread[2].message, "you there?");
        assert_eq!(thread[2].direction, "Incoming");

        // Limiting keeps the newest messages.
        let recent = messages.thread(alice, bob, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "hey alice");

        let marked = messages.mark_read(bob, alice).unwrap();
        assert_eq!(marked, 2);
        let convos = messages.conversations(alice, 50).unwrap();
        let with_bob = convos.iter().find(|c| c.conversant == "bob").unwrap();
        assert_eq!(with_bob.unreadcount, 0);
    }

    #[test]
    fn test_initiate_swap_announces_and_matches() {
        let pool = test_pool();
        let users_repo = UserRepository::new(pool.clone());
        let swaps = SongSwapRepository::new(pool.clone());
        let broadcasts = BroadcastRepository::new(pool.clone());

        let alice = make_user(&pool, "alice");
        let bob = make_user(&pool, "bob");

        // Nobody has logged in recently, so a random draw finds no one.
        assert!(matches!(
            swaps.initiate(alice, None),
            Err(SocialRepoError::Validation(_))
        ));

        users_repo.touch_last_login(bob).unwrap();
        let (swap_id, matched_id) = swaps.initiate(alice, None).unwrap();
        assert_eq!(matched_id, bob);

        let swap = swaps.find_by_id(swap_id).unwrap().unwrap();
        assert_eq!(swap.initiated_user_id, alice);
        assert_eq!(swap.matched_user_id, bob);
        assert!(swap.initiated_track_id.is_none());

        // The announcement is authored by the system account.
        let feed = broadcasts
            .feed(None, None, Some(RelatedKind::SongSwap), 50)
            .unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].user, "broadcastr");
        assert_eq!(feed[0].title, "New Song Swap");
        assert_eq!(feed[0].relatedid, swap_id);

        // An explicit counterpart skips the draw.
        let (_, matched_id) = swaps.initiate(bob, Some(alice)).unwrap();
        assert_eq!(matched_id, alice);
        assert!(matches!(
            swaps.initiate(bob, Some(bob)),
            Err(SocialRepoError::Validation(_))
        ));
    }

    #[test]
    fn test_submit_track_is_role_guarded_and_overwrites() {
        let pool = test_pool();
        let swaps = SongSwapRepository::new(pool.clone());

        let alice = make_user(&pool, "alice");
        let bob = make_user(&pool, "bob");
        let carol = make_user(&pool, "carol");
        let first = make_track(&pool, "Khruangbin", "Maria También", "https://last.fm/t/1");
        let second = make_track(&pool, "Khruangbin", "Time (You and I)", "https://last.fm/t/2");

        let (swap_id, _) = swaps.initiate(alice, Some(bob)).unwrap();

        assert!(matches!(
            swaps.submit_track(swap_id, carol, first),
            Err(SocialRepoError::Validation(_))
        ));
        assert!(matches!(
            swaps.submit_track(9999, alice, first),
            Err(SocialRepoError::NotFound(_))
        ));

        swaps.submit_track(swap_id, alice, first).unwrap();
        swaps.submit_track(swap_id, bob, second).unwrap();
        let swap = swaps.find_by_id(swap_id).unwrap().unwrap();
        assert_eq!(swap.initiated_track_id, Some(first));
        assert_eq!(swap.matched_track_id, Some(second));
        assert!(swap.initiated_track_at.is_some());

        // Resubmission is last-write-wins.
        swaps.submit_track(swap_id, alice, second).unwrap();
        let swap = swaps.find_by_id(swap_id).unwrap().unwrap();
        assert_eq!(swap.initiated_track_id, Some(second));
    }

    #[test]
    fn test_submit_reaction_validates_and_announces() {
        let pool = test_pool();
        let swaps = SongSwapRepository::new(pool.clone());
        let broadcasts = BroadcastRepository::new(pool.clone());

        let alice = make_user(&pool, "alice");
        let bob = make_user(&pool, "bob");
        let track = make_track(&pool, "Unknown Mortal Orchestra", "Hunnybee", "https://last.fm/t/3");

        let (swap_id, _) = swaps.initiate(alice, Some(bob)).unwrap();
        swaps.submit_track(swap_id, alice, track).unwrap();

        assert!(matches!(
            swaps.submit_reaction(swap_id, alice, 0, true),
            Err(SocialRepoError::Validation(_))
        ));
        assert!(matches!(
            swaps.submit_reaction(swap_id, alice, 6, true),
            Err(SocialRepoError::Validation(_))
        ));

        swaps.submit_reaction(swap_id, alice, 5, true).unwrap();
        let swap = swaps.find_by_id(swap_id).unwrap().unwrap();
        assert_eq!(swap.initiated_reaction, Some(5));
        assert!(swap.initiated_reaction_at.is_some());
        assert_eq!(swap.matched_reaction, None);

        // The fixed title variant, for the matched party with no track yet.
        swaps.submit_reaction(swap_id, bob, 2, false).unwrap();

        let feed = broadcasts
            .feed(None, None, Some(RelatedKind::SongSwap), 50)
            .unwrap();
        // Initiation announcement plus two reaction announcements.
        assert_eq!(feed.len(), 3);
        assert!(feed.iter().all(|b| b.user == "broadcastr"));
        let fixed = feed
            .iter()
            .find(|b| b.title == "Song Swap Reaction")
            .unwrap();
        assert!(fixed.body.contains("bob"));
        assert!(fixed.body.contains("unknown"));
        assert!(fixed.body.contains("score of 2"));
        let auto = feed
            .iter()
            .find(|b| b.body.contains("alice has given"))
            .unwrap();
        assert!(auto.body.contains("Hunnybee"));
        // The drawn title comes from the score-5 tier of the phrase bank,
        // never another tier and never the missing-seed fallback.
        let tier5 = REACTION_PHRASES
            .iter()
            .find(|(score, _)| *score == 5)
            .map(|(_, titles)| *titles)
            .unwrap();
        assert!(tier5.contains(&auto.title.as_str()));
    }

    #[test]
    fn test_list_swaps_joins_names_newest_first() {
        let pool = test_pool();
        let swaps = SongSwapRepository::new(pool.clone());

        let alice = make_user(&pool, "alice");
        let bob = make_user(&pool, "bob");
        let carol = make_user(&pool, "carol");
        let track = make_track(&pool, "Crumb", "Locket", "https://last.fm/t/4");

        let (first, _) = swaps.initiate(alice, Some(bob)).unwrap();
        let (second, _) = swaps.initiate(carol, Some(alice)).unwrap();
        swaps.submit_track(first, alice, track).unwrap();

        let all = swaps.list(None, None, 50).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second);
        assert_eq!(all[1].id, first);

        let view = &all[1];
        assert_eq!(view.initiated_user, "alice");
        assert_eq!(view.matched_user, "bob");
        assert_eq!(view.initiated_track_name.as_deref(), Some("Locket"));
        assert_eq!(view.initiated_artist_name.as_deref(), Some("Crumb"));
        assert!(view.matched_track_name.is_none());

        let bobs = swaps.list(Some(bob), None, 50).unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].id, first);

        let one = swaps.list(None, Some(second), 50).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].initiated_user, "carol");
    }
}
