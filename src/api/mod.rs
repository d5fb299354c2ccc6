//! HTTP API: application state, router, error mapping, and handlers.

pub mod error;
pub mod handlers;

pub use error::ApiError;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::DbPool;
use crate::db::repository::{
    ArtistRepository, ConfigRepository, TopDataRepository, UserRepository,
};
use crate::db::social::{
    BroadcastRepository, FollowingRepository, LikeRepository, MessageRepository,
    SongSwapRepository,
};
use crate::lastfm::{API_KEY_CONFIG_KEY, LastFmClient, LastFmError, ListeningRefresher};

/// Application state shared across all handlers. Repositories are thin
/// handles around the same pool, so cloning the state is cheap.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub users: UserRepository,
    pub config: ConfigRepository,
    pub artists: ArtistRepository,
    pub tops: TopDataRepository,
    pub broadcasts: BroadcastRepository,
    pub likes: LikeRepository,
    pub follows: FollowingRepository,
    pub messages: MessageRepository,
    pub swaps: SongSwapRepository,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            config: ConfigRepository::new(pool.clone()),
            artists: ArtistRepository::new(pool.clone()),
            tops: TopDataRepository::new(pool.clone()),
            broadcasts: BroadcastRepository::new(pool.clone()),
            likes: LikeRepository::new(pool.clone()),
            follows: FollowingRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            swaps: SongSwapRepository::new(pool.clone()),
            pool,
        }
    }

    /// Build a listening refresher from the stored API key. Fails when the
    /// key has not been configured yet.
    pub fn refresher(&self) -> Result<ListeningRefresher, ApiError> {
        let api_key = self
            .config
            .get(API_KEY_CONFIG_KEY)?
            .ok_or(LastFmError::MissingApiKey)?;
        Ok(ListeningRefresher::new(
            LastFmClient::new(api_key),
            self.pool.clone(),
        ))
    }
}

/// Create the router with all API routes.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Song swaps
        .route("/initiate-song-swap", post(handlers::song_swaps::initiate_song_swap))
        .route("/add-song-swap-track", post(handlers::song_swaps::add_song_swap_track))
        .route(
            "/add-song-swap-reaction",
            post(handlers::song_swaps::add_song_swap_reaction),
        )
        .route("/get-song-swaps", get(handlers::song_swaps::get_song_swaps))
        // Likes
        .route("/create-like", post(handlers::likes::create_like))
        .route("/undo-like", post(handlers::likes::undo_like))
        .route("/get-likes", get(handlers::likes::get_likes))
        // Broadcasts
        .route("/create-broadcast", post(handlers::broadcasts::create_broadcast))
        .route("/delete-broadcast", post(handlers::broadcasts::delete_broadcast))
        .route("/get-broadcasts", get(handlers::broadcasts::get_broadcasts))
        .route(
            "/user/top-broadcasted-tracks",
            get(handlers::broadcasts::top_broadcasted_tracks),
        )
        // Following
        .route("/user/follow", post(handlers::following::follow))
        .route("/user/unfollow", post(handlers::following::unfollow))
        .route("/user/followers", get(handlers::following::followers))
        .route("/user/following", get(handlers::following::following))
        // Direct messages
        .route("/send-direct-message", post(handlers::messages::send_direct_message))
        .route("/user/conversations", get(handlers::messages::conversations))
        .route("/user/direct-messages", get(handlers::messages::direct_messages))
        .route("/mark-messages-read", post(handlers::messages::mark_messages_read))
        // Profiles
        .route("/user/profile", get(handlers::profiles::profile))
        .route("/user/create-profile", post(handlers::profiles::create_profile))
        .route("/user/login", post(handlers::profiles::login))
        .route("/user/reset-password", post(handlers::profiles::reset_password))
        .route("/user/add-swag", post(handlers::profiles::add_swag))
        // Listening data
        .route("/user/top-artists", get(handlers::listening::top_artists))
        .route("/user/top-albums", get(handlers::listening::top_albums))
        .route("/user/top-tracks", get(handlers::listening::top_tracks))
        .route("/artist/listens", get(handlers::listening::listens))
        .route("/artist/top-listeners", get(handlers::listening::top_listeners))
        .route("/artist/by-id", get(handlers::listening::artist_by_id));

    Router::new()
        .nest("/api", api_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
