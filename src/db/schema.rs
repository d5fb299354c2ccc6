//! Database schema definitions for Diesel.

diesel::table! {
    users (id) {
        id -> Integer,
        username -> Text,
        first_name -> Text,
        last_name -> Text,
        email -> Text,
        password_hash -> Text,
        bootstrapped -> Bool,
        admin -> Bool,
        swag -> Integer,
        image_url -> Nullable<Text>,
        last_fm_url -> Nullable<Text>,
        last_login -> Nullable<Timestamp>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    artists (id) {
        id -> Integer,
        name -> Text,
        musicbrainz_id -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    albums (id) {
        id -> Integer,
        name -> Text,
        artist_id -> Integer,
        musicbrainz_id -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    tracks (id) {
        id -> Integer,
        name -> Text,
        artist_id -> Integer,
        musicbrainz_id -> Nullable<Text>,
        track_url -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    periods (id) {
        id -> Integer,
        name -> Text,
    }
}

diesel::table! {
    top_artists (id) {
        id -> Integer,
        user_id -> Integer,
        artist_id -> Integer,
        period_id -> Integer,
        play_count -> Integer,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    top_albums (id) {
        id -> Integer,
        user_id -> Integer,
        album_id -> Integer,
        period_id -> Integer,
        play_count -> Integer,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    top_tracks (id) {
        id -> Integer,
        user_id -> Integer,
        track_id -> Integer,
        period_id -> Integer,
        play_count -> Integer,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    broadcasts (id) {
        id -> Integer,
        user_id -> Integer,
        title -> Text,
        body -> Text,
        related_type_id -> Integer,
        related_id -> Integer,
        deleted -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    likes (id) {
        id -> Integer,
        user_id -> Integer,
        related_type_id -> Integer,
        related_id -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    followings (id) {
        id -> Integer,
        follower_id -> Integer,
        followee_id -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    direct_messages (id) {
        id -> Integer,
        sender_id -> Integer,
        recipient_id -> Integer,
        body -> Text,
        is_read -> Bool,
        sent_at -> Timestamp,
    }
}

diesel::table! {
    song_swaps (id) {
        id -> Integer,
        initiated_user_id -> Integer,
        matched_user_id -> Integer,
        initiated_at -> Timestamp,
        initiated_track_id -> Nullable<Integer>,
        initiated_track_at -> Nullable<Timestamp>,
        matched_track_id -> Nullable<Integer>,
        matched_track_at -> Nullable<Timestamp>,
        initiated_reaction -> Nullable<Integer>,
        initiated_reaction_at -> Nullable<Timestamp>,
        matched_reaction -> Nullable<Integer>,
        matched_reaction_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    swap_reactions (id) {
        id -> Integer,
        score -> Integer,
        title -> Text,
    }
}

diesel::table! {
    related_types (id) {
        id -> Integer,
        description -> Text,
        db_table -> Nullable<Text>,
        db_id_column -> Nullable<Text>,
        db_name_column -> Nullable<Text>,
    }
}

diesel::table! {
    config (key) {
        key -> Text,
        value -> Text,
    }
}

// Define foreign key relationships
diesel::joinable!(albums -> artists (artist_id));
diesel::joinable!(tracks -> artists (artist_id));
diesel::joinable!(top_artists -> users (user_id));
diesel::joinable!(top_artists -> artists (artist_id));
diesel::joinable!(top_artists -> periods (period_id));
diesel::joinable!(top_albums -> users (user_id));
diesel::joinable!(top_albums -> albums (album_id));
diesel::joinable!(top_albums -> periods (period_id));
diesel::joinable!(top_tracks -> users (user_id));
diesel::joinable!(top_tracks -> tracks (track_id));
diesel::joinable!(top_tracks -> periods (period_id));
diesel::joinable!(broadcasts -> users (user_id));
diesel::joinable!(likes -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    artists,
    albums,
    tracks,
    periods,
    top_artists,
    top_albums,
    top_tracks,
    broadcasts,
    likes,
    followings,
    direct_messages,
    song_swaps,
    swap_reactions,
    related_types,
    config,
);
