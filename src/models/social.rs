//! Social domain models: the related-kind association, song swap roles,
//! and the JSON views returned by the social API endpoints.

use chrono::NaiveDateTime;
use serde::Serialize;

/// The closed set of entity categories a like or broadcast can point at.
///
/// A `(related_type_id, related_id)` pair stored on a like or broadcast is only
/// meaningful in combination: the kind selects the target table, the id selects
/// the row. Kinds without a concrete target (General, Following, the top-data
/// aggregates, SongSwap) are valid link categories but contribute no display
/// name to the broadcast feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedKind {
    General,
    Album,
    Artist,
    Broadcast,
    Following,
    Track,
    User,
    TopAlbum,
    TopArtist,
    TopTrack,
    SongSwap,
}

/// Concrete table/column triple backing a related kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelatedTarget {
    pub table: &'static str,
    pub id_column: &'static str,
    pub name_column: &'static str,
}

impl RelatedKind {
    /// All kinds, ordered by id. Drives the feed UNION synthesis and the
    /// `related_types` seed.
    pub const ALL: [RelatedKind; 11] = [
        RelatedKind::General,
        RelatedKind::Album,
        RelatedKind::Artist,
        RelatedKind::Broadcast,
        RelatedKind::Following,
        RelatedKind::Track,
        RelatedKind::User,
        RelatedKind::TopAlbum,
        RelatedKind::TopArtist,
        RelatedKind::TopTrack,
        RelatedKind::SongSwap,
    ];

    /// Stable numeric id stored in `related_type_id` columns.
    pub fn id(self) -> i32 {
        match self {
            RelatedKind::General => 1,
            RelatedKind::Album => 2,
            RelatedKind::Artist => 3,
            RelatedKind::Broadcast => 4,
            RelatedKind::Following => 5,
            RelatedKind::Track => 6,
            RelatedKind::User => 7,
            RelatedKind::TopAlbum => 8,
            RelatedKind::TopArtist => 9,
            RelatedKind::TopTrack => 10,
            RelatedKind::SongSwap => 11,
        }
    }

    pub fn from_id(id: i32) -> Option<RelatedKind> {
        RelatedKind::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Resolve a kind from its symbolic description, case-insensitively.
    /// `None` is a validation failure, never a silent fallback.
    pub fn from_name(name: &str) -> Option<RelatedKind> {
        RelatedKind::ALL
            .into_iter()
            .find(|kind| kind.description().eq_ignore_ascii_case(name.trim()))
    }

    /// The symbolic description exposed in API responses and filters.
    pub fn description(self) -> &'static str {
        match self {
            RelatedKind::General => "General",
            RelatedKind::Album => "Album",
            RelatedKind::Artist => "Artist",
            RelatedKind::Broadcast => "Broadcast",
            RelatedKind::Following => "Following",
            RelatedKind::Track => "Track",
            RelatedKind::User => "User",
            RelatedKind::TopAlbum => "TopAlbum",
            RelatedKind::TopArtist => "TopArtist",
            RelatedKind::TopTrack => "TopTrack",
            RelatedKind::SongSwap => "SongSwap",
        }
    }

    /// The concrete table this kind points at, when it has one.
    pub fn target(self) -> Option<RelatedTarget> {
        match self {
            RelatedKind::Album => Some(RelatedTarget {
                table: "albums",
                id_column: "id",
                name_column: "name",
            }),
            RelatedKind::Artist => Some(RelatedTarget {
                table: "artists",
                id_column: "id",
                name_column: "name",
            }),
            RelatedKind::Broadcast => Some(RelatedTarget {
                table: "broadcasts",
                id_column: "id",
                name_column: "title",
            }),
            RelatedKind::Track => Some(RelatedTarget {
                table: "tracks",
                id_column: "id",
                name_column: "name",
            }),
            RelatedKind::User => Some(RelatedTarget {
                table: "users",
                id_column: "id",
                name_column: "username",
            }),
            RelatedKind::General
            | RelatedKind::Following
            | RelatedKind::TopAlbum
            | RelatedKind::TopArtist
            | RelatedKind::TopTrack
            | RelatedKind::SongSwap => None,
        }
    }
}

/// The two parties of a song swap.
///
/// A caller never states its role; it is inferred by matching the caller's id
/// against the swap's stored user ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapRole {
    Initiated,
    Matched,
}

impl SwapRole {
    /// Infer which role `user_id` holds in a swap between `initiated_user_id`
    /// and `matched_user_id`. `None` means the user is not a party to the swap.
    pub fn infer(initiated_user_id: i32, matched_user_id: i32, user_id: i32) -> Option<SwapRole> {
        if user_id == initiated_user_id {
            Some(SwapRole::Initiated)
        } else if user_id == matched_user_id {
            Some(SwapRole::Matched)
        } else {
            None
        }
    }
}

/// A song swap as stored, with all role columns optional.
/// State is derived from which columns are populated, not a stored state value.
#[derive(Debug, Clone)]
pub struct SongSwap {
    pub id: i32,
    pub initiated_user_id: i32,
    pub matched_user_id: i32,
    pub initiated_at: NaiveDateTime,
    pub initiated_track_id: Option<i32>,
    pub initiated_track_at: Option<NaiveDateTime>,
    pub matched_track_id: Option<i32>,
    pub matched_track_at: Option<NaiveDateTime>,
    pub initiated_reaction: Option<i32>,
    pub initiated_reaction_at: Option<NaiveDateTime>,
    pub matched_reaction: Option<i32>,
    pub matched_reaction_at: Option<NaiveDateTime>,
}

impl SongSwap {
    pub fn role_of(&self, user_id: i32) -> Option<SwapRole> {
        SwapRole::infer(self.initiated_user_id, self.matched_user_id, user_id)
    }
}

/// One row of the broadcast feed: the broadcast's own columns plus the
/// resolved display name of whatever it points at, the aggregate like count,
/// and whether the requesting viewer liked it.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastView {
    pub id: i32,
    pub user: String,
    pub title: String,
    pub body: String,
    pub timestamp: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: String,
    pub relatedid: i32,
    pub relatedto: String,
    pub track_url: String,
    pub likes: i64,
    pub liked_by_viewer: bool,
}

/// A song swap with both parties' user/track/artist names joined in.
/// Track and artist columns are null until the corresponding role submits.
#[derive(Debug, Clone, Serialize)]
pub struct SongSwapView {
    pub id: i32,
    pub initiated_user_id: i32,
    pub initiated_user: String,
    pub matched_user_id: i32,
    pub matched_user: String,
    pub initiated_track_id: Option<i32>,
    pub initiated_track_name: Option<String>,
    pub initiated_artist_id: Option<i32>,
    pub initiated_artist_name: Option<String>,
    pub matched_track_id: Option<i32>,
    pub matched_track_name: Option<String>,
    pub matched_artist_id: Option<i32>,
    pub matched_artist_name: Option<String>,
    pub initiated_reaction: Option<i32>,
    pub matched_reaction: Option<i32>,
    pub swap_initiated_timestamp: NaiveDateTime,
    pub initiated_track_timestamp: Option<NaiveDateTime>,
    pub matched_track_timestamp: Option<NaiveDateTime>,
    pub initiated_reaction_timestamp: Option<NaiveDateTime>,
    pub matched_reaction_timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowerView {
    pub follower: String,
    pub followingsince: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowingView {
    pub following: String,
    pub followingsince: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub conversant: String,
    pub messagecount: i64,
    pub unreadcount: i64,
    pub lastconversation: NaiveDateTime,
}

/// A direct message in a two-user thread, tagged with its direction relative
/// to the requesting user.
#[derive(Debug, Clone, Serialize)]
pub struct DirectMessageView {
    pub id: i32,
    #[serde(rename = "type")]
    pub direction: String,
    pub sender: String,
    pub recipient: String,
    pub message: String,
    pub timestamp: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_ids_are_stable_and_ordered() {
        for (index, kind) in RelatedKind::ALL.iter().enumerate() {
            assert_eq!(kind.id(), index as i32 + 1);
            assert_eq!(RelatedKind::from_id(kind.id()), Some(*kind));
        }
        assert_eq!(RelatedKind::from_id(0), None);
        assert_eq!(RelatedKind::from_id(12), None);
    }

    #[test]
    fn test_kind_lookup_by_name_is_case_insensitive() {
        assert_eq!(RelatedKind::from_name("Track"), Some(RelatedKind::Track));
        assert_eq!(RelatedKind::from_name("track"), Some(RelatedKind::Track));
        assert_eq!(RelatedKind::from_name(" SONGSWAP "), Some(RelatedKind::SongSwap));
        assert_eq!(RelatedKind::from_name("Podcast"), None);
        assert_eq!(RelatedKind::from_name(""), None);
    }

    #[test]
    fn test_targets_are_consistent() {
        // Every declared target must carry a full table/id/name triple; a
        // partial triple would produce a malformed feed branch.
        for kind in RelatedKind::ALL {
            if let Some(target) = kind.target() {
                assert!(!target.table.is_empty());
                assert!(!target.id_column.is_empty());
                assert!(!target.name_column.is_empty());
            }
        }
        assert!(RelatedKind::General.target().is_none());
        assert!(RelatedKind::Track.target().is_some());
    }

    #[test]
    fn test_role_inference() {
        assert_eq!(SwapRole::infer(3, 7, 3), Some(SwapRole::Initiated));
        assert_eq!(SwapRole::infer(3, 7, 7), Some(SwapRole::Matched));
        assert_eq!(SwapRole::infer(3, 7, 9), None);
    }

    #[test]
    fn test_role_inference_on_swap() {
        let swap = SongSwap {
            id: 1,
            initiated_user_id: 2,
            matched_user_id: 3,
            initiated_at: chrono::NaiveDateTime::default(),
            initiated_track_id: None,
            initiated_track_at: None,
            matched_track_id: None,
            matched_track_at: None,
            initiated_reaction: None,
            initiated_reaction_at: None,
            matched_reaction: None,
            matched_reaction_at: None,
        };
        assert_eq!(swap.role_of(2), Some(SwapRole::Initiated));
        assert_eq!(swap.role_of(3), Some(SwapRole::Matched));
        assert_eq!(swap.role_of(4), None);
    }
}
