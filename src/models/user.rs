//! User model and profile view.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::crypto::password::verify_password;

/// Reserved account id for system-authored broadcasts. Seeded at migration
/// time with no password hash and no login timestamp, so it can neither log in
/// nor be drawn as a song swap match.
pub const SYSTEM_ACCOUNT_ID: i32 = 1;

/// Swag granted to a new profile.
pub const SWAG_STARTING_BALANCE: i32 = 5;

/// Swag awarded to a broadcast's author when someone else likes it.
pub const SWAG_LIKED_BROADCAST: i32 = 1;

/// A user in the system (domain model). `username` is the user's Last.fm
/// profile name and doubles as their public handle.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Argon2 PHC-formatted hash. Empty for the system account.
    pub password_hash: String,
    /// Whether this profile was bulk-created rather than self-registered.
    pub bootstrapped: bool,
    pub admin: bool,
    pub swag: i32,
    pub image_url: Option<String>,
    pub last_fm_url: Option<String>,
    pub last_login: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn is_system(&self) -> bool {
        self.id == SYSTEM_ACCOUNT_ID
    }

    /// Verify a plaintext password against the stored Argon2 hash.
    /// The system account has no hash and never verifies.
    pub fn verify_password(&self, password: &str) -> bool {
        if self.password_hash.is_empty() {
            return false;
        }
        verify_password(password, &self.password_hash).unwrap_or(false)
    }
}

/// Profile view returned by GET /api/user/profile.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfileView {
    pub id: i32,
    pub profile: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub profileurl: Option<String>,
    pub bootstrapped: bool,
    pub admin: bool,
    pub lastlogin: Option<NaiveDateTime>,
    pub pfp: Option<String>,
    pub swag: i32,
}

impl From<&User> for UserProfileView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            profile: user.username.clone(),
            firstname: user.first_name.clone(),
            lastname: user.last_name.clone(),
            email: user.email.clone(),
            profileurl: user.last_fm_url.clone(),
            bootstrapped: user.bootstrapped,
            admin: user.admin,
            lastlogin: user.last_login,
            pfp: user.image_url.clone(),
            swag: user.swag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::password::hash_password;

    fn user_with_hash(hash: &str) -> User {
        User {
            id: 2,
            username: "tester".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            email: "tester@example.com".into(),
            password_hash: hash.into(),
            bootstrapped: false,
            admin: false,
            swag: SWAG_STARTING_BALANCE,
            image_url: None,
            last_fm_url: None,
            last_login: None,
            created_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_verify_password_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        let user = user_with_hash(&hash);
        assert!(user.verify_password("hunter2"));
        assert!(!user.verify_password("hunter3"));
    }

    #[test]
    fn test_empty_hash_never_verifies() {
        let user = user_with_hash("");
        assert!(!user.verify_password(""));
        assert!(!user.verify_password("anything"));
    }
}
