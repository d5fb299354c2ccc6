//! Domain models for the broadcastr backend.

pub mod music;
pub mod social;
pub mod user;

pub use music::*;
pub use social::{RelatedKind, RelatedTarget, SongSwap, SwapRole};
pub use user::{SYSTEM_ACCOUNT_ID, User};
