//! Broadcastr: a social backend over music-listening statistics.

pub mod api;
pub mod crypto;
pub mod db;
pub mod lastfm;
pub mod models;
