// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod app;
pub mod config;
pub mod draft;
pub mod filter;
pub mod gateway;
pub mod images;
pub mod leaderboard;
pub mod provision;
pub mod roster;
