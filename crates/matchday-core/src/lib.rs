// Library root: re-exports all modules so the binary and integration tests
// can reach the crate's public API.

pub mod advanced;
pub mod config;
pub mod lineup;
pub mod persist;
pub mod pipeline;
pub mod position;
pub mod projections;
pub mod reconcile;
pub mod results;
pub mod roster;
pub mod scoring;
pub mod source;
pub mod standings;
pub mod state;
pub mod stat_detail;
pub mod stats;
pub mod teams;
pub mod waivers;
