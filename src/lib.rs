//! Nightfall session engine: room progression and snapshot persistence with file fallback.

pub mod config;
pub mod dao;
pub mod error;
pub mod services;
pub mod state;
