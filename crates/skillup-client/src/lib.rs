//! skillup-client: streaming test reader and REST client for the skillup
//! backend.
//!
//! Implements the `TestSource` and `ResultSubmitter` seams from
//! `skillup-core` over HTTP, plus mock implementations for tests.

pub mod api;
pub mod config;
pub mod error;
pub mod mock;
pub mod resources;
pub mod stream;

pub use api::ApiClient;
pub use config::{load_config_from, SkillupConfig};
pub use error::ClientError;
