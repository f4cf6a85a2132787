//! # ShopDesk Core
//!
//! Shared vocabulary for every ShopDesk crate:
//! - [`config`]: TOML configuration (`~/.shopdesk/config.toml`)
//! - [`error`]: the workspace-wide error enum
//! - [`types`]: records exchanged with storage, search and LLM services
//! - [`traits`]: collaborator seams (storage, search index, LLM, persistence)

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ShopDeskConfig;
pub use error::{Result, ShopDeskError};
