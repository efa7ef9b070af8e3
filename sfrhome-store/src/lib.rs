// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # SFR Home Store
//!
//! On-disk state for SFR Home.
//!
//! This crate provides:
//!
//! - **CookieFile**: the persisted session cookie jar
//! - **Config**: the optional JSON configuration file
//! - **Persistence**: JSON file helpers with owner-only permissions
//!
//! ## Usage
//!
//! ```ignore
//! use sfrhome_store::{Config, CookieFile};
//!
//! let config = Config::load()?;
//! let jar = CookieFile::new(config.cookie_file_path());
//!
//! if let Some(cookies) = jar.load().await {
//!     // reuse the previous session
//! }
//! ```

pub mod config;
pub mod cookie_file;
pub mod error;
pub mod persistence;

pub use config::{
    Config, CredentialsConfig, NetworkConfig, OutputConfig, PortalConfig, DEFAULT_BASE_URL,
    DEFAULT_TIMEOUT_SECS,
};
pub use cookie_file::CookieFile;
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_config_path, default_cookie_path, load_json, remove_file, save_json,
};
