//! Host APIs for SFR Home fetch strategies.
//!
//! - [`session`] - HTTP client bound to a cookie jar
//! - [`artifacts`] - Debug artifact writer

pub mod artifacts;
pub mod session;

pub use artifacts::ArtifactWriter;
pub use session::PortalSession;
