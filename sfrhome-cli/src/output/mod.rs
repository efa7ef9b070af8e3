//! Output formatting and export for CLI.

mod csv;
mod export;
mod json;
mod text;

pub use export::export_devices;
pub use json::JsonFormatter;
pub use text::TextFormatter;

#[cfg(test)]
mod tests;
