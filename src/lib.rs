#![deny(missing_docs)]
//! Userbot message layer.
//!
//! Decorates incoming chat messages with flag parsing, auto-delete and
//! fallback send strategies, and ships the thumbnail and cancel commands.

/// Telegram-facing bot logic: client seam, message wrapper, handlers.
pub mod bot;
/// Configuration management.
pub mod config;
/// Errors surfaced by chat operations.
pub mod error;
/// Command plugins.
pub mod plugins;
/// Telegram runtime entrypoint.
pub mod runner;
/// Utility functions.
pub mod utils;
