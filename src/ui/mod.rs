//! Terminal User Interface module.
//!
//! This module provides the TUI for the blogging client, including:
//! - Main event loop (`run`)
//! - Input handling for the login form, feed, reader and compose modal
//! - Rendering for every view
//! - Background task event processing
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `helpers` - Task spawning and panic capture
//! - `render` - View rendering dispatch and the feed layout
//! - `posts` - Post list widget
//! - `reader` - Post reader widget and Markdown rendering
//! - `compose` - Compose modal
//! - `login` - Sign-in form
//! - `help` - Keybinding overlay
//! - `status` - Status bar widget

mod compose;
mod events;
mod help;
mod helpers;
mod input;
mod login;
mod loop_runner;
mod posts;
pub mod reader;
mod render;
mod status;

// Re-export the public API
pub use loop_runner::{run, Action};
