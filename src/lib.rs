//! devlog: a terminal client for a developer-blogging platform hosted on a
//! managed backend (auth service, GraphQL endpoint, REST table endpoint).
//!
//! The binary in `main.rs` wires these modules together; they are exposed as
//! a library so the integration tests under `tests/` can drive them directly.

pub mod app;
pub mod backend;
pub mod config;
pub mod feed;
pub mod keybindings;
pub mod preferences;
pub mod storage;
pub mod theme;
pub mod ui;
pub mod util;
