//! Local SQLite state.
//!
//! Two tables live here: `user_preferences` (dotted key/value settings that
//! override the config file) and `auth_session` (the single persisted
//! sign-in, so a restart does not require logging in again).

mod preferences;
mod schema;
mod sessions;
mod types;

pub use schema::Database;
pub use types::DatabaseError;
