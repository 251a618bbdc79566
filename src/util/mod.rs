//! Utility functions for common operations.
//!
//! - **URL validation**: the backend base URL must be HTTPS (localhost excepted)
//! - **Text processing**: Unicode-aware width/truncation, control-character
//!   stripping, and the small presentation helpers the feed uses (excerpts,
//!   avatar initials)
//!
//! ```
//! use devlog::util::{display_width, excerpt, truncate_to_width};
//!
//! let width = display_width("Hello 世界");
//! assert_eq!(width, 10);
//!
//! let title = truncate_to_width("A very long post title", 10);
//! assert_eq!(title, "A very ...");
//!
//! assert_eq!(excerpt("tiny", 200), "tiny");
//! ```

mod text;
mod url_validator;

pub use text::{
    display_width, email_local_part, excerpt, initial, strip_control_chars, truncate_to_width,
    EXCERPT_MAX_CHARS,
};
pub use url_validator::{validate_backend_url, UrlValidationError};
