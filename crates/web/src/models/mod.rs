//! Domain models.
//!
//! Validated domain objects, kept separate from database row types.

pub mod session;
pub mod snippet;
pub mod user;

pub use session::keys as session_keys;
pub use snippet::{NewSnippet, Snippet, human_date};
pub use user::{CredentialRecord, NewUser};
