//! Keys stored in the session scopes.

/// Session keys shared by the user and admin scopes.
pub mod keys {
    /// Marker of an authenticated user, holds the user id (user scope).
    pub const CURRENT_USER_ID: &str = "currentUserID";

    /// Marker of an authenticated administrator, holds the user id (admin scope).
    pub const CURRENT_ADMIN_ID: &str = "currentAdminID";

    /// One-shot message shown on the next rendered page.
    pub const FLASH: &str = "flash";
}
