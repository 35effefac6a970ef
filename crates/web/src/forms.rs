//! HTML form input and validation.
//!
//! Each form deserializes its raw string fields with `#[serde(default)]`, so
//! a missing field validates as empty instead of failing extraction. Failures
//! are keyed by a per-form field enum, and templates look them up with the
//! same variants (`failures.get(SignupField::Email)`).

use serde::Deserialize;

use snippetbox_core::{Email, EmailError, SnippetId};

use crate::services::auth::MIN_PASSWORD_LENGTH;

/// Longest accepted snippet title, in characters.
pub const MAX_TITLE_LENGTH: usize = 100;

/// Fields of the new-snippet form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NewSnippetField {
    Title,
    Content,
    Expires,
}

/// Fields of the user and admin signup forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignupField {
    Name,
    Email,
    Password,
}

/// Fields of the login form. `Generic` carries failures not tied to one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginField {
    Email,
    Password,
    Generic,
}

/// Fields of the delete-snippet form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteField {
    Id,
}

/// Validation failures, at most one per field.
#[derive(Debug, Clone)]
pub struct Failures<F> {
    entries: Vec<(F, String)>,
}

impl<F> Default for Failures<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F: Copy + Eq> Failures<F> {
    /// Record a failure, replacing any earlier one for the same field.
    pub fn add(&mut self, field: F, message: impl Into<String>) {
        let message = message.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = message,
            None => self.entries.push((field, message)),
        }
    }

    /// The failure recorded for `field`.
    #[must_use]
    pub fn get(&self, field: F) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, message)| message.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Permitted snippet lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetLifetime {
    OneHour,
    OneDay,
    OneYear,
}

impl SnippetLifetime {
    /// Parse the `expires` form value. Only the exact permitted values match.
    #[must_use]
    pub fn from_form(value: &str) -> Option<Self> {
        match value {
            "3600" => Some(Self::OneHour),
            "86400" => Some(Self::OneDay),
            "31536000" => Some(Self::OneYear),
            _ => None,
        }
    }

    /// Lifetime in seconds.
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::OneHour => 3600,
            Self::OneDay => 86_400,
            Self::OneYear => 31_536_000,
        }
    }
}

// =============================================================================
// New snippet
// =============================================================================

/// Raw new-snippet form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewSnippetForm {
    pub title: String,
    pub content: String,
    pub expires: String,
}

/// A snippet form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSnippet {
    pub title: String,
    pub content: String,
    pub lifetime: SnippetLifetime,
}

impl NewSnippetForm {
    /// Validate all fields.
    ///
    /// # Errors
    ///
    /// Returns the failures keyed by field when any field is invalid.
    pub fn validate(&self) -> Result<ValidSnippet, Failures<NewSnippetField>> {
        let mut failures = Failures::default();

        let title = self.title.trim();
        if title.is_empty() {
            failures.add(NewSnippetField::Title, "Title is required");
        } else if title.chars().count() > MAX_TITLE_LENGTH {
            failures.add(
                NewSnippetField::Title,
                format!("Title cannot be longer than {MAX_TITLE_LENGTH} characters"),
            );
        }

        if self.content.trim().is_empty() {
            failures.add(NewSnippetField::Content, "Content is required");
        }

        let lifetime = if self.expires.trim().is_empty() {
            failures.add(NewSnippetField::Expires, "Expiry time is required");
            None
        } else {
            let lifetime = SnippetLifetime::from_form(&self.expires);
            if lifetime.is_none() {
                failures.add(
                    NewSnippetField::Expires,
                    "Expiry time must be 3600, 86400 or 31536000 seconds",
                );
            }
            lifetime
        };

        match lifetime {
            Some(lifetime) if failures.is_empty() => Ok(ValidSnippet {
                title: title.to_owned(),
                content: self.content.clone(),
                lifetime,
            }),
            _ => Err(failures),
        }
    }
}

// =============================================================================
// Signup
// =============================================================================

/// Raw signup form, shared by user and admin signup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A signup form that passed validation.
#[derive(Debug, Clone)]
pub struct ValidSignup {
    pub name: String,
    pub email: Email,
    pub password: String,
}

impl SignupForm {
    /// Validate all fields.
    ///
    /// # Errors
    ///
    /// Returns the failures keyed by field when any field is invalid.
    pub fn validate(&self) -> Result<ValidSignup, Failures<SignupField>> {
        let mut failures = Failures::default();

        let name = self.name.trim();
        if name.is_empty() {
            failures.add(SignupField::Name, "Name is required");
        }

        let email = match Email::parse(self.email.trim()) {
            Ok(email) => Some(email),
            Err(EmailError::Empty) => {
                failures.add(SignupField::Email, "Email is required");
                None
            }
            Err(_) => {
                failures.add(SignupField::Email, "Email is not a valid address");
                None
            }
        };

        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            failures.add(
                SignupField::Password,
                format!("Password cannot be shorter than {MIN_PASSWORD_LENGTH} characters"),
            );
        }

        match email {
            Some(email) if failures.is_empty() => Ok(ValidSignup {
                name: name.to_owned(),
                email,
                password: self.password.clone(),
            }),
            _ => Err(failures),
        }
    }
}

// =============================================================================
// Login
// =============================================================================

/// Raw login form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// Check that both fields are present.
    ///
    /// # Errors
    ///
    /// Returns the failures keyed by field when a field is blank.
    pub fn validate(&self) -> Result<(), Failures<LoginField>> {
        let mut failures = Failures::default();

        if self.email.trim().is_empty() {
            failures.add(LoginField::Email, "Email is required");
        }
        if self.password.trim().is_empty() {
            failures.add(LoginField::Password, "Password is required");
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}

// =============================================================================
// Delete snippet
// =============================================================================

/// Raw delete-snippet form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeleteForm {
    pub id: String,
}

impl DeleteForm {
    /// Parse the snippet ID.
    ///
    /// # Errors
    ///
    /// Returns a failure under `Id` unless the value is a positive integer.
    pub fn validate(&self) -> Result<SnippetId, Failures<DeleteField>> {
        let mut failures = Failures::default();

        if self.id.trim().is_empty() {
            failures.add(DeleteField::Id, "Id is required");
            return Err(failures);
        }

        self.id.trim().parse::<SnippetId>().map_err(|_| {
            failures.add(DeleteField::Id, "Id must be a positive number");
            failures
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snippet_form(title: &str, content: &str, expires: &str) -> NewSnippetForm {
        NewSnippetForm {
            title: title.to_owned(),
            content: content.to_owned(),
            expires: expires.to_owned(),
        }
    }

    #[test]
    fn test_title_blank_fails() {
        for title in ["", "   ", "\t\n"] {
            let failures = snippet_form(title, "body", "3600").validate().unwrap_err();
            assert_eq!(failures.get(NewSnippetField::Title), Some("Title is required"));
        }
    }

    #[test]
    fn test_title_length_counts_characters() {
        let exactly_100 = "é".repeat(100);
        assert!(snippet_form(&exactly_100, "body", "3600").validate().is_ok());

        let over = "é".repeat(101);
        let failures = snippet_form(&over, "body", "3600").validate().unwrap_err();
        assert_eq!(
            failures.get(NewSnippetField::Title),
            Some("Title cannot be longer than 100 characters")
        );
    }

    #[test]
    fn test_title_is_trimmed() {
        let valid = snippet_form("  hello  ", "body", "86400").validate().unwrap();
        assert_eq!(valid.title, "hello");
        assert_eq!(valid.lifetime, SnippetLifetime::OneDay);
    }

    #[test]
    fn test_content_required() {
        let failures = snippet_form("t", "  ", "3600").validate().unwrap_err();
        assert_eq!(failures.get(NewSnippetField::Content), Some("Content is required"));
    }

    #[test]
    fn test_expiry_must_be_permitted() {
        for expires in ["60", "-3600", "0", "3600.0", "one hour", "7200"] {
            let failures = snippet_form("t", "c", expires).validate().unwrap_err();
            assert!(failures.get(NewSnippetField::Expires).is_some(), "{expires}");
        }
        let failures = snippet_form("t", "c", "").validate().unwrap_err();
        assert_eq!(
            failures.get(NewSnippetField::Expires),
            Some("Expiry time is required")
        );
        for (expires, secs) in [("3600", 3600), ("86400", 86_400), ("31536000", 31_536_000)] {
            let valid = snippet_form("t", "c", expires).validate().unwrap();
            assert_eq!(valid.lifetime.seconds(), secs);
        }
    }

    #[test]
    fn test_failures_collected_for_every_field() {
        let failures = snippet_form("", "", "").validate().unwrap_err();
        assert_eq!(failures.len(), 3);
        assert!(failures.get(NewSnippetField::Title).is_some());
        assert!(failures.get(NewSnippetField::Content).is_some());
        assert!(failures.get(NewSnippetField::Expires).is_some());
    }

    #[test]
    fn test_signup_validation() {
        let form = SignupForm {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password: "hunter22".into(),
        };
        let valid = form.validate().unwrap();
        assert_eq!(valid.email.as_str(), "alice@example.com");

        let form = SignupForm {
            name: " ".into(),
            email: "not-an-email".into(),
            password: "short".into(),
        };
        let failures = form.validate().unwrap_err();
        assert_eq!(failures.get(SignupField::Name), Some("Name is required"));
        assert_eq!(
            failures.get(SignupField::Email),
            Some("Email is not a valid address")
        );
        assert_eq!(
            failures.get(SignupField::Password),
            Some("Password cannot be shorter than 8 characters")
        );
    }

    #[test]
    fn test_signup_email_required() {
        let failures = SignupForm::default().validate().unwrap_err();
        assert_eq!(failures.get(SignupField::Email), Some("Email is required"));
    }

    #[test]
    fn test_login_requires_both_fields() {
        let failures = LoginForm::default().validate().unwrap_err();
        assert_eq!(failures.get(LoginField::Email), Some("Email is required"));
        assert_eq!(failures.get(LoginField::Password), Some("Password is required"));

        let form = LoginForm {
            email: "a@b.co".into(),
            password: "x".into(),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_delete_id_must_be_positive() {
        let parse = |id: &str| DeleteForm { id: id.into() }.validate();
        assert_eq!(parse("12").unwrap(), SnippetId::new(12));
        assert!(parse("0").is_err());
        assert!(parse("-1").is_err());
        assert!(parse("abc").is_err());
        assert_eq!(
            parse("").unwrap_err().get(DeleteField::Id),
            Some("Id is required")
        );
    }

    #[test]
    fn test_failures_add_replaces() {
        let mut failures = Failures::default();
        failures.add(LoginField::Generic, "first");
        failures.add(LoginField::Generic, "second");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures.get(LoginField::Generic), Some("second"));
    }
}
