// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job and record identifiers

use thiserror::Error;

/// Longest identifier accepted from a caller.
pub const MAX_ID_LEN: usize = 128;

/// Define a newtype ID wrapper around `SmolStr`.
///
/// Generates `from_string()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, `Borrow<str>`, `AsRef<str>`, and `Deref`.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct JobId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub smol_str::SmolStr);

        impl $name {
            /// Wrap an existing string without validation.
            pub fn from_string(id: impl Into<smol_str::SmolStr>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }
    };
}

crate::define_id! {
    /// Unique identifier of a pipeline job.
    ///
    /// Either supplied by the caller on trigger or generated as
    /// `{name}_{stage}_{timestamp}`. Also used as the upsert key for persisted
    /// results and as a file name by file-backed stores, so it is restricted to
    /// a path-safe character set.
    pub struct JobId;
}

crate::define_id! {
    /// Identifier assigned by a result store to a persisted record.
    pub struct RecordId;
}

/// A caller-supplied job id that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidJobId {
    #[error("job id must not be empty")]
    Empty,
    #[error("job id is longer than {MAX_ID_LEN} characters")]
    TooLong,
    #[error("job id contains invalid character {0:?} (allowed: letters, digits, '-', '_', '.', ':')")]
    InvalidChar(char),
    #[error("job id must not start with '.'")]
    LeadingDot,
}

impl JobId {
    /// Validate a caller-supplied id.
    pub fn parse(raw: &str) -> Result<Self, InvalidJobId> {
        if raw.is_empty() {
            return Err(InvalidJobId::Empty);
        }
        if raw.chars().count() > MAX_ID_LEN {
            return Err(InvalidJobId::TooLong);
        }
        if raw.starts_with('.') {
            return Err(InvalidJobId::LeadingDot);
        }
        if let Some(c) = raw.chars().find(|c| !is_id_char(*c)) {
            return Err(InvalidJobId::InvalidChar(c));
        }
        Ok(Self::from_string(raw))
    }

    /// Build the `{name}_{stage}_{timestamp}` form used when the caller
    /// supplies no id. Characters outside the id alphabet are replaced by `-`.
    pub fn generate(name: &str, stage: &str, timestamp: &str) -> Self {
        let raw = format!("{name}_{stage}_{timestamp}");
        let cleaned: String =
            raw.chars().map(|c| if is_id_char(c) { c } else { '-' }).take(MAX_ID_LEN).collect();
        Self::from_string(cleaned)
    }
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
