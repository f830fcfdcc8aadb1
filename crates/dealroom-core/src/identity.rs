//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout dealroom.
//! Each identifier is a distinct type: you cannot pass a [`ClauseId`]
//! where a [`DealId`] is expected.
//!
//! ## Validation
//!
//! UUID-based identifiers are always valid by construction. Catalog keys
//! ([`ClauseKey`], [`OptionId`]) are authored by humans in template files
//! and are validated at construction: 1–64 characters from
//! `[a-z0-9_-]`, starting with an alphanumeric character.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// UUID-based identifiers (always valid by construction)
// ---------------------------------------------------------------------------

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_identifier!(
    /// One negotiation instance.
    DealId
);
uuid_identifier!(
    /// One negotiating side within a deal.
    PartyId
);
uuid_identifier!(
    /// A clause instantiated inside one deal (not the catalog clause).
    ClauseId
);
uuid_identifier!(
    /// One negotiation round.
    RoundId
);
uuid_identifier!(
    /// One round's compromise suggestion for one clause.
    SuggestionId
);
uuid_identifier!(
    /// A counter-proposal filed against a suggestion.
    ProposalId
);
uuid_identifier!(
    /// An authenticated user. Parties link to users on creation or on
    /// invitation acceptance.
    UserId
);

// ---------------------------------------------------------------------------
// Catalog keys (validated strings)
// ---------------------------------------------------------------------------

const MAX_KEY_LEN: usize = 64;

fn validate_key(kind: &'static str, value: &str) -> Result<(), ValidationError> {
    let reject = |reason: &str| ValidationError::InvalidIdentifier {
        kind,
        value: value.to_string(),
        reason: reason.to_string(),
    };
    if value.is_empty() {
        return Err(reject("must not be empty"));
    }
    if value.len() > MAX_KEY_LEN {
        return Err(reject("must not exceed 64 characters"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(reject("only lowercase ascii letters, digits, '-' and '_' are allowed"));
    }
    if !value.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(reject("must start with a letter or digit"));
    }
    Ok(())
}

macro_rules! key_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a validated key.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                validate_key($kind, &value)?;
                Ok(Self(value))
            }

            /// Return the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> Self {
                key.0
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

key_identifier!(
    /// Catalog-level key of a clause template (e.g. `"payment-terms"`).
    ClauseKey,
    "clause key"
);
key_identifier!(
    /// Key of one option within a clause (e.g. `"net-30"`). Unique within
    /// its clause, not globally.
    OptionId,
    "option id"
);
