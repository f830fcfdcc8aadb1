//! # Party Roles
//!
//! A deal has exactly two sides. The initiator is party A, the respondent
//! is party B; bias scores in the catalog are expressed from those two
//! perspectives.

use serde::{Deserialize, Serialize};

/// The side a party negotiates for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyRole {
    /// Created the deal. Party A.
    Initiator,
    /// Joined by invitation. Party B.
    Respondent,
}

impl PartyRole {
    /// Both roles, initiator first.
    pub const BOTH: [PartyRole; 2] = [PartyRole::Initiator, PartyRole::Respondent];

    /// The canonical string name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiator => "INITIATOR",
            Self::Respondent => "RESPONDENT",
        }
    }

    /// Human-readable label used in suggestion reasoning.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initiator => "Party A",
            Self::Respondent => "Party B",
        }
    }

    /// The other side of the table.
    pub fn counterpart(&self) -> Self {
        match self {
            Self::Initiator => Self::Respondent,
            Self::Respondent => Self::Initiator,
        }
    }
}

impl std::fmt::Display for PartyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
