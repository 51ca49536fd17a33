//! Strongly-typed wrappers for catalog identities
//!
//! Card and character identities are plain strings in the catalog file, but
//! mixing them up is an easy mistake (a card requiring a character names the
//! character key, a counter list names card keys), so each gets a newtype.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

string_newtype!(
    /// Catalog identity of a card (e.g. "flying-sand")
    CardKey
);

string_newtype!(
    /// Catalog identity of a character (e.g. "zhang-cheng")
    CharacterKey
);

string_newtype!(
    /// Display name of a card or character
    CardName
);

impl CardName {
    pub fn to_lowercase(&self) -> String {
        self.0.to_lowercase()
    }
}
