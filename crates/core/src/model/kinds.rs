use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {raw:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    raw: String,
}

/// Declares a lowercase string-backed enum with `as_str`, `Display` and `FromStr`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        raw: s.to_owned(),
                    }),
                }
            }
        }
    };
}

string_enum!(
    /// How hard the generated questions should be.
    Difficulty, "difficulty" {
        Easy => "easy",
        Medium => "medium",
        Difficult => "difficult",
        Expert => "expert",
    }
);

string_enum!(
    /// Pedagogical level the cards target.
    BloomLevel, "bloom level" {
        Remember => "remember",
        Understand => "understand",
        Apply => "apply",
    }
);

string_enum!(
    /// Presentation format of a deck's cards.
    DeckFormat, "deck format" {
        Qa => "qa",
        Cloze => "cloze",
        Mcq => "mcq",
    }
);

string_enum!(
    /// Shape of the topic text the deck was generated from.
    InputKind, "input kind" {
        Text => "text",
        Markdown => "markdown",
    }
);

impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

impl Default for BloomLevel {
    fn default() -> Self {
        Self::Understand
    }
}

impl Default for DeckFormat {
    fn default() -> Self {
        Self::Qa
    }
}

impl Default for InputKind {
    fn default() -> Self {
        Self::Text
    }
}
