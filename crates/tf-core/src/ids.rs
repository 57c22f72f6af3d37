//! Opaque identifiers
//!
//! Ids travel as plain strings on the wire. Generated ids carry a short type
//! prefix followed by a v4 UUID (`prj_6f1c…`).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix used for generated identifiers
            pub const PREFIX: &'static str = $prefix;

            /// Generate a fresh identifier
            #[must_use]
            pub fn generate() -> Self {
                Self(format!("{}_{}", $prefix, Uuid::new_v4()))
            }

            /// Borrow as string slice
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// User identifier
    UserId,
    "usr"
);
string_id!(
    /// Project identifier
    ProjectId,
    "prj"
);
string_id!(
    /// Task identifier
    TaskId,
    "tsk"
);
string_id!(
    /// Comment identifier
    CommentId,
    "cmt"
);
string_id!(
    /// Activity event identifier
    EventId,
    "act"
);
