//! Domain models for Taskboard
//!
//! This module contains the three aggregates and the enums they carry.
//! Entity fields are private: the only way to change a stored entity is its
//! `update` method (which stamps `updated_at`) or, when an owning reference
//! changes, reconstruction through `reassign`.
//!
//! # Models
//!
//! - `user`: accounts that own projects and are assigned tasks
//! - `project`: a body of work owned by a user
//! - `task`: a unit of work inside a project, assigned to a user
//!
//! # Enum wire format
//!
//! Every enum serializes as its PascalCase variant name (`"InProgress"`),
//! is stored in PostgreSQL as a native enum with snake_case labels
//! (`'in_progress'`), and parses case-insensitively from either form.
//! Request bodies may also carry the declaration index (`1`).
//!
//! # Example
//!
//! ```
//! use taskboard_shared::models::project::ProjectStatus;
//!
//! let status: ProjectStatus = "in_progress".parse().unwrap();
//! assert_eq!(status, ProjectStatus::InProgress);
//! assert_eq!(status.as_str(), "InProgress");
//! assert_eq!(ProjectStatus::from_index(3), Some(ProjectStatus::Completed));
//! ```

use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// Error returned when a string names no variant of a labelled enum
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {enum_name} value")]
pub struct UnknownVariant {
    /// Name of the enum being parsed
    pub enum_name: &'static str,

    /// The rejected input
    pub value: String,
}

/// Enums that can be looked up by label or by declaration index
pub trait Labelled: Copy + FromStr + 'static {
    /// Looks up a variant by its declaration index
    fn from_index(index: u64) -> Option<Self>;
}

/// Declares a labelled enum: PascalCase labels, declaration-order indices,
/// case-insensitive `FromStr`, and `Display`.
macro_rules! labelled_enum {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $label:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$outer])*
        pub enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )+
        }

        impl $name {
            /// All variants in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Returns the PascalCase label used on the wire
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Looks up a variant by its declaration index
            pub fn from_index(index: u64) -> Option<Self> {
                usize::try_from(index)
                    .ok()
                    .and_then(|i| Self::ALL.get(i).copied())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted: String = s.trim().chars().filter(|c| *c != '_').collect();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.as_str().eq_ignore_ascii_case(&wanted))
                    .ok_or_else(|| $crate::models::UnknownVariant {
                        enum_name: stringify!($name),
                        value: s.to_string(),
                    })
            }
        }

        impl $crate::models::Labelled for $name {
            fn from_index(index: u64) -> Option<Self> {
                $name::from_index(index)
            }
        }
    };
}

pub mod project;
pub mod task;
pub mod user;

/// Deserializes an optional labelled enum without failing on bad input
///
/// Accepts a label string or a declaration index. Anything else, including
/// an unknown label or an out-of-range index, deserializes to `None` so the
/// command validator can report it as a field error instead of the whole
/// body being rejected.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Labelled,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;

    Ok(match raw {
        Some(serde_json::Value::String(label)) => label.parse().ok(),
        Some(serde_json::Value::Number(index)) => index.as_u64().and_then(T::from_index),
        _ => None,
    })
}
