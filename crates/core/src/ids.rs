// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque, caller-chosen identifiers.
//!
//! Unlike the [`crate::id`] machinery (which mints its own prefixed random
//! ids), version and baseline identifiers are supplied by the embedder —
//! a version manager, a caller's naming scheme — and may be arbitrary
//! strings such as `"v1"` or a VCS commit hash. `SmolStr` keeps short ids
//! cheap to clone without forcing a fixed-width buffer on callers.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* pub struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(SmolStr);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(SmolStr::new(s.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }
    };
}

opaque_id! {
    /// Identifies a version/checkpoint. Caller-chosen; not generated by this crate.
    pub struct VersionId;
}

opaque_id! {
    /// Identifies a named regression baseline.
    pub struct BaselineId;
}

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
