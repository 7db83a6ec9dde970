//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Crystals and holders are both identified by 128-bit UUIDs; wrapping
//! them in distinct newtypes prevents accidental mixing at compile time.
//! New identifiers use UUID v7 (time-ordered) for efficient indexing in
//! the ledger file. Identifiers are persisted in canonical hyphenated
//! text form, so both wrappers offer a string round-trip.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }

            /// Parse an identifier from its canonical hyphenated text form.
            ///
            /// Returns `None` if the string is not a valid UUID.
            pub fn parse(raw: &str) -> Option<Self> {
                Uuid::parse_str(raw).ok().map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a minted crystal, assigned at mint time and
    /// never reused.
    CrystalId
}

define_id! {
    /// Unique identifier for a holder (an agent who can carry crystals,
    /// online or offline).
    HolderId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let crystal = CrystalId::new();
        let holder = HolderId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(crystal.into_inner(), Uuid::nil());
        assert_ne!(holder.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = CrystalId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = CrystalId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<CrystalId, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn id_parse_roundtrip() {
        let id = CrystalId::new();
        let parsed = CrystalId::parse(&id.to_string());
        assert_eq!(parsed, Some(id));
    }

    #[test]
    fn id_parse_rejects_garbage() {
        assert_eq!(CrystalId::parse("not-a-uuid"), None);
        assert_eq!(HolderId::parse(""), None);
    }
}
