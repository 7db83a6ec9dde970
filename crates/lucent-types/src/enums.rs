//! Enumeration types for the Lucent crystal ledger.
//!
//! The status machine and the event taxonomy both persist as uppercase
//! text tags, so each enum carries its database form alongside a parser
//! that accepts legacy spellings.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Crystal status
// ---------------------------------------------------------------------------

/// Lifecycle status of a minted crystal.
///
/// Transitions are conditional: an update applies only when the current
/// status is in the operation's allowed source set, which makes every
/// transition idempotent and race-safe without external locking.
///
/// ```text
/// Active ---> Held ---> Redeemed
///    |          |
///    +----------+--> Lost
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CrystalStatus {
    /// Placed in the world at its minted location, not yet collected.
    Active,
    /// Collected by a holder; no known world position.
    Held,
    /// Destroyed or otherwise gone from circulation without redemption.
    Lost,
    /// Consumed by a redemption action. Terminal.
    Redeemed,
}

impl CrystalStatus {
    /// All statuses, in display order.
    pub const ALL: [Self; 4] = [Self::Active, Self::Held, Self::Lost, Self::Redeemed];

    /// Return the persisted uppercase tag for this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Held => "HELD",
            Self::Lost => "LOST",
            Self::Redeemed => "REDEEMED",
        }
    }

    /// Parse a persisted tag, case-insensitively.
    ///
    /// Accepts the legacy lowercase spellings that predate the uppercase
    /// convention. Returns `None` for unrecognized tags.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "HELD" => Some(Self::Held),
            "LOST" => Some(Self::Lost),
            "REDEEMED" => Some(Self::Redeemed),
            _ => None,
        }
    }
}

impl core::fmt::Display for CrystalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ledger events
// ---------------------------------------------------------------------------

/// The kind of an append-only ledger event.
///
/// The recognized kinds form a closed set; anything else round-trips
/// through [`EventKind::Custom`], which carries the raw tag verbatim so
/// rows written by older revisions survive unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// The crystal was consumed by a redemption action.
    Redeemed,
    /// The crystal was destroyed (fire, explosion, despawn).
    Destroyed,
    /// The crystal fell below the world's void floor.
    VoidLoss,
    /// An operator-triggered audit repair changed the crystal's status.
    AuditFix,
    /// A free-form event tag not in the recognized set.
    Custom(String),
}

impl EventKind {
    /// Return the persisted tag for this event kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Redeemed => "REDEEMED",
            Self::Destroyed => "DESTROYED",
            Self::VoidLoss => "VOID_LOSS",
            Self::AuditFix => "AUDIT_FIX",
            Self::Custom(tag) => tag.as_str(),
        }
    }

    /// Parse a persisted tag.
    ///
    /// Unrecognized tags become [`EventKind::Custom`] rather than an
    /// error -- the event log is append-only and must accept every tag
    /// it has ever stored.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "REDEEMED" => Self::Redeemed,
            "DESTROYED" => Self::Destroyed,
            "VOID_LOSS" => Self::VoidLoss,
            "AUDIT_FIX" => Self::AuditFix,
            other => Self::Custom(other.to_owned()),
        }
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tag_roundtrip() {
        for status in CrystalStatus::ALL {
            assert_eq!(CrystalStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn status_parse_accepts_legacy_lowercase() {
        assert_eq!(CrystalStatus::parse("active"), Some(CrystalStatus::Active));
        assert_eq!(CrystalStatus::parse("Held"), Some(CrystalStatus::Held));
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(CrystalStatus::parse("closed"), None);
        assert_eq!(CrystalStatus::parse(""), None);
    }

    #[test]
    fn event_kind_roundtrip() {
        for kind in [
            EventKind::Redeemed,
            EventKind::Destroyed,
            EventKind::VoidLoss,
            EventKind::AuditFix,
        ] {
            assert_eq!(EventKind::parse(kind.as_str()), kind);
        }
    }

    #[test]
    fn unknown_event_tag_becomes_custom() {
        let parsed = EventKind::parse("CRAFT_BEACON");
        assert_eq!(parsed, EventKind::Custom("CRAFT_BEACON".to_owned()));
        assert_eq!(parsed.as_str(), "CRAFT_BEACON");
    }
}
