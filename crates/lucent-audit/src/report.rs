//! The audit report and its operator-facing text rendering.
//!
//! The rendering is plain text with bounded detail lists: each category
//! shows at most [`MAX_DETAILS`] entries and closes with an explicit
//! "... N more" marker past the limit, so a damaged ledger cannot flood
//! an operator's console.

use core::fmt;

use lucent_types::{CrystalId, CrystalRecord, SupplySnapshot};

/// Maximum entries shown per detail list.
pub const MAX_DETAILS: usize = 5;

/// A physically observed crystal the ledger did not expect to be held.
#[derive(Debug, Clone)]
pub struct UnexpectedCrystal {
    /// The observed crystal.
    pub id: CrystalId,
    /// The ledger's actual status, or an annotation when the lookup
    /// itself failed.
    pub status_note: String,
    /// Every physical context the identity was observed in.
    pub contexts: Vec<String>,
}

/// A point-in-time reconciliation between ledger and world.
#[derive(Debug, Default)]
pub struct AuditReport {
    /// Global per-status counts at snapshot time.
    pub totals: SupplySnapshot,
    /// `ACTIVE` entries confirmed in place.
    pub confirmed_active: u64,
    /// `ACTIVE` entries whose marker is gone. Actionable.
    pub missing_active: Vec<CrystalRecord>,
    /// `ACTIVE` entries in unloaded regions. Indeterminate.
    pub unloaded_active: Vec<CrystalRecord>,
    /// Number of `HELD` entries in the ledger.
    pub held_total: usize,
    /// `HELD` entries found somewhere in the context index.
    pub located_held: usize,
    /// `HELD` entries found nowhere (offline, unloaded, or truly gone).
    pub unaccounted_held: Vec<CrystalRecord>,
    /// Observed identities the ledger does not list as `HELD`.
    pub unexpected: Vec<UnexpectedCrystal>,
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Ledger totals: active={}, held={}, lost={}, redeemed={} (total={})",
            self.totals.active,
            self.totals.held,
            self.totals.lost,
            self.totals.redeemed,
            self.totals.total(),
        )?;

        writeln!(
            f,
            "Active crystals: {} confirmed, {} missing, {} unloaded",
            self.confirmed_active,
            self.missing_active.len(),
            self.unloaded_active.len(),
        )?;

        if !self.missing_active.is_empty() {
            writeln!(f, "Missing active entries:")?;
            write_truncated(f, &self.missing_active, |entry| {
                format!("{} at {}", entry.id, entry.describe_position())
            })?;
        }

        if !self.unloaded_active.is_empty() {
            writeln!(f, "Active crystals in unloaded cells:")?;
            write_truncated(f, &self.unloaded_active, |entry| {
                format!("{} at {}", entry.id, entry.describe_position())
            })?;
        }

        writeln!(
            f,
            "Held crystals: {} in ledger, {} located, {} unaccounted",
            self.held_total,
            self.located_held,
            self.unaccounted_held.len(),
        )?;

        if !self.unaccounted_held.is_empty() {
            writeln!(
                f,
                "Unaccounted held entries (may be offline or in unloaded cells):"
            )?;
            write_truncated(f, &self.unaccounted_held, |entry| {
                format!("{}{}", entry.id, held_details(entry))
            })?;
        }

        if !self.unexpected.is_empty() {
            writeln!(f, "Unexpected crystals found:")?;
            for entry in self.unexpected.iter().take(MAX_DETAILS) {
                writeln!(f, " - {} status={}", entry.id, entry.status_note)?;
                for context in entry.contexts.iter().take(MAX_DETAILS) {
                    writeln!(f, "    * {context}")?;
                }
                if entry.contexts.len() > MAX_DETAILS {
                    writeln!(
                        f,
                        "    * ... {} more contexts",
                        entry.contexts.len().saturating_sub(MAX_DETAILS),
                    )?;
                }
            }
            if self.unexpected.len() > MAX_DETAILS {
                writeln!(
                    f,
                    " - ... {} more",
                    self.unexpected.len().saturating_sub(MAX_DETAILS),
                )?;
            }
        }

        Ok(())
    }
}

/// Write a bounded detail list with the overflow marker.
fn write_truncated<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    render: impl Fn(&T) -> String,
) -> fmt::Result {
    for item in items.iter().take(MAX_DETAILS) {
        writeln!(f, " - {}", render(item))?;
    }
    if items.len() > MAX_DETAILS {
        writeln!(f, " - ... {} more", items.len().saturating_sub(MAX_DETAILS))?;
    }
    Ok(())
}

/// Trailing annotation for an unaccounted held entry.
fn held_details(entry: &CrystalRecord) -> String {
    if let Some(position) = &entry.position {
        return format!(" (last seen at {position})");
    }
    if let Some(area) = &entry.area_id {
        return format!(" (area {area})");
    }
    String::new()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lucent_types::{CrystalStatus, Position};

    use super::*;

    /// An unaccounted held record with neither position nor area.
    fn bare_held() -> CrystalRecord {
        CrystalRecord {
            id: CrystalId::new(),
            area_id: None,
            status: CrystalStatus::Held,
            position: None,
        }
    }

    #[test]
    fn report_renders_totals_and_breakdowns() {
        let mut report = AuditReport::default();
        report.totals.active = 2;
        report.totals.held = 1;
        report.confirmed_active = 2;
        report.held_total = 1;
        report.located_held = 1;

        let text = report.to_string();
        assert!(text.contains("Ledger totals: active=2, held=1, lost=0, redeemed=0 (total=3)"));
        assert!(text.contains("Active crystals: 2 confirmed, 0 missing, 0 unloaded"));
        assert!(text.contains("Held crystals: 1 in ledger, 1 located, 0 unaccounted"));
        // Empty categories render no detail sections.
        assert!(!text.contains("Missing active entries"));
        assert!(!text.contains("Unexpected"));
    }

    #[test]
    fn long_lists_truncate_with_overflow_marker() {
        let mut report = AuditReport::default();
        for _ in 0..8 {
            report.unaccounted_held.push(bare_held());
        }
        report.held_total = 8;

        let text = report.to_string();
        assert!(text.contains("Unaccounted held entries"));
        assert!(text.contains(" - ... 3 more"));
        // Exactly MAX_DETAILS detail lines plus the marker.
        let detail_lines = text.lines().filter(|l| l.starts_with(" - ")).count();
        assert_eq!(detail_lines, MAX_DETAILS + 1);
    }

    #[test]
    fn unexpected_contexts_truncate_independently() {
        let mut report = AuditReport::default();
        report.unexpected.push(UnexpectedCrystal {
            id: CrystalId::new(),
            status_note: "LOST".to_owned(),
            contexts: (0..9).map(|i| format!("context {i}")).collect(),
        });

        let text = report.to_string();
        assert!(text.contains("status=LOST"));
        assert!(text.contains("    * context 0"));
        assert!(text.contains("    * ... 4 more contexts"));
    }

    #[test]
    fn held_annotation_prefers_position_over_area() {
        let with_position = CrystalRecord {
            id: CrystalId::new(),
            area_id: Some("geode-north".to_owned()),
            status: CrystalStatus::Held,
            position: Some(Position::new("overworld", 1, 2, 3)),
        };
        assert_eq!(
            held_details(&with_position),
            " (last seen at overworld (1, 2, 3))",
        );

        let with_area = CrystalRecord {
            position: None,
            ..with_position
        };
        assert_eq!(held_details(&with_area), " (area geode-north)");
        assert_eq!(held_details(&bare_held()), "");
    }
}
