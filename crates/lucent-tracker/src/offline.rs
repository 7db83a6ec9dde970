//! Offline-holding snapshot capture.
//!
//! When a holder disconnects, every crystal found in their containers
//! is recorded with a per-slot context line ("inventory slot 4"). The
//! store replaces the holder's rows wholesale, so the snapshot always
//! reflects the most recent disconnect; reconnecting clears it.

use std::collections::BTreeMap;

use lucent_types::CrystalId;
use lucent_world::codec;
use lucent_world::item::ContainerSnapshot;

/// Scan a holder's containers for encoded crystals.
///
/// Returns context lines grouped per crystal, one line per occupied
/// slot the crystal was found in.
pub fn capture_contexts(containers: &[ContainerSnapshot]) -> BTreeMap<CrystalId, Vec<String>> {
    let mut contexts: BTreeMap<CrystalId, Vec<String>> = BTreeMap::new();

    for container in containers {
        for (slot, stack) in container.occupied() {
            if let Some(crystal) = codec::read_identity(stack) {
                contexts
                    .entry(crystal)
                    .or_default()
                    .push(format!("{} slot {slot}", container.label));
            }
        }
    }

    contexts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lucent_world::item::ItemStack;

    use super::*;

    /// Helper: a stack encoding the given crystal.
    fn tagged(crystal: CrystalId) -> ItemStack {
        let mut stack = ItemStack::of("crystal_shard", 1);
        codec::apply_identity(&mut stack, crystal);
        stack
    }

    #[test]
    fn capture_records_slot_contexts_per_crystal() {
        let a = CrystalId::new();
        let b = CrystalId::new();

        let containers = vec![
            ContainerSnapshot::new(
                "inventory",
                vec![
                    Some(tagged(a)),
                    None,
                    Some(ItemStack::of("stone", 12)),
                    Some(tagged(b)),
                ],
            ),
            ContainerSnapshot::new("vault", vec![Some(tagged(a))]),
        ];

        let contexts = capture_contexts(&containers);
        assert_eq!(contexts.len(), 2);
        assert_eq!(
            contexts.get(&a).unwrap(),
            &vec!["inventory slot 0".to_owned(), "vault slot 0".to_owned()],
        );
        assert_eq!(contexts.get(&b).unwrap(), &vec!["inventory slot 3".to_owned()]);
    }

    #[test]
    fn capture_of_untagged_containers_is_empty() {
        let containers = vec![ContainerSnapshot::new(
            "inventory",
            vec![Some(ItemStack::of("stone", 3)), None],
        )];
        assert!(capture_contexts(&containers).is_empty());
    }
}
