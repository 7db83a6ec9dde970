//! Crystal identity encoding on physical items.
//!
//! A minted crystal's ledger id travels with the physical item in two
//! redundant forms: a namespaced metadata entry (the canonical
//! encoding) and a human-readable lore line (the legacy encoding, still
//! parsed for items tagged before the metadata key existed). Writing
//! always produces both; reading prefers the metadata entry.

use lucent_types::CrystalId;

use crate::item::ItemStack;

/// Metadata key carrying the crystal's ledger id.
pub const IDENTITY_KEY: &str = "lucent:crystal_id";

/// Item kind applied to every minted crystal stack.
pub const CRYSTAL_ITEM_KIND: &str = "crystal_shard";

/// Display name applied to every minted crystal stack.
pub const CRYSTAL_DISPLAY_NAME: &str = "Minted Crystal";

/// Lore-line prefix of the legacy textual encoding.
const LORE_PREFIX: &str = "Ledger ID: ";

/// Apply the canonical identity encoding to a stack.
///
/// Normalizes the stack to the minted-crystal kind, sets the display
/// name, writes the lore line, and stores the id under [`IDENTITY_KEY`].
pub fn apply_identity(stack: &mut ItemStack, id: CrystalId) {
    stack.kind = CRYSTAL_ITEM_KIND.to_owned();
    stack.display_name = Some(CRYSTAL_DISPLAY_NAME.to_owned());
    stack.lore = vec![format!("{LORE_PREFIX}{id}")];
    stack
        .metadata
        .insert(IDENTITY_KEY.to_owned(), id.to_string());
}

/// Read a crystal id from a stack, if one is encoded.
///
/// The metadata entry wins; the lore line is the backward-compatible
/// fallback for items tagged by older encodings. Malformed values in
/// either form read as untagged.
pub fn read_identity(stack: &ItemStack) -> Option<CrystalId> {
    if let Some(raw) = stack.metadata.get(IDENTITY_KEY) {
        if let Some(id) = CrystalId::parse(raw) {
            return Some(id);
        }
    }

    stack.lore.iter().find_map(|line| {
        line.strip_prefix(LORE_PREFIX)
            .and_then(|raw| CrystalId::parse(raw.trim()))
    })
}

/// Re-apply the canonical encoding to a stack that carries an identity.
///
/// Returns `true` when the stack was tagged (and has been normalized),
/// `false` when it carries no identity. Used when tagged items re-enter
/// the world, so legacy-encoded stacks pick up the metadata entry.
pub fn refresh_identity(stack: &mut ItemStack) -> bool {
    match read_identity(stack) {
        Some(id) => {
            apply_identity(stack, id);
            true
        }
        None => false,
    }
}
