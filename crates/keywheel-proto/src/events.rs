//! Key-lifecycle event names.
//!
//! Every event broadcast on the cluster bus carries one of these names,
//! prefixed with the per-deployment event prefix so multiple keywheel
//! instances can share one bus. Payload contents:
//!
//! - `install-key`: full key bytes (name ‖ material)
//! - `remove-key`: key name only (material never leaves the process)
//! - `set-default-key`: key name only
//! - `wipe-keys`: empty, sent coalesced before a fresh bootstrap

/// Byte length of a key name. Names are public identifiers, safe to
/// broadcast and log.
pub const NAME_LEN: usize = 16;

/// A new key is valid for decryption/verification, not yet default.
pub const INSTALL_KEY_EVENT: &str = "install-key";

/// A key has been retired; members destroy its material.
pub const REMOVE_KEY_EVENT: &str = "remove-key";

/// The named key is now used for new encryption/signing.
pub const SET_DEFAULT_KEY_EVENT: &str = "set-default-key";

/// Reset signal preceding a fresh bootstrap.
pub const WIPE_KEYS_EVENT: &str = "wipe-keys";

/// Query name answered with a [`SnapshotResponse`](crate::SnapshotResponse).
pub const RETRIEVE_KEYS_QUERY: &str = "retrieve-keys";

/// Full bus name for an event or query: `prefix` + `name`.
pub fn prefixed(prefix: &str, name: &str) -> String {
    let mut full = String::with_capacity(prefix.len() + name.len());
    full.push_str(prefix);
    full.push_str(name);
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_concatenates() {
        assert_eq!(prefixed("keywheel:", RETRIEVE_KEYS_QUERY), "keywheel:retrieve-keys");
        assert_eq!(prefixed("", INSTALL_KEY_EVENT), "install-key");
    }
}
