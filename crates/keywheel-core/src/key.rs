//! Key value types.

use std::fmt;

use keywheel_proto::NAME_LEN;
use zeroize::Zeroize;

use crate::env::Environment;

/// Public identifier of a key.
///
/// Names are opaque random bytes, fixed-length, and safe to broadcast or
/// log. They identify keys in `remove-key` and `set-default-key` events,
/// where the material must not travel.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyName([u8; NAME_LEN]);

impl KeyName {
    /// Name bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyName({})", hex::encode(self.0))
    }
}

/// A symmetric key: a public name plus secret material.
///
/// Immutable once created. The material is zeroized on drop, and
/// [`wipe()`](Self::wipe) zeroes it eagerly when the window evicts the key,
/// so evicted slots never hold live secrets. `Debug` prints the name and
/// material length only.
pub struct Key {
    name: KeyName,
    material: Vec<u8>,
}

impl Key {
    /// Generate a fresh key from the environment's CSPRNG.
    ///
    /// `material_len` is the configured secret size in bytes.
    pub fn generate<E: Environment>(env: &E, material_len: usize) -> Self {
        let mut name = [0u8; NAME_LEN];
        env.random_bytes(&mut name);

        let mut material = vec![0u8; material_len];
        env.random_bytes(&mut material);

        Self { name: KeyName(name), material }
    }

    /// Public name of this key.
    pub fn name(&self) -> &KeyName {
        &self.name
    }

    /// Secret material length in bytes.
    pub fn material_len(&self) -> usize {
        self.material.len()
    }

    /// Full wire representation: name ‖ material.
    ///
    /// Used for `install-key` payloads and snapshot replies, the only two
    /// places material leaves the process.
    pub fn wire_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(NAME_LEN + self.material.len());
        bytes.extend_from_slice(&self.name.0);
        bytes.extend_from_slice(&self.material);
        bytes
    }

    /// Overwrite the material with zeros.
    ///
    /// Called on eviction before the key value is discarded. Uses
    /// [`zeroize`] so the clear is not optimized away.
    pub fn wipe(&mut self) {
        self.material.zeroize();
    }

    /// Whether the material is all zero bytes.
    pub fn is_wiped(&self) -> bool {
        self.material.iter().all(|b| *b == 0)
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.material.zeroize();
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("name", &self.name)
            .field("material_len", &self.material.len())
            .finish()
    }
}
