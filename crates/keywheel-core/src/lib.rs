//! Keywheel key-window state machine.
//!
//! A cluster shares a bounded, time-ordered set of symmetric keys. This
//! crate holds the data structure at the center of that scheme and the
//! state machine that drives it; all I/O stays behind traits so the logic
//! is fully testable without a network or a clock.
//!
//! # Key Window
//!
//! The [`KeyWindow`] is an ordered sequence of keys, newest first. With
//! `ahead` keys held in reserve and `behind` keys retained for old data,
//! the window never exceeds `ahead + 1 + behind` entries and the key at
//! index `ahead` is the single *default* key used for new encryption:
//!
//! ```text
//! index:   0 .. ahead-1   ahead     ahead+1 .. ahead+behind
//!          ┌──────────┐ ┌───────┐ ┌─────────────────────┐
//!          │ reserve  │ │default│ │ retained (decrypt)  │
//!          └──────────┘ └───────┘ └─────────────────────┘
//!          newest ──────────────────────────────▶ oldest
//! ```
//!
//! Each [`Rotator::tick`](Rotator::tick) installs one fresh key at the
//! front, which shifts the default one position and may push the oldest key
//! out of the window. Evicted material is zeroed before the slot is
//! discarded.
//!
//! # Security
//!
//! - Key material never appears in logs, audit lines, or `Debug` output;
//!   only names (public identifiers) do.
//! - Evicted keys are wiped with [`zeroize`] before being dropped, and every
//!   [`Key`] zeroizes its material on drop regardless.
//! - Material leaves the process exactly twice: inside an `install-key`
//!   broadcast and inside a snapshot reply, both by design.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bus;
pub mod env;
mod error;
mod key;
mod rotator;
mod window;

pub use bus::{AuditError, AuditSink, BusError, ClusterBus, InboundQuery};
pub use env::Environment;
pub use error::RotateError;
pub use key::{Key, KeyName};
pub use rotator::{ClusterEvent, Phase, Rotator};
pub use window::{KeySnapshot, KeyWindow, SharedKeyWindow};
