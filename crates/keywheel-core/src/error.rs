//! Rotation error types.

use thiserror::Error;

use crate::rotator::Phase;

/// Errors from rotator operations.
///
/// These cover misuse of the rotation state machine. The benign
/// "window not yet populated" condition is NOT an error — readers see it as
/// `None` from [`KeyWindow::default_key`](crate::KeyWindow::default_key) —
/// but bootstrap steps that require a default key surface `NotReady` when
/// invoked too early.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RotateError {
    /// The window holds fewer keys than the operation requires.
    #[error("window not ready: {len} of {needed} keys installed")]
    NotReady {
        /// Current window length.
        len: usize,
        /// Keys required before the operation is valid.
        needed: usize,
    },

    /// An operation was invoked in the wrong rotator phase.
    #[error("{op} invoked in {phase:?} phase")]
    Phase {
        /// Operation name.
        op: &'static str,
        /// Phase the rotator was in.
        phase: Phase,
    },
}
