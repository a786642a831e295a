//! Cooperative cancellation for long codec runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared abort flag checked by the codec between node reads and
/// emissions.
///
/// The codec itself never blocks; cancellation is the caller's
/// responsibility. Clone the flag, hand one copy to the codec call and
/// trip the other from wherever the abort decision is made.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a new, untripped flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fail with [`XmlError::Cancelled`] when the optional flag is tripped.
pub(crate) fn ensure_not_cancelled(
    cancel: Option<&CancelFlag>,
) -> Result<(), crate::error::XmlError> {
    if cancel.is_some_and(CancelFlag::is_cancelled) {
        return Err(crate::error::XmlError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let copy = flag.clone();
        assert!(!copy.is_cancelled());
        flag.cancel();
        assert!(copy.is_cancelled());
    }
}
