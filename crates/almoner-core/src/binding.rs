// crates/almoner-core/src/binding.rs
//
// A configuration cell that accepts exactly one write.

use serde::{Deserialize, Serialize};

use crate::error::AlmonerError;

/// An option-like value frozen after its first assignment.
///
/// Used for bindings that must never be re-pointed once established, such
/// as the treasury's governance module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOnce<T> {
    value: Option<T>,
}

impl<T> WriteOnce<T> {
    /// An unbound cell.
    pub fn new() -> Self {
        Self { value: None }
    }

    /// Bind the cell.
    ///
    /// # Errors
    /// Returns `AlmonerError::GovernanceAlreadyBound` if a value was already set.
    pub fn set(&mut self, value: T) -> Result<(), AlmonerError> {
        if self.value.is_some() {
            return Err(AlmonerError::GovernanceAlreadyBound);
        }
        self.value = Some(value);
        Ok(())
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.value.is_some()
    }
}

impl<T> Default for WriteOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}
