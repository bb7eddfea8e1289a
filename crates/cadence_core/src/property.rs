//! Property endpoints the timing core can drive.
//!
//! The core never knows what rendering or binding machinery sits behind a
//! property; it only reads and writes through this capability. The scene
//! layer supplies adapters at the boundary.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::value::{AnimValue, PropertyError};

/// Read/write capability for an animatable property.
///
/// Implementations must be safe to call from the pulse thread while other
/// threads hold the same endpoint. A failed `set` stops the animation that
/// issued it but must leave the endpoint usable.
pub trait PropertyTarget: Send + Sync {
    fn get(&self) -> AnimValue;
    fn set(&self, value: AnimValue) -> Result<(), PropertyError>;
}

struct Cell {
    value: Mutex<AnimValue>,
}

impl Cell {
    fn lock(&self) -> std::sync::MutexGuard<'_, AnimValue> {
        // A poisoned cell still holds a valid value.
        self.value.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PropertyTarget for Cell {
    fn get(&self) -> AnimValue {
        self.lock().clone()
    }

    fn set(&self, value: AnimValue) -> Result<(), PropertyError> {
        let mut guard = self.lock();
        if guard.kind() != value.kind() {
            return Err(PropertyError::KindMismatch {
                expected: guard.kind(),
                actual: value.kind(),
            });
        }
        *guard = value;
        Ok(())
    }
}

/// A plain shared-cell property, useful for tests and headless runs.
///
/// Clones share the same cell, and every [`SharedProperty::target`] call
/// hands out the same underlying endpoint, so key frames built from them
/// group into a single track.
#[derive(Clone)]
pub struct SharedProperty {
    cell: Arc<Cell>,
}

impl SharedProperty {
    pub fn new(initial: impl Into<AnimValue>) -> Self {
        Self {
            cell: Arc::new(Cell {
                value: Mutex::new(initial.into()),
            }),
        }
    }

    /// The endpoint to hand to key values targeting this property.
    pub fn target(&self) -> Arc<dyn PropertyTarget> {
        self.cell.clone()
    }

    /// Current value of the cell.
    pub fn value(&self) -> AnimValue {
        self.cell.get()
    }
}

impl fmt::Debug for SharedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedProperty").field(&self.value()).finish()
    }
}
