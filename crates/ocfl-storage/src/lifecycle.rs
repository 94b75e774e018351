use parking_lot::Mutex;
use tracing::info;

use crate::error::{StorageError, StorageResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Uninitialized,
    Ready,
    Closed,
}

/// Open/closed state shared by the storage backends.
///
/// A backend is usable only between a successful
/// [`Lifecycle::initialize`] and [`Lifecycle::close`].
#[derive(Debug)]
pub(crate) struct Lifecycle {
    name: &'static str,
    state: Mutex<State>,
}

impl Lifecycle {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(State::Uninitialized),
        }
    }

    /// Run `init` once. Repeated calls on an open storage are no-ops; a
    /// failed `init` leaves the storage uninitialized.
    pub(crate) fn initialize<F>(&self, init: F) -> StorageResult<()>
    where
        F: FnOnce() -> StorageResult<()>,
    {
        let mut state = self.state.lock();
        match *state {
            State::Ready => Ok(()),
            State::Closed => Err(StorageError::IllegalState(format!(
                "{} storage is closed",
                self.name
            ))),
            State::Uninitialized => {
                init()?;
                *state = State::Ready;
                info!(storage = self.name, "storage initialized");
                Ok(())
            }
        }
    }

    pub(crate) fn ensure_open(&self) -> StorageResult<()> {
        match *self.state.lock() {
            State::Ready => Ok(()),
            State::Uninitialized => Err(StorageError::IllegalState(format!(
                "{} storage must be initialized before use",
                self.name
            ))),
            State::Closed => Err(StorageError::IllegalState(format!(
                "{} storage is closed",
                self.name
            ))),
        }
    }

    /// Returns `true` if this call closed the storage.
    pub(crate) fn close(&self) -> bool {
        let mut state = self.state.lock();
        if *state == State::Closed {
            return false;
        }
        *state = State::Closed;
        info!(storage = self.name, "storage closed");
        true
    }
}
