//! At most one in-flight retrieval per cache path within a process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};

use tokio::sync::OwnedMutexGuard;

type Slot = tokio::sync::Mutex<()>;

static IN_FLIGHT: LazyLock<Mutex<HashMap<PathBuf, Weak<Slot>>>> = LazyLock::new(Default::default);

/// Held for the duration of a retrieval. Dropping it lets the next caller in.
#[derive(Debug)]
pub struct FlightGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Wait until no other retrieval for `path` is running, then claim it.
///
/// Relative paths are keyed by their absolute form, so `./x` and `$PWD/x`
/// share one slot.
pub async fn acquire(path: &Path) -> FlightGuard {
    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let slot = {
        let mut slots = IN_FLIGHT.lock().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|_, slot| slot.strong_count() > 0);

        match slots.get(&key).and_then(Weak::upgrade) {
            Some(slot) => slot,
            None => {
                let slot = Arc::new(Slot::new(()));
                slots.insert(key, Arc::downgrade(&slot));
                slot
            }
        }
    };

    FlightGuard {
        _guard: slot.lock_owned().await,
    }
}
