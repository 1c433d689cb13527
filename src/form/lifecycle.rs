use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Mounted flag shared between a container and the continuations it spawns. Anything that
/// resumes after an await checks it before touching state.
#[derive(Clone, Debug)]
pub struct Lifecycle {
    mounted: Arc<AtomicBool>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Returns `true` the first time it is called.
    pub fn unmount(&self) -> bool {
        self.mounted.swap(false, Ordering::SeqCst)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
