use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("another request is already in flight")]
pub struct Busy;

/// Single-slot lock held for the duration of one request. Released when the
/// guard drops, whatever the request's result.
#[derive(Debug, Default)]
pub struct BusyFlag {
    busy: AtomicBool,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<BusyGuard<'_>, Busy> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyGuard { flag: self })
            .map_err(|_| Busy)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a BusyFlag,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.busy.store(false, Ordering::Release);
    }
}
