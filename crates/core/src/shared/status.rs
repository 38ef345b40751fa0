use std::sync::{Arc, Mutex};

/// Per-cycle detection outcome summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DetectionFlags {
    pub face_in_roi: bool,
    pub plate_found: bool,
}

/// Point-in-time view of the running source, published by the worker once
/// per cycle and read by the UI path on its own schedule.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusSnapshot {
    pub descriptor: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub flags: DetectionFlags,
}

/// Single-writer cell holding the latest [`StatusSnapshot`].
///
/// The worker swaps in a fresh `Arc` each cycle; readers clone the `Arc`
/// under a short lock and never see a partially-written snapshot.
#[derive(Default)]
pub struct StatusCell {
    inner: Mutex<Arc<StatusSnapshot>>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: StatusSnapshot) {
        *self.inner.lock().expect("status lock poisoned") = Arc::new(snapshot);
    }

    pub fn load(&self) -> Arc<StatusSnapshot> {
        self.inner.lock().expect("status lock poisoned").clone()
    }
}
