use crate::detection::domain::detection::DetectionClass;

/// Per-class save debouncing for live sources.
///
/// Batch sources are never throttled: each file is an independent sample,
/// not a time-adjacent one, so a throttle built with `is_live = false`
/// always allows. Timestamps are monotonic seconds supplied by the caller.
#[derive(Debug)]
pub struct SaveThrottle {
    is_live: bool,
    last_save: [Option<f64>; 2],
}

impl SaveThrottle {
    pub fn new(is_live: bool) -> Self {
        Self {
            is_live,
            last_save: [None; 2],
        }
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    /// Whether a save for `class` is permitted at `now`. A save is allowed
    /// when strictly more than `min_interval` seconds have passed since the
    /// last recorded save of the same class.
    pub fn allow(&self, class: DetectionClass, now: f64, min_interval: f64) -> bool {
        if !self.is_live {
            return true;
        }
        match self.last_save[class.index()] {
            None => true,
            Some(last) => now - last > min_interval,
        }
    }

    /// Callers record a save only after the artifact was actually persisted.
    pub fn record(&mut self, class: DetectionClass, now: f64) {
        if self.is_live {
            self.last_save[class.index()] = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_save_always_allowed() {
        let throttle = SaveThrottle::new(true);
        assert!(throttle.allow(DetectionClass::Face, 100.0, 1.0));
        assert!(throttle.allow(DetectionClass::Plate, 0.0, 1.0));
    }

    #[test]
    fn test_interval_enforced_for_live() {
        let mut throttle = SaveThrottle::new(true);
        let t = 50.0;

        assert!(throttle.allow(DetectionClass::Face, t, 1.0));
        throttle.record(DetectionClass::Face, t);

        assert!(!throttle.allow(DetectionClass::Face, t + 0.5, 1.0));
        assert!(throttle.allow(DetectionClass::Face, t + 1.5, 1.0));
    }

    #[test]
    fn test_exact_interval_is_still_blocked() {
        let mut throttle = SaveThrottle::new(true);
        throttle.record(DetectionClass::Face, 10.0);
        // Strictly-greater comparison: exactly min_interval later is denied.
        assert!(!throttle.allow(DetectionClass::Face, 11.0, 1.0));
    }

    #[test]
    fn test_classes_are_independent() {
        let mut throttle = SaveThrottle::new(true);
        throttle.record(DetectionClass::Face, 10.0);

        assert!(!throttle.allow(DetectionClass::Face, 10.5, 1.0));
        assert!(throttle.allow(DetectionClass::Plate, 10.5, 1.0));
    }

    #[test]
    fn test_batch_mode_never_throttles() {
        let mut throttle = SaveThrottle::new(false);
        throttle.record(DetectionClass::Plate, 10.0);
        // Two samples at the same wall-clock second both pass.
        assert!(throttle.allow(DetectionClass::Plate, 10.0, 1.0));
        assert!(throttle.allow(DetectionClass::Plate, 10.0, 1.0));
    }
}
