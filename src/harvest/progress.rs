//! Scroll progress detection.

/// Loop continuation decision after each scroll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    /// The page grew since the previous tick.
    Active,
    /// No growth for this many consecutive ticks.
    Stalled(u32),
    /// Stall tolerance exhausted; absorbing, no state regresses from here.
    Terminated,
}

/// Watches page-growth signals across scroll ticks and decides when the page
/// has genuinely stopped producing content.
///
/// Page extent alone is unreliable (lazy containers can grow without new
/// items) and item count alone can miss layout-only growth, so both signals
/// are sampled - but either one growing is enough to stay active. This is a
/// deliberate OR, to minimize false terminations.
#[derive(Debug)]
pub struct ProgressDetector {
    max_stalls: u32,
    last: Option<(i64, usize)>,
    stalls: u32,
    state: ProgressState,
}

impl ProgressDetector {
    pub fn new(max_stalls: u32) -> Self {
        Self {
            max_stalls,
            last: None,
            stalls: 0,
            state: ProgressState::Active,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ProgressState::Terminated
    }

    /// Feed one `(page extent, visible item count)` sample.
    ///
    /// The first sample only records the baseline. A tick where neither
    /// signal strictly grew counts as a stall; reaching the stall tolerance
    /// terminates, and termination sticks regardless of later samples.
    pub fn observe(&mut self, extent: i64, items: usize) -> ProgressState {
        if self.state == ProgressState::Terminated {
            return self.state;
        }
        match self.last {
            Some((prev_extent, prev_items)) if extent <= prev_extent && items <= prev_items => {
                self.stalls += 1;
                self.state = if self.stalls >= self.max_stalls {
                    ProgressState::Terminated
                } else {
                    ProgressState::Stalled(self.stalls)
                };
            }
            _ => {
                self.stalls = 0;
                self.state = ProgressState::Active;
            }
        }
        self.last = Some((extent, items));
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminates_after_max_consecutive_stalls() {
        let mut detector = ProgressDetector::new(5);
        assert_eq!(detector.observe(1000, 20), ProgressState::Active);
        for stall in 1..=4 {
            assert_eq!(detector.observe(1000, 20), ProgressState::Stalled(stall));
        }
        assert_eq!(detector.observe(1000, 20), ProgressState::Terminated);
        assert!(detector.is_terminated());
    }

    #[test]
    fn test_growth_resets_the_stall_counter() {
        let mut detector = ProgressDetector::new(5);
        detector.observe(1000, 20);
        detector.observe(1000, 20); // stall 1
        detector.observe(1000, 20); // stall 2
        detector.observe(1000, 20); // stall 3
        assert_eq!(detector.observe(1200, 20), ProgressState::Active);
        // Counter restarted: tick 5 after the reset is only the first stall
        assert_eq!(detector.observe(1200, 20), ProgressState::Stalled(1));
    }

    #[test]
    fn test_either_signal_growing_is_enough() {
        let mut detector = ProgressDetector::new(2);
        detector.observe(1000, 20);
        // Extent grows, count flat: still active
        assert_eq!(detector.observe(1100, 20), ProgressState::Active);
        // Count grows, extent flat: still active
        assert_eq!(detector.observe(1100, 24), ProgressState::Active);
    }

    #[test]
    fn test_termination_is_absorbing() {
        let mut detector = ProgressDetector::new(1);
        detector.observe(1000, 20);
        assert_eq!(detector.observe(1000, 20), ProgressState::Terminated);
        // A late growth signal must not resurrect the loop
        assert_eq!(detector.observe(9000, 90), ProgressState::Terminated);
    }

    #[test]
    fn test_shrinking_page_counts_as_stall() {
        let mut detector = ProgressDetector::new(2);
        detector.observe(1000, 20);
        assert_eq!(detector.observe(900, 18), ProgressState::Stalled(1));
    }
}
