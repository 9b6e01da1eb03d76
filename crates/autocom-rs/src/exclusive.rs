// crates/autocom-rs/src/exclusive.rs
use crate::hal::{Area, ExclusiveArea};

/// An exclusive area that is briefly released every `threshold` loop iterations.
///
/// Loops over group membership can be long. Releasing and re-acquiring the
/// area caps the time interrupts stay masked; the membership tables are
/// immutable, so nothing the loop relies on changes across the gap.
#[derive(Debug)]
pub struct ChunkedSection {
    area: Area,
    threshold: u16,
    count: u16,
}

impl ChunkedSection {
    /// Enters `area`. A `threshold` of 0 never releases the area.
    pub fn enter<E: ExclusiveArea + ?Sized>(lock: &mut E, area: Area, threshold: u16) -> Self {
        lock.enter(area);
        Self { area, threshold, count: 0 }
    }

    /// Counts one iteration; releases and re-enters the area once the threshold is reached.
    pub fn check<E: ExclusiveArea + ?Sized>(&mut self, lock: &mut E) {
        if self.threshold == 0 {
            return;
        }
        self.count += 1;
        if self.count >= self.threshold {
            lock.exit(self.area);
            lock.enter(self.area);
            self.count = 0;
        }
    }

    /// Temporarily leaves the area, e.g. to invoke user callbacks, then re-enters it.
    pub fn suspend<E: ExclusiveArea + ?Sized, F: FnOnce(&mut E)>(&mut self, lock: &mut E, f: F) {
        lock.exit(self.area);
        f(lock);
        lock.enter(self.area);
        self.count = 0;
    }

    pub fn leave<E: ExclusiveArea + ?Sized>(self, lock: &mut E) {
        lock.exit(self.area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[derive(Default)]
    struct TraceLock {
        depth: i32,
        trace: Vec<(&'static str, Area)>,
    }

    impl ExclusiveArea for TraceLock {
        fn enter(&mut self, area: Area) {
            self.depth += 1;
            self.trace.push(("enter", area));
        }
        fn exit(&mut self, area: Area) {
            self.depth -= 1;
            self.trace.push(("exit", area));
        }
    }

    #[test]
    fn releases_every_threshold_iterations() {
        let mut lock = TraceLock::default();
        let mut section = ChunkedSection::enter(&mut lock, Area::Rx, 2);
        for _ in 0..5 {
            section.check(&mut lock);
        }
        section.leave(&mut lock);

        assert_eq!(lock.depth, 0);
        // Initial enter, two release/re-enter pairs, final exit.
        assert_eq!(lock.trace.len(), 6);
        assert_eq!(lock.trace[1], ("exit", Area::Rx));
        assert_eq!(lock.trace[2], ("enter", Area::Rx));
    }

    #[test]
    fn zero_threshold_holds_the_area() {
        let mut lock = TraceLock::default();
        let mut section = ChunkedSection::enter(&mut lock, Area::Tx, 0);
        for _ in 0..100 {
            section.check(&mut lock);
        }
        section.leave(&mut lock);
        assert_eq!(lock.trace, [("enter", Area::Tx), ("exit", Area::Tx)]);
    }

    #[test]
    fn suspend_runs_outside_the_area() {
        let mut lock = TraceLock::default();
        let mut section = ChunkedSection::enter(&mut lock, Area::Rx, 0);
        section.suspend(&mut lock, |l| assert_eq!(l.depth, 0));
        assert_eq!(lock.depth, 1);
        section.leave(&mut lock);
    }
}
