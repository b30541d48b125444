/// Identifies one committed z-order.
///
/// Comparison takes into account the wrapping-around behavior of the underlying counter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CommitSerial(u32);

impl PartialOrd for CommitSerial {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        let distance = self.0.abs_diff(other.0);
        if distance < u32::MAX / 2 {
            self.0.partial_cmp(&other.0)
        } else {
            // wrap-around occurred, invert comparison
            other.0.partial_cmp(&self.0)
        }
    }
}

impl From<CommitSerial> for u32 {
    fn from(serial: CommitSerial) -> u32 {
        serial.0
    }
}

impl CommitSerial {
    /// Checks if this commit happened after another given commit
    pub fn is_newer_than(&self, other: &CommitSerial) -> bool {
        self > other
    }
}

/// Hands out [`CommitSerial`]s, skipping zero on wrap-around
#[derive(Debug)]
pub(crate) struct CommitCounter {
    next: u32,
}

impl Default for CommitCounter {
    fn default() -> Self {
        CommitCounter { next: 1 }
    }
}

impl CommitCounter {
    pub(crate) fn next_serial(&mut self) -> CommitSerial {
        if self.next == 0 {
            self.next = 1;
        }
        let serial = CommitSerial(self.next);
        self.next = self.next.wrapping_add(1);
        serial
    }
}
