/// Countdown measured in simulation ticks
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickTimer {
    remaining: Option<u16>,
}

impl TickTimer {
    pub fn new() -> Self {
        Self { remaining: None }
    }

    /// Arms (or re-arms) the timer to ring on the `ticks`-th call to `tick`.
    /// Zero rings on the next call
    pub fn arm(&mut self, ticks: u16) {
        self.remaining = Some(ticks.max(1));
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    pub fn is_armed(&self) -> bool {
        self.remaining.is_some()
    }

    pub fn remaining(&self) -> Option<u16> {
        self.remaining
    }

    /// Counts down one tick. Returns true exactly once, on the tick the
    /// timer rings, after which it is disarmed
    pub fn tick(&mut self) -> bool {
        let Some(remaining) = self.remaining.as_mut() else {
            return false;
        };
        *remaining -= 1;
        if *remaining == 0 {
            self.remaining = None;
            return true;
        }
        false
    }
}
