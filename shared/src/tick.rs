use std::time::Duration;

use log::warn;

use crate::{ParticipantId, Tick};

/// Configuration for a fixed-rate simulation clock
#[derive(Clone, Debug)]
pub struct TickConfig {
    /// Simulated time covered by one tick
    pub tick_interval: Duration,
    /// Upper bound on ticks run for one `advance` call. Elapsed time beyond
    /// this is discarded rather than simulated in a burst
    pub max_catch_up: u16,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            max_catch_up: 10,
        }
    }
}

/// Proof that the holder is inside a simulation tick on behalf of `writer`.
///
/// Only a [`TickClock`] can produce one, so authoritative field writes,
/// which require it, cannot happen from presentation code.
#[derive(Debug)]
pub struct SimulationTick {
    tick: Tick,
    writer: ParticipantId,
}

impl SimulationTick {
    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn writer(&self) -> ParticipantId {
        self.writer
    }
}

/// Accumulates wall-clock time and releases it as whole fixed-size ticks
pub struct TickClock {
    tick_interval: Duration,
    max_catch_up: u16,
    accumulator: Duration,
    pending: u16,
    current: Tick,
}

impl TickClock {
    pub fn new(config: &TickConfig) -> Self {
        Self::starting_at(config, 0)
    }

    /// A clock whose next tick is `current + 1`. Peers joining late start
    /// from the authority's tick
    pub fn starting_at(config: &TickConfig, current: Tick) -> Self {
        Self {
            tick_interval: config.tick_interval,
            max_catch_up: config.max_catch_up.max(1),
            accumulator: Duration::ZERO,
            pending: 0,
            current,
        }
    }

    /// Adds elapsed time, returns how many ticks are now due
    pub fn advance(&mut self, elapsed: Duration) -> u16 {
        self.accumulator += elapsed;
        while self.accumulator >= self.tick_interval {
            self.accumulator -= self.tick_interval;
            if self.pending == self.max_catch_up {
                warn!(
                    "simulation fell behind by more than {} ticks, dropping {:?}",
                    self.max_catch_up, self.accumulator
                );
                self.accumulator = Duration::ZERO;
                break;
            }
            self.pending += 1;
        }
        self.pending
    }

    /// Consumes one due tick, if any
    pub fn next_tick(&mut self, writer: ParticipantId) -> Option<SimulationTick> {
        if self.pending == 0 {
            return None;
        }
        self.pending -= 1;
        self.current = self.current.wrapping_add(1);
        Some(SimulationTick {
            tick: self.current,
            writer,
        })
    }

    /// The most recently started tick
    pub fn current_tick(&self) -> Tick {
        self.current
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// The number of whole ticks needed to cover `duration`, rounded up
    pub fn ticks_for(&self, duration: Duration) -> u16 {
        ticks_for(self.tick_interval, duration)
    }

    /// Fraction of the next tick already accumulated, in [0, 1)
    pub fn overshoot(&self) -> f32 {
        self.accumulator.as_secs_f32() / self.tick_interval.as_secs_f32()
    }
}

pub fn ticks_for(tick_interval: Duration, duration: Duration) -> u16 {
    let interval = tick_interval.as_micros().max(1);
    let ticks = (duration.as_micros() + interval - 1) / interval;
    ticks.min(u16::MAX as u128) as u16
}
