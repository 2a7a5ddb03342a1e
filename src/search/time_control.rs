//! Clock bookkeeping for the root driver.
//!
//! Three clock styles are supported; each turn the driver asks the clock for
//! a per-move millisecond allocation and converts it into a node budget via
//! the learned nodes-per-second estimate. The estimate adapts asymmetrically:
//! fast upward (weight 0.66) so better hardware utilization is trusted
//! quickly, slow downward (weight 0.33) so a single noisy round does not
//! crater the budget.

/// Smoothing weight applied when a sample beats the running estimate.
const NPS_WEIGHT_UP: f64 = 0.66;
/// Smoothing weight applied when a sample falls short of it.
const NPS_WEIGHT_DOWN: f64 = 0.33;

/// Fraction of the remaining sudden-death clock spent per move.
const INCREMENTAL_HORIZON_MOVES: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeControl {
    /// Fixed budget every move, no running clock.
    FixedPerMove { ms: u64 },
    /// N moves per session; the session budget is re-granted when the move
    /// counter runs out.
    Conventional {
        moves_per_session: u32,
        session_ms: u64,
        increment_ms: u64,
    },
    /// Sudden-death clock with a per-move increment (ICS style).
    Incremental { base_ms: u64, increment_ms: u64 },
}

/// A time control plus its live clock state.
#[derive(Debug, Clone, Copy)]
pub struct ClockState {
    control: TimeControl,
    remaining_ms: u64,
    moves_to_bonus: u32,
}

impl ClockState {
    pub fn new(control: TimeControl) -> Self {
        let (remaining_ms, moves_to_bonus) = match control {
            TimeControl::FixedPerMove { ms } => (ms, 0),
            TimeControl::Conventional {
                moves_per_session,
                session_ms,
                ..
            } => (session_ms, moves_per_session.max(1)),
            TimeControl::Incremental { base_ms, .. } => (base_ms, 0),
        };
        Self {
            control,
            remaining_ms,
            moves_to_bonus,
        }
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Milliseconds this move may spend. Never exceeds the remaining clock.
    pub fn allocate_ms(&self) -> u64 {
        match self.control {
            TimeControl::FixedPerMove { ms } => ms,
            TimeControl::Conventional { increment_ms, .. } => {
                let share = self.remaining_ms / u64::from(self.moves_to_bonus.max(1));
                (share + increment_ms).min(self.remaining_ms).max(1)
            }
            TimeControl::Incremental { increment_ms, .. } => {
                let share = self.remaining_ms / INCREMENTAL_HORIZON_MOVES;
                (share + increment_ms).min(self.remaining_ms).max(1)
            }
        }
    }

    /// Total nodes this move may search, from the per-move allocation and
    /// the learned throughput estimate.
    pub fn node_budget(&self, nodes_per_second: f64) -> u64 {
        let nps = nodes_per_second.max(1.0);
        let budget = (self.allocate_ms() as f64 / 1000.0) * nps;
        (budget as u64).max(1)
    }

    /// Charge one completed move against the clock: subtract elapsed time,
    /// credit the increment, and re-grant the session budget when a
    /// conventional session rolls over.
    pub fn apply_elapsed(&mut self, elapsed_ms: u64) {
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
        match self.control {
            TimeControl::FixedPerMove { ms } => {
                self.remaining_ms = ms;
            }
            TimeControl::Conventional {
                moves_per_session,
                session_ms,
                increment_ms,
            } => {
                self.remaining_ms += increment_ms;
                self.moves_to_bonus = self.moves_to_bonus.saturating_sub(1);
                if self.moves_to_bonus == 0 {
                    self.remaining_ms += session_ms;
                    self.moves_to_bonus = moves_per_session.max(1);
                }
            }
            TimeControl::Incremental { increment_ms, .. } => {
                self.remaining_ms += increment_ms;
            }
        }
    }
}

impl Default for ClockState {
    fn default() -> Self {
        Self::new(TimeControl::FixedPerMove { ms: 5_000 })
    }
}

/// Asymmetric exponential smoothing of the nodes-per-second estimate.
/// The result is clamped so the estimate can never go negative.
pub fn smooth_nps(estimate: f64, sample: f64) -> f64 {
    let weight = if sample > estimate {
        NPS_WEIGHT_UP
    } else {
        NPS_WEIGHT_DOWN
    };
    (estimate + weight * (sample - estimate)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::{smooth_nps, ClockState, TimeControl};

    #[test]
    fn smoothing_is_asymmetric() {
        // Rising sample: E + 0.66(S - E).
        assert_eq!(smooth_nps(1_000_000.0, 2_000_000.0), 1_660_000.0);
        // Falling sample: E + 0.33(S - E).
        assert_eq!(smooth_nps(1_000_000.0, 500_000.0), 835_000.0);
        // Equal sample takes the slow branch and stays put.
        assert_eq!(smooth_nps(750.0, 750.0), 750.0);
    }

    #[test]
    fn smoothing_never_goes_negative() {
        assert_eq!(smooth_nps(10.0, -1_000_000.0), 0.0);
        assert!(smooth_nps(0.0, 0.0) >= 0.0);
    }

    #[test]
    fn fixed_budget_is_constant() {
        let mut clock = ClockState::new(TimeControl::FixedPerMove { ms: 3_000 });
        assert_eq!(clock.allocate_ms(), 3_000);
        clock.apply_elapsed(2_900);
        assert_eq!(clock.allocate_ms(), 3_000);
    }

    #[test]
    fn conventional_clock_regrants_the_session() {
        let mut clock = ClockState::new(TimeControl::Conventional {
            moves_per_session: 2,
            session_ms: 60_000,
            increment_ms: 0,
        });
        assert_eq!(clock.allocate_ms(), 30_000);
        clock.apply_elapsed(30_000);
        clock.apply_elapsed(30_000);
        // Both session moves played: the budget is granted again.
        assert_eq!(clock.remaining_ms(), 60_000);
        assert_eq!(clock.allocate_ms(), 30_000);
    }

    #[test]
    fn incremental_allocation_never_exceeds_the_clock() {
        let clock = ClockState::new(TimeControl::Incremental {
            base_ms: 90,
            increment_ms: 2_000,
        });
        assert_eq!(clock.allocate_ms(), 90);
    }

    #[test]
    fn node_budget_scales_with_throughput() {
        let clock = ClockState::new(TimeControl::FixedPerMove { ms: 2_000 });
        assert_eq!(clock.node_budget(1_000_000.0), 2_000_000);
        // A degenerate estimate still yields a searchable budget.
        assert_eq!(clock.node_budget(0.0), 2);
    }
}
