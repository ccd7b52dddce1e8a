//! # Core model and Gilbert–Elliott fault generator
//!
//! Cores with the lowest ids (`0..num_faulty`) are subject to faults; the
//! rest are stable and never fail. Each faulty core carries its own
//! two-state Gilbert–Elliott regime (Burst/Gap) so that a single RNG stream
//! produces independent bursty-fault traces per core.

use crate::rng::FaultRng;
use crate::task::{ReplicaKey, Time};

/// What a core is doing this tick. `Failed` and `Idle` are deliberately
/// distinct states, not a `None`/sentinel overload: `Idle` means "active
/// but nothing assigned", `Failed` means "inactive this tick".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreState {
    Idle,
    Executing(ReplicaKey),
    Failed,
}

#[derive(Debug, Clone, Copy)]
enum Regime {
    Burst,
    Gap,
}

/// Per-faulty-core Gilbert–Elliott bookkeeping: the current burst/gap
/// lengths and when the current regime started.
#[derive(Debug, Clone, Copy)]
struct FaultTrack {
    regime_start: Time,
    burst_len: Time,
    gap_len: Time,
    permanently_failed: bool,
}

impl FaultTrack {
    fn new() -> Self {
        Self {
            regime_start: 0,
            burst_len: 0,
            gap_len: 0,
            permanently_failed: false,
        }
    }

    fn resample(&mut self, t: Time, bursty_chance: f64, scaler: u32, rng: &mut impl FaultRng) {
        self.regime_start = t;
        let p_burst = (1.0 - bursty_chance).max(1e-9);
        let p_gap = bursty_chance.max(1e-9);
        self.burst_len = (rng.geometric(p_burst) as Time + 1) * scaler as Time;
        self.gap_len = (rng.geometric(p_gap) as Time + 1) * scaler as Time;
    }

    fn regime(&self, t: Time) -> Regime {
        if t < self.regime_start + self.burst_len {
            Regime::Burst
        } else {
            Regime::Gap
        }
    }
}

/// One processing core.
#[derive(Debug, Clone, Copy)]
pub struct Core {
    pub id: u32,
    pub is_faulty: bool,
    pub is_active: bool,
    pub state: CoreState,
}

impl Core {
    pub fn is_executing(&self) -> bool {
        matches!(self.state, CoreState::Executing(_))
    }

    pub fn current_job(&self) -> Option<ReplicaKey> {
        match self.state {
            CoreState::Executing(key) => Some(key),
            _ => None,
        }
    }

    /// Assign a job, clear to idle, or mark this core failed for the tick.
    pub fn set_state(&mut self, state: CoreState) {
        match state {
            CoreState::Failed => {
                self.is_active = false;
                self.state = CoreState::Failed;
            }
            CoreState::Idle => {
                self.is_active = true;
                self.state = CoreState::Idle;
            }
            CoreState::Executing(_) => {
                self.is_active = true;
                self.state = state;
            }
        }
    }

    /// Only faulty cores can ever be deactivated; stable cores always
    /// report active.
    pub fn deactivate(&mut self) {
        if self.is_faulty {
            self.is_active = false;
        }
    }

    pub fn activate(&mut self) {
        self.is_active = true;
    }
}

/// The ordered collection of cores plus the fault parameters governing the
/// faulty subset. Faulty cores occupy the lowest ids `0..num_faulty`.
pub struct CoreSet {
    pub cores: Vec<Core>,
    bursty_chance: f64,
    fault_period_scaler: u32,
    lambda_c: f64,
    lambda_b: f64,
    lambda_r: f64,
    tracks: Vec<FaultTrack>,
}

impl CoreSet {
    pub fn new(
        m: usize,
        num_faulty: usize,
        bursty_chance: f64,
        fault_period_scaler: u32,
        lambda_c: f64,
        lambda_b: f64,
        lambda_r: f64,
    ) -> Self {
        let cores = (0..m)
            .map(|id| Core {
                id: id as u32,
                is_faulty: id < num_faulty,
                is_active: true,
                state: CoreState::Idle,
            })
            .collect();
        let tracks = (0..m).map(|_| FaultTrack::new()).collect();
        Self {
            cores,
            bursty_chance,
            fault_period_scaler,
            lambda_c,
            lambda_b,
            lambda_r,
            tracks,
        }
    }

    /// Advance every faulty core's Gilbert–Elliott regime and sample this
    /// tick's activity. Stable cores are left untouched (always active).
    pub fn step_faults(&mut self, t: Time, rng: &mut impl FaultRng) {
        for (core, track) in self.cores.iter_mut().zip(self.tracks.iter_mut()) {
            if !core.is_faulty || track.permanently_failed {
                continue;
            }
            if t >= track.regime_start + track.burst_len + track.gap_len {
                track.resample(t, self.bursty_chance, self.fault_period_scaler, rng);
            }
            let u = rng.uniform01();
            if u < self.lambda_c {
                track.permanently_failed = true;
                core.deactivate();
                continue;
            }
            let fails_this_tick = match track.regime(t) {
                Regime::Burst => u < self.lambda_b,
                Regime::Gap => u < self.lambda_r,
            };
            if fails_this_tick {
                core.deactivate();
            } else {
                core.activate();
            }
        }
    }
}
