//! Per-turn countdown timer for Wildstack.
//!
//! One [`TurnTimer`] per game engine. Only the locally active seat *arms*
//! it — observers derive their display from the turn-stamped state and
//! never drive a countdown of their own, so two clients can never race to
//! resolve the same timeout.
//!
//! # Event-driven integration
//!
//! The timer is designed to sit inside the engine's `tokio::select!`
//! loop. While unarmed, paused, or not yet marked ready,
//! [`TurnTimer::wait_for_tick`] pends forever — `select!` keeps
//! processing the other branches and the timer simply contributes
//! nothing:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         tick = timer.wait_for_tick() => {
//!             if tick.expired { /* force the draw, advance the turn */ }
//!         }
//!     }
//! }
//! ```
//!
//! # Readiness gate
//!
//! Arming alone does not start the countdown. The engine calls
//! [`TurnTimer::set_ready`] once the reconciliation layer confirms the
//! local client is fresh for the turn it believes it holds; until then
//! the clock does not move. This keeps a stale client from counting down
//! (and timing out) a turn it does not actually hold anymore.

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timer configuration.
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// How long one turn may last. 5–60 seconds.
    pub turn_duration: Duration,
    /// Countdown granularity. One tick per second for display.
    pub tick: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            turn_duration: Duration::from_secs(10),
            tick: Duration::from_secs(1),
        }
    }
}

impl TimerConfig {
    pub const MIN_TURN_SECS: u64 = 5;
    pub const MAX_TURN_SECS: u64 = 60;

    /// Creates a config for a turn length in whole seconds.
    pub fn with_turn_secs(secs: u8) -> Self {
        Self {
            turn_duration: Duration::from_secs(secs as u64),
            ..Default::default()
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        let secs = self.turn_duration.as_secs();
        if !(Self::MIN_TURN_SECS..=Self::MAX_TURN_SECS).contains(&secs) {
            warn!(
                secs,
                "turn_duration out of range, clamping to {}..={}",
                Self::MIN_TURN_SECS,
                Self::MAX_TURN_SECS
            );
            self.turn_duration = Duration::from_secs(
                secs.clamp(Self::MIN_TURN_SECS, Self::MAX_TURN_SECS),
            );
        }
        if self.tick.is_zero() {
            warn!("tick must be non-zero, using 1s");
            self.tick = Duration::from_secs(1);
        }
        self
    }

    /// Whole ticks in one turn.
    fn ticks_per_turn(&self) -> u32 {
        (self.turn_duration.as_millis() / self.tick.as_millis().max(1)) as u32
    }
}

// ---------------------------------------------------------------------------
// TimerTick
// ---------------------------------------------------------------------------

/// One countdown step, returned by [`TurnTimer::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    /// The turn this countdown belongs to.
    pub turn_version: u64,
    /// Seconds remaining after this tick.
    pub seconds_left: u32,
    /// The countdown reached zero; the engine must force the draw.
    pub expired: bool,
}

// ---------------------------------------------------------------------------
// TurnTimer
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Armed {
    turn_version: u64,
    ticks_left: u32,
    next_tick: TokioInstant,
}

/// The countdown for the locally held turn.
#[derive(Debug)]
pub struct TurnTimer {
    config: TimerConfig,
    armed: Option<Armed>,
    ready: bool,
    paused: bool,
}

impl TurnTimer {
    pub fn new(config: TimerConfig) -> Self {
        let config = config.validated();
        debug!(
            turn_secs = config.turn_duration.as_secs(),
            "turn timer created"
        );
        Self {
            config,
            armed: None,
            ready: false,
            paused: false,
        }
    }

    /// Starts a fresh countdown for one turn. Re-arming for a new turn
    /// replaces any countdown still running for the previous one.
    pub fn arm(&mut self, turn_version: u64) {
        self.armed = Some(Armed {
            turn_version,
            ticks_left: self.config.ticks_per_turn(),
            next_tick: TokioInstant::now() + self.config.tick,
        });
        self.paused = false;
        debug!(turn_version, "turn timer armed");
    }

    /// Stops the countdown entirely (turn resolved some other way).
    pub fn disarm(&mut self) {
        if self.armed.take().is_some() {
            debug!("turn timer disarmed");
        }
    }

    /// Gates the countdown on sync freshness. The clock does not move
    /// until the engine declares the turn confirmed; flipping to ready
    /// restarts the tick cadence from now.
    pub fn set_ready(&mut self, ready: bool) {
        if self.ready == ready {
            return;
        }
        self.ready = ready;
        if ready {
            if let Some(armed) = &mut self.armed {
                armed.next_tick = TokioInstant::now() + self.config.tick;
            }
        }
        debug!(ready, "turn timer readiness changed");
    }

    /// Freezes the countdown while the play phase is busy. Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!("turn timer paused");
        }
    }

    /// Resumes after a pause. The next tick fires a full tick from now,
    /// so time spent paused never produces a burst of catch-up ticks.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if let Some(armed) = &mut self.armed {
                armed.next_tick = TokioInstant::now() + self.config.tick;
            }
            debug!("turn timer resumed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The turn the countdown belongs to, while armed.
    pub fn turn_version(&self) -> Option<u64> {
        self.armed.as_ref().map(|a| a.turn_version)
    }

    /// Seconds remaining on the countdown, for display.
    pub fn seconds_left(&self) -> Option<u32> {
        self.armed.as_ref().map(|a| {
            (a.ticks_left as u64 * self.config.tick.as_millis() as u64 / 1000) as u32
        })
    }

    /// Waits until the next countdown step.
    ///
    /// Pends forever while unarmed, paused, or not ready. On the final
    /// step the tick carries `expired == true` and the timer disarms
    /// itself — expiry is delivered exactly once per armed turn.
    pub async fn wait_for_tick(&mut self) -> TimerTick {
        let next = match &self.armed {
            Some(armed) if self.ready && !self.paused => armed.next_tick,
            _ => {
                // Never completes; select! handles the other branches.
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        time::sleep_until(next).await;

        let armed = self
            .armed
            .as_mut()
            .unwrap_or_else(|| unreachable!("armed checked above"));
        armed.ticks_left = armed.ticks_left.saturating_sub(1);
        armed.next_tick += self.config.tick;
        let tick = TimerTick {
            turn_version: armed.turn_version,
            seconds_left: armed.ticks_left,
            expired: armed.ticks_left == 0,
        };
        if tick.expired {
            self.armed = None;
            debug!(turn_version = tick.turn_version, "turn timer expired");
        }
        tick
    }
}
