use std::time::Duration;

use tokio::time::Instant;

use crate::{EngineConfig, TimeoutKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alarm {
    Heartbeat,
    Timeout(TimeoutKind),
}

/// Deadline bookkeeping for one download phase.
///
/// Output resets the heartbeat and inactivity clocks; a heartbeat only resets
/// its own clock; nothing moves the overall deadline.
#[derive(Debug, Clone)]
pub struct Watchdog {
    heartbeat_interval: Duration,
    activity_timeout: Option<Duration>,
    overall_deadline: Instant,
    last_output: Instant,
    next_heartbeat: Instant,
}

impl Watchdog {
    pub fn new(config: &EngineConfig, started: Instant) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval,
            activity_timeout: config.activity_timeout,
            overall_deadline: started + config.download_timeout,
            last_output: started,
            next_heartbeat: started + config.heartbeat_interval,
        }
    }

    pub fn record_output(&mut self, now: Instant) {
        self.last_output = now;
        self.next_heartbeat = now + self.heartbeat_interval;
    }

    /// The earliest pending deadline and what fires there. Timeouts win ties.
    pub fn next_alarm(&self) -> (Instant, Alarm) {
        let mut next = (self.overall_deadline, Alarm::Timeout(TimeoutKind::Overall));
        if let Some(inactive_at) = self.inactivity_deadline() {
            if inactive_at < next.0 {
                next = (inactive_at, Alarm::Timeout(TimeoutKind::Inactivity));
            }
        }
        if self.next_heartbeat < next.0 {
            next = (self.next_heartbeat, Alarm::Heartbeat);
        }
        next
    }

    pub fn heartbeat_sent(&mut self, now: Instant) {
        self.next_heartbeat = now + self.heartbeat_interval;
    }

    fn inactivity_deadline(&self) -> Option<Instant> {
        self.activity_timeout.map(|limit| self.last_output + limit)
    }
}
