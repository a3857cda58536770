use std::time::{Duration, Instant};

/// Observable lifecycle of one transport session.
///
/// The whole reconnect policy lives in these transitions: `Retrying`
/// carries the attempt number and the deadline of the next automatic
/// attempt; `PermanentlyFailed` is terminal until a manual retry opens a
/// fresh session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// no session running and none wanted
    Idle,
    Connecting,
    Connected,
    /// waiting out the backoff before attempt `attempt` reconnects
    Retrying {
        attempt: u32,
        next_attempt_at: Instant,
    },
    /// gave up after the attempt cap; only a manual retry leaves this state
    PermanentlyFailed { reason: String },
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::PermanentlyFailed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Retrying { .. } => "reconnecting",
            ConnectionState::PermanentlyFailed { .. } => "failed",
        }
    }
}

/// Reconnect bookkeeping, free of any I/O so the transitions can be
/// tested on their own.
///
/// Losses increment the attempt counter; a successful open resets it.
/// Once the counter reaches the cap the machine goes `PermanentlyFailed`
/// instead of scheduling another attempt. Backoff doubles per attempt:
/// with the default 2s base the waits are 2s, then 4s.
#[derive(Debug)]
pub struct ConnectionMachine {
    state: ConnectionState,
    attempt: u32,
    max_attempts: u32,
    base_delay: Duration,
}

impl ConnectionMachine {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Idle,
            attempt: 0,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// a connection attempt is underway
    pub fn connect_started(&mut self) -> ConnectionState {
        self.state = ConnectionState::Connecting;
        self.state.clone()
    }

    /// the socket opened; the attempt counter starts over
    pub fn connection_opened(&mut self) -> ConnectionState {
        self.attempt = 0;
        self.state = ConnectionState::Connected;
        self.state.clone()
    }

    /// abnormal close or connect error; decides between another attempt
    /// and giving up
    pub fn connection_lost(&mut self, reason: impl Into<String>, now: Instant) -> ConnectionState {
        self.attempt += 1;
        self.state = if self.attempt >= self.max_attempts {
            ConnectionState::PermanentlyFailed {
                reason: reason.into(),
            }
        } else {
            ConnectionState::Retrying {
                attempt: self.attempt,
                next_attempt_at: now + self.backoff_delay(self.attempt),
            }
        };
        self.state.clone()
    }

    /// deliberate teardown; never schedules anything
    pub fn stopped(&mut self) -> ConnectionState {
        self.attempt = 0;
        self.state = ConnectionState::Idle;
        self.state.clone()
    }

    /// `base * 2^(attempt-1)`: 2s, 4s, 8s... for the default base
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << doublings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> ConnectionMachine {
        ConnectionMachine::new(3, Duration::from_secs(2))
    }

    #[test]
    fn test_first_loss_schedules_a_two_second_retry() {
        let mut machine = machine();
        machine.connect_started();
        machine.connection_opened();
        let now = Instant::now();
        let state = machine.connection_lost("dropped", now);
        assert_eq!(
            state,
            ConnectionState::Retrying {
                attempt: 1,
                next_attempt_at: now + Duration::from_secs(2),
            }
        );
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let machine = machine();
        assert_eq!(machine.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(machine.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(machine.backoff_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn test_third_loss_without_success_gives_up() {
        let mut machine = machine();
        let now = Instant::now();
        machine.connect_started();
        assert!(matches!(
            machine.connection_lost("one", now),
            ConnectionState::Retrying { attempt: 1, .. }
        ));
        machine.connect_started();
        assert!(matches!(
            machine.connection_lost("two", now),
            ConnectionState::Retrying { attempt: 2, .. }
        ));
        machine.connect_started();
        let third = machine.connection_lost("three", now);
        assert_eq!(
            third,
            ConnectionState::PermanentlyFailed {
                reason: "three".to_string(),
            }
        );
        assert!(third.is_terminal());
    }

    #[test]
    fn test_successful_open_resets_the_counter() {
        let mut machine = machine();
        let now = Instant::now();
        machine.connect_started();
        machine.connection_lost("one", now);
        machine.connect_started();
        machine.connection_lost("two", now);
        machine.connect_started();
        machine.connection_opened();
        // two earlier losses are forgotten: this is loss number one again
        assert!(matches!(
            machine.connection_lost("after success", now),
            ConnectionState::Retrying { attempt: 1, .. }
        ));
    }

    #[test]
    fn test_stopped_goes_idle_and_schedules_nothing() {
        let mut machine = machine();
        machine.connect_started();
        machine.connection_opened();
        let state = machine.stopped();
        assert_eq!(state, ConnectionState::Idle);
        assert_eq!(machine.attempt(), 0);
    }
}
