use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

/// Acquisition synchronisation status as reported by `TRIG:STATE?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Auto,
    Ready,
    Trigger,
    Armed,
    /// Anything the instrument reports that isn't one of the above.
    Unknown,
}

impl TriggerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerState::Auto => "AUTO",
            TriggerState::Ready => "READY",
            TriggerState::Trigger => "TRIGGER",
            TriggerState::Armed => "ARMED",
            TriggerState::Unknown => "UNKNOWN",
        }
    }
}

impl From<&str> for TriggerState {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" => TriggerState::Auto,
            "READY" => TriggerState::Ready,
            "TRIGGER" | "TRIG" => TriggerState::Trigger,
            "ARMED" | "ARM" => TriggerState::Armed,
            _ => TriggerState::Unknown,
        }
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounds for [`poll_trigger_until_fired`].
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Pause between two queries.
    pub interval: Duration,
    pub max_attempts: Option<u64>,
    pub max_wait: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10),
            max_attempts: None,
            max_wait: None,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError<E> {
    #[error("Trigger polling cancelled after {polls} polls")]
    Cancelled { polls: u64 },

    #[error("Trigger did not fire within {polls} polls")]
    Exhausted { polls: u64 },

    #[error("Trigger query failed: {0}")]
    Query(E),
}

/// Query the trigger state until it reads [`TriggerState::Trigger`].
///
/// `is_cancelled` is checked after every non-firing poll, so a first answer
/// of `TRIGGER` returns after exactly one query. Query failures end the loop
/// immediately.
pub fn poll_trigger_until_fired<E, Q, C>(
    mut query: Q,
    mut is_cancelled: C,
    config: &PollConfig,
) -> Result<TriggerState, PollError<E>>
where
    Q: FnMut() -> Result<TriggerState, E>,
    C: FnMut() -> bool,
{
    let start = Instant::now();
    let mut polls = 0u64;

    loop {
        let state = query().map_err(PollError::Query)?;
        polls += 1;

        if state == TriggerState::Trigger {
            log::debug!("Trigger fired after {} polls", polls);
            return Ok(state);
        }

        if is_cancelled() {
            log::debug!("Trigger polling cancelled in state {}", state);
            return Err(PollError::Cancelled { polls });
        }

        let attempts_exhausted = config.max_attempts.is_some_and(|max| polls >= max);
        let wait_exhausted = config.max_wait.is_some_and(|max| start.elapsed() >= max);
        if attempts_exhausted || wait_exhausted {
            return Err(PollError::Exhausted { polls });
        }

        thread::sleep(config.interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast() -> PollConfig {
        PollConfig::default().with_interval(Duration::ZERO)
    }

    #[test]
    fn test_trigger_state_from_response() {
        assert_eq!(TriggerState::from("TRIGGER"), TriggerState::Trigger);
        assert_eq!(TriggerState::from(" ready\n"), TriggerState::Ready);
        assert_eq!(TriggerState::from("AUTO"), TriggerState::Auto);
        assert_eq!(TriggerState::from("ARMED"), TriggerState::Armed);
        assert_eq!(TriggerState::from("SAVE"), TriggerState::Unknown);
        assert_eq!(TriggerState::Trigger.to_string(), "TRIGGER");
    }

    #[test]
    fn test_immediate_trigger_polls_once() {
        let polls = Cell::new(0);
        let cancel_checks = Cell::new(0);
        let result = poll_trigger_until_fired::<(), _, _>(
            || {
                polls.set(polls.get() + 1);
                Ok(TriggerState::Trigger)
            },
            || {
                cancel_checks.set(cancel_checks.get() + 1);
                false
            },
            &fast(),
        );
        assert_eq!(result.unwrap(), TriggerState::Trigger);
        assert_eq!(polls.get(), 1);
        assert_eq!(cancel_checks.get(), 0);
    }

    #[test]
    fn test_polls_until_trigger() {
        let mut states = vec![
            TriggerState::Trigger,
            TriggerState::Ready,
            TriggerState::Armed,
        ];
        let result =
            poll_trigger_until_fired::<(), _, _>(|| Ok(states.pop().unwrap()), || false, &fast());
        assert_eq!(result.unwrap(), TriggerState::Trigger);
        assert!(states.is_empty());
    }

    #[test]
    fn test_cancellation() {
        let polls = Cell::new(0u64);
        let result = poll_trigger_until_fired::<(), _, _>(
            || {
                polls.set(polls.get() + 1);
                Ok(TriggerState::Ready)
            },
            || polls.get() >= 3,
            &fast(),
        );
        assert!(matches!(result, Err(PollError::Cancelled { polls: 3 })));
    }

    #[test]
    fn test_max_attempts() {
        let result = poll_trigger_until_fired::<(), _, _>(
            || Ok(TriggerState::Armed),
            || false,
            &fast().with_max_attempts(5),
        );
        assert!(matches!(result, Err(PollError::Exhausted { polls: 5 })));
    }

    #[test]
    fn test_max_wait() {
        let config = PollConfig::default()
            .with_interval(Duration::from_millis(1))
            .with_max_wait(Duration::from_millis(5));
        let result =
            poll_trigger_until_fired::<(), _, _>(|| Ok(TriggerState::Auto), || false, &config);
        assert!(matches!(result, Err(PollError::Exhausted { .. })));
    }

    #[test]
    fn test_query_error_stops_polling() {
        let result = poll_trigger_until_fired(|| Err("bus fault"), || false, &fast());
        assert!(matches!(result, Err(PollError::Query("bus fault"))));
    }
}
