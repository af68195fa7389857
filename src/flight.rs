//! Single-flight state for a mutation. A second request while one is
//! outstanding is refused, not queued.

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlightState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed(String),
}

impl FlightState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, FlightState::InFlight)
    }

    /// Enter `InFlight`. Returns false, leaving the state untouched, when a
    /// request is already outstanding.
    pub fn begin(&mut self) -> bool {
        if self.is_in_flight() {
            return false;
        }
        *self = FlightState::InFlight;
        true
    }

    pub fn succeed(&mut self) {
        *self = FlightState::Succeeded;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        *self = FlightState::Failed(message.into());
    }

    pub fn reset(&mut self) {
        *self = FlightState::Idle;
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FlightState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_refuses_while_in_flight() {
        let mut state = FlightState::default();
        assert!(state.begin());
        assert!(!state.begin());
        state.fail("boom");
        assert_eq!(state.error(), Some("boom"));
        assert!(state.begin());
        state.succeed();
        assert_eq!(state, FlightState::Succeeded);
    }
}
