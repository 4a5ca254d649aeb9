//! Device link state tracked by the polling loop.

/// Whether the loop currently holds a claimed interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResilienceState {
    /// Interface claimed, reports are being read
    #[default]
    Connected,
    /// Device went away; no reads until a re-claim succeeds
    Reconnecting {
        /// Failed re-open attempts so far
        attempt: u32,
        /// Retry ceiling reached, device considered persistently unavailable
        persistent: bool,
    },
}

impl ResilienceState {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    #[must_use]
    pub fn is_persistent_failure(&self) -> bool {
        matches!(self, Self::Reconnecting { persistent: true, .. })
    }

    /// Whether moving to `next` is worth reporting.
    ///
    /// Bumping the attempt counter alone is not.
    #[must_use]
    pub fn differs_in_phase(&self, next: &Self) -> bool {
        self.is_connected() != next.is_connected()
            || self.is_persistent_failure() != next.is_persistent_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_changes() {
        let connected = ResilienceState::Connected;
        let first = ResilienceState::Reconnecting { attempt: 0, persistent: false };
        let later = ResilienceState::Reconnecting { attempt: 4, persistent: false };
        let stuck = ResilienceState::Reconnecting { attempt: 10, persistent: true };

        assert!(connected.differs_in_phase(&first));
        assert!(!first.differs_in_phase(&later));
        assert!(later.differs_in_phase(&stuck));
        assert!(stuck.differs_in_phase(&connected));
        assert!(!connected.differs_in_phase(&connected));
    }
}
