use crate::events::EventState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Inactive,
    Active,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NavigationGuard {
    state: GuardState,
}

impl NavigationGuard {
    pub(crate) fn state(&self) -> GuardState {
        self.state
    }

    /// Returns `true` on the inactive → active transition.
    pub(crate) fn activate(&mut self) -> bool {
        let changed = self.state == GuardState::Inactive;
        self.state = GuardState::Active;
        changed
    }

    /// Returns `true` on the active → inactive transition.
    pub(crate) fn deactivate(&mut self) -> bool {
        let changed = self.state == GuardState::Active;
        self.state = GuardState::Inactive;
        changed
    }

    /// Handles a `beforeunload` event: vetoes it when `dirty`.
    pub(crate) fn handle_before_unload(&self, dirty: bool, event: &mut EventState) {
        if self.state != GuardState::Active || !dirty {
            return;
        }
        event.default_prevented = true;
        // Browsers show their own wording; the value only has to be set.
        event.return_value = Some(String::new());
    }
}

/// What happened to a `beforeunload` event fired by
/// [`Page::request_unload`](crate::Page::request_unload).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BeforeUnloadOutcome {
    pub default_prevented: bool,
    pub return_value: Option<String>,
}

impl BeforeUnloadOutcome {
    /// Whether the host would show its "leave site?" prompt.
    pub fn vetoed(&self) -> bool {
        self.default_prevented || self.return_value.is_some()
    }
}

impl From<&EventState> for BeforeUnloadOutcome {
    fn from(event: &EventState) -> Self {
        Self {
            default_prevented: event.default_prevented,
            return_value: event.return_value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeId;

    #[test]
    fn transitions_report_changes() {
        let mut guard = NavigationGuard::default();
        assert_eq!(guard.state(), GuardState::Inactive);
        assert!(!guard.deactivate());
        assert!(guard.activate());
        assert!(!guard.activate());
        assert_eq!(guard.state(), GuardState::Active);
        assert!(guard.deactivate());
    }

    #[test]
    fn vetoes_only_when_active_and_dirty() {
        let mut guard = NavigationGuard::default();
        let cases = [(false, true), (true, false)];
        for (active, dirty) in cases {
            if active {
                guard.activate();
            }
            let mut event = EventState::new("beforeunload", NodeId(0));
            guard.handle_before_unload(dirty, &mut event);
            assert!(!BeforeUnloadOutcome::from(&event).vetoed());
        }

        let mut event = EventState::new("beforeunload", NodeId(0));
        guard.handle_before_unload(true, &mut event);
        let outcome = BeforeUnloadOutcome::from(&event);
        assert!(outcome.default_prevented);
        assert_eq!(outcome.return_value.as_deref(), Some(""));
        assert!(outcome.vetoed());
    }
}
