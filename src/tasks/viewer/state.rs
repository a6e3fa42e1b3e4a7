use tracing::debug;

use super::fade::OPAQUE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationState {
    Initializing,
    Loading,
    FadingIn,
    Steady,
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: PresentationState,
    pub to: PresentationState,
}

/// Forward-only lifecycle of one presentation session.
#[derive(Debug)]
pub struct PresentationSM {
    state: PresentationState,
}

impl Default for PresentationSM {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationSM {
    pub fn new() -> Self {
        Self {
            state: PresentationState::Initializing,
        }
    }

    pub fn current(&self) -> PresentationState {
        self.state
    }

    pub fn on_backend_ready(&mut self) -> Option<StateChange> {
        match self.state {
            PresentationState::Initializing => self.goto(PresentationState::Loading),
            _ => None,
        }
    }

    pub fn on_tiles_ready(&mut self) -> Option<StateChange> {
        match self.state {
            PresentationState::Loading => self.goto(PresentationState::FadingIn),
            _ => None,
        }
    }

    /// Per-frame update from the fade schedule.
    pub fn on_frame(&mut self, alpha: u8, keep_going: bool) -> Option<StateChange> {
        match self.state {
            PresentationState::FadingIn | PresentationState::Steady if !keep_going => {
                self.goto(PresentationState::Exiting)
            }
            PresentationState::FadingIn if alpha == OPAQUE => self.goto(PresentationState::Steady),
            _ => None,
        }
    }

    /// Any failure or shutdown request ends the session.
    pub fn on_exit(&mut self) -> Option<StateChange> {
        self.goto(PresentationState::Exiting)
    }

    fn goto(&mut self, to: PresentationState) -> Option<StateChange> {
        if self.state == to {
            return None;
        }
        let change = StateChange {
            from: self.state,
            to,
        };
        debug!(from = ?change.from, to = ?change.to, "presentation state changed");
        self.state = to;
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_every_state() {
        let mut sm = PresentationSM::new();
        assert_eq!(sm.current(), PresentationState::Initializing);
        sm.on_backend_ready().unwrap();
        assert_eq!(sm.current(), PresentationState::Loading);
        sm.on_tiles_ready().unwrap();
        assert_eq!(sm.current(), PresentationState::FadingIn);
        assert!(sm.on_frame(128, true).is_none());
        let ch = sm.on_frame(255, true).unwrap();
        assert_eq!(
            (ch.from, ch.to),
            (PresentationState::FadingIn, PresentationState::Steady)
        );
        assert!(sm.on_frame(255, true).is_none());
        sm.on_frame(255, false).unwrap();
        assert_eq!(sm.current(), PresentationState::Exiting);
    }

    #[test]
    fn cancel_during_fade_skips_steady() {
        let mut sm = PresentationSM::new();
        sm.on_backend_ready();
        sm.on_tiles_ready();
        let ch = sm.on_frame(40, false).unwrap();
        assert_eq!(
            (ch.from, ch.to),
            (PresentationState::FadingIn, PresentationState::Exiting)
        );
    }

    #[test]
    fn loading_failure_never_reaches_fading() {
        let mut sm = PresentationSM::new();
        sm.on_backend_ready();
        sm.on_exit().unwrap();
        assert!(sm.on_tiles_ready().is_none());
        assert_eq!(sm.current(), PresentationState::Exiting);
        assert!(sm.on_exit().is_none());
    }

    #[test]
    fn frames_before_loading_are_ignored() {
        let mut sm = PresentationSM::new();
        assert!(sm.on_frame(255, false).is_none());
        assert_eq!(sm.current(), PresentationState::Initializing);
    }
}
