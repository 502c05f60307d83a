//! Agent lifecycle states.

use std::fmt;

/// `Installing → Waiting → Activating → Active`, or `Redundant` after a
/// failed install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Waiting,
    Activating,
    Active,
    Redundant,
}

impl LifecycleState {
    /// Whether fetches are intercepted in this state.
    pub fn intercepts(&self) -> bool {
        !matches!(self, LifecycleState::Redundant)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Waiting => "waiting",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}
