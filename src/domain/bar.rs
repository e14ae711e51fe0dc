use serde::{Deserialize, Serialize};

/// Canonical bar-prefix registry from `spec.md` §4.2, used for
/// longest-prefix importance lookup in `progress::allocator`.
pub const CANONICAL_BAR_PREFIXES: &[&str] = &[
    "media-bar",
    "item-bar",
    "demucs-process",
    "demucs-docker-dl",
    "demucs-model-dl",
    "audiosep-process",
    "audiosep-docker-dl",
    "audiosep-model-dl",
    "translit-process",
    "translit-docker-dl",
    "translit-init",
    "check-probe",
    "check-decode",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BarState {
    Running,
    Cancelled,
    ErroredTask,
    ErroredAll,
    Completed,
}

impl BarState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BarState::Cancelled | BarState::ErroredTask | BarState::ErroredAll | BarState::Completed
        )
    }
}

/// A progress channel (`spec.md` §3 "Bar").
///
/// Invariant: `current <= total`; terminal states are monotone — once set,
/// never reverted. Enforced by `set_progress`/`set_state` below rather than
/// left to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    pub id: String,
    pub current: u64,
    pub total: u64,
    pub state: BarState,
    pub importance: f64,
}

impl Bar {
    pub fn new(id: impl Into<String>, total: u64) -> Self {
        Self {
            id: id.into(),
            current: 0,
            total,
            state: BarState::Running,
            importance: 1.0,
        }
    }

    /// Canonical prefix portion of this bar's id, used by the allocator's
    /// longest-prefix match (`spec.md` §4.2).
    pub fn prefix(&self) -> &str {
        CANONICAL_BAR_PREFIXES
            .iter()
            .filter(|p| self.id.starts_with(**p))
            .max_by_key(|p| p.len())
            .copied()
            .unwrap_or(self.id.as_str())
    }

    /// Advance progress. No-op once a terminal state has been recorded.
    pub fn set_progress(&mut self, current: u64) {
        if self.state.is_terminal() {
            return;
        }
        self.current = current.min(self.total);
    }

    /// Transition to a terminal state. Ignored if already terminal — the
    /// first terminal state recorded wins, matching "exactly one terminal
    /// state is recorded per bar" in `spec.md` §4.1.
    pub fn set_state(&mut self, state: BarState) {
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            if self.state == BarState::Completed {
                1.0
            } else {
                0.0
            }
        } else {
            (self.current as f64 / self.total as f64).clamp(0.0, 1.0)
        }
    }
}
