use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Lifecycle of a code judge record.
///
/// `New -> Submitted -> Done` is the happy path; `New -> Failed` is taken once
/// submit attempts are exhausted. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "codejudgestatus", rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum CodeJudgeStatus {
    New,
    Submitted,
    Done,
    Failed,
}

impl CodeJudgeStatus {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Submitted => "SUBMITTED",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }

    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// The only state a record may be in right before entering `self`.
    pub(crate) fn predecessor(self) -> Option<Self> {
        match self {
            Self::New => None,
            Self::Submitted => Some(Self::New),
            Self::Done => Some(Self::Submitted),
            Self::Failed => Some(Self::New),
        }
    }

    #[cfg(test)]
    pub(crate) fn can_transition_to(self, next: Self) -> bool {
        next.predecessor() == Some(self)
    }
}

impl std::fmt::Display for CodeJudgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
