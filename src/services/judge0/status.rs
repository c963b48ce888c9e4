use serde::Serialize;

/// Status reported by the grading engine (`status.id` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JudgeStatus {
    InQueue,
    Processing,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    RuntimeSigsegv,
    RuntimeSigxfsz,
    RuntimeSigfpe,
    RuntimeSigabrt,
    RuntimeNzec,
    RuntimeOther,
    InternalError,
    ExecFormatError,
    Unrecognized(i64),
}

impl JudgeStatus {
    pub(crate) fn from_id(id: i64) -> Self {
        match id {
            1 => Self::InQueue,
            2 => Self::Processing,
            3 => Self::Accepted,
            4 => Self::WrongAnswer,
            5 => Self::TimeLimitExceeded,
            6 => Self::CompilationError,
            7 => Self::RuntimeSigsegv,
            8 => Self::RuntimeSigxfsz,
            9 => Self::RuntimeSigfpe,
            10 => Self::RuntimeSigabrt,
            11 => Self::RuntimeNzec,
            12 => Self::RuntimeOther,
            13 => Self::InternalError,
            14 => Self::ExecFormatError,
            other => Self::Unrecognized(other),
        }
    }

    pub(crate) fn id(self) -> i64 {
        match self {
            Self::InQueue => 1,
            Self::Processing => 2,
            Self::Accepted => 3,
            Self::WrongAnswer => 4,
            Self::TimeLimitExceeded => 5,
            Self::CompilationError => 6,
            Self::RuntimeSigsegv => 7,
            Self::RuntimeSigxfsz => 8,
            Self::RuntimeSigfpe => 9,
            Self::RuntimeSigabrt => 10,
            Self::RuntimeNzec => 11,
            Self::RuntimeOther => 12,
            Self::InternalError => 13,
            Self::ExecFormatError => 14,
            Self::Unrecognized(id) => id,
        }
    }

    /// Judge0's own description, used when the engine omits one.
    pub(crate) fn default_description(self) -> &'static str {
        match self {
            Self::InQueue => "In Queue",
            Self::Processing => "Processing",
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "Wrong Answer",
            Self::TimeLimitExceeded => "Time Limit Exceeded",
            Self::CompilationError => "Compilation Error",
            Self::RuntimeSigsegv => "Runtime Error (SIGSEGV)",
            Self::RuntimeSigxfsz => "Runtime Error (SIGXFSZ)",
            Self::RuntimeSigfpe => "Runtime Error (SIGFPE)",
            Self::RuntimeSigabrt => "Runtime Error (SIGABRT)",
            Self::RuntimeNzec => "Runtime Error (NZEC)",
            Self::RuntimeOther => "Runtime Error (Other)",
            Self::InternalError => "Internal Error",
            Self::ExecFormatError => "Exec Format Error",
            Self::Unrecognized(_) => "Unrecognized Status",
        }
    }

    pub(crate) fn verdict(self) -> Verdict {
        match self {
            Self::Accepted => Verdict::Ok,
            Self::InQueue | Self::Processing => Verdict::InProcess,
            Self::WrongAnswer | Self::TimeLimitExceeded | Self::CompilationError => {
                Verdict::Failed
            }
            Self::RuntimeSigsegv
            | Self::RuntimeSigxfsz
            | Self::RuntimeSigfpe
            | Self::RuntimeSigabrt
            | Self::RuntimeNzec
            | Self::RuntimeOther => Verdict::RuntimeException,
            Self::InternalError => Verdict::InternalException,
            Self::ExecFormatError => Verdict::FormatException,
            Self::Unrecognized(_) => Verdict::OtherException,
        }
    }
}

/// Internal outcome classification shared with downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum Verdict {
    Ok,
    InProcess,
    Failed,
    RuntimeException,
    InternalException,
    FormatException,
    OtherException,
}

impl Verdict {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::InProcess => "in-process",
            Self::Failed => "failed",
            Self::RuntimeException => "runtime-exception",
            Self::InternalException => "internal-exception",
            Self::FormatException => "format-exception",
            Self::OtherException => "other-exception",
        }
    }

    pub(crate) fn is_terminal(self) -> bool {
        self != Self::InProcess
    }
}
