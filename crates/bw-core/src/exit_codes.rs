//! Process exit codes of the `bw-core` binary.
//!
//! `0` and `1` are both successful runs; scripts tell a modeled
//! recommendation from the documented fallback by the code alone.
//! `10..20` are fixable by the caller, `20..30` are ours.

/// Stable exit-code contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Modeled recommendation.
    Ok = 0,
    /// Too few samples; the 3600 s default was printed.
    InsufficientData = 1,

    ArgsError = 10,
    /// `--config` missing or invalid, or an unknown `--preset`.
    ConfigError = 11,
    /// Event input is not a JSON array of event records.
    InputError = 12,

    InternalError = 20,
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// A run that printed a recommendation.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Ok | ExitCode::InsufficientData)
    }

    /// The caller can fix this by changing arguments, config or input.
    pub fn is_caller_fault(self) -> bool {
        (10..20).contains(&self.as_i32())
    }

    /// Name used in JSON error bodies.
    pub fn code_name(self) -> &'static str {
        match self {
            ExitCode::Ok => "OK",
            ExitCode::InsufficientData => "OK_INSUFFICIENT_DATA",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }

    /// Bad JSON on stdin is the caller's input, not a disk failure, so
    /// `Error::Json` maps to `InputError` despite its I/O category.
    pub fn from_error(err: &bw_common::Error) -> Self {
        use bw_common::error::ErrorCategory;
        match (err.category(), err) {
            (_, bw_common::Error::Json(_)) => ExitCode::InputError,
            (ErrorCategory::Config, _) => ExitCode::ConfigError,
            (ErrorCategory::Input, _) => ExitCode::InputError,
            (ErrorCategory::Analysis, _) => ExitCode::InternalError,
            (ErrorCategory::Io, _) => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
