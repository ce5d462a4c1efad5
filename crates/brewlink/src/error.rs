//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and config failures into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use brewlink_core::CoreError;

/// Exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("No gateway found on the local network")]
    #[diagnostic(
        code(brewlink::no_gateway),
        help(
            "Check that the gateway is powered on and on the same network.\n\
             To skip discovery, pass --host <ip> or set BREWLINK_HOST."
        )
    )]
    NoGateway,

    #[error("No {kind} attached to the gateway")]
    #[diagnostic(
        code(brewlink::no_device),
        help("Run: brewlink scan to see what the gateway enumerates")
    )]
    NoDevice { kind: &'static str },

    #[error("Could not connect to {device}")]
    #[diagnostic(code(brewlink::connection_failed))]
    ConnectionFailed {
        device: String,
        #[source]
        source: CoreError,
    },

    #[error(transparent)]
    #[diagnostic(code(brewlink::core))]
    Core(#[from] CoreError),

    #[error(transparent)]
    #[diagnostic(code(brewlink::config))]
    Config(#[from] brewlink_config::ConfigError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoGateway | Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NoDevice { .. } => exit_code::NOT_FOUND,
            Self::Core(_) | Self::Config(_) => exit_code::GENERAL,
        }
    }
}
