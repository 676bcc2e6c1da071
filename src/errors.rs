use thiserror::Error;

use crate::adl::AdlStatus;

pub type Result<T> = std::result::Result<T, AtitweakError>;

// The main library error type, every failure aborts the current action
#[derive(Debug, Error, PartialEq)]
pub enum AtitweakError {
    // The native session could not be created, destroyed or loaded
    #[error("{reason}")]
    Session { reason: String },
    // A read from the native interface failed
    #[error("{reason}")]
    Query { reason: String },
    // Writing the performance levels back failed
    #[error("{reason}")]
    Write { reason: String },
    // A command line value could not be understood
    #[error("Invalid {what} \"{value}\": {reason}")]
    InvalidArgument {
        what: &'static str,
        value: String,
        reason: String,
    },
    // The command output could not be written
    #[error("Failed to write output: {reason}")]
    Output { reason: String },
}

impl From<std::io::Error> for AtitweakError {
    fn from(err: std::io::Error) -> Self {
        Self::Output {
            reason: err.to_string(),
        }
    }
}

impl AtitweakError {
    pub fn session(reason: impl Into<String>) -> Self {
        Self::Session { reason: reason.into() }
    }

    // A failed native read, named after the call that failed
    pub fn query(call: &str, status: AdlStatus) -> Self {
        Self::Query {
            reason: format!("{call} failed ({status})."),
        }
    }

    pub fn write(call: &str, status: AdlStatus) -> Self {
        Self::Write {
            reason: format!("{call} failed ({status})."),
        }
    }

    pub fn invalid_argument(
        what: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            what,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adl::ffi::ADL_ERR_NOT_SUPPORTED;

    #[test]
    fn query_error_names_the_call_and_status() {
        let err = AtitweakError::query(
            "ADL_Overdrive5_ODParameters_Get",
            AdlStatus(ADL_ERR_NOT_SUPPORTED),
        );

        assert_eq!(
            err.to_string(),
            "ADL_Overdrive5_ODParameters_Get failed (ADL_ERR_NOT_SUPPORTED)."
        );
    }

    #[test]
    fn invalid_argument_message() {
        let err = AtitweakError::invalid_argument("adapter list", "1,x", "\"x\" is not an index");

        assert_eq!(
            err.to_string(),
            "Invalid adapter list \"1,x\": \"x\" is not an index"
        );
    }
}
