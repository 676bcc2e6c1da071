use tracing::debug;

use crate::{
    adl::ControlInterface,
    errors::{AtitweakError, Result},
};

// An initialized ADL session, only obtainable through `Session::initialize`
pub struct Session<'a> {
    control: &'a dyn ControlInterface,
}

impl<'a> Session<'a> {
    // Create the native session, restricted to active adapters
    pub fn initialize(control: &'a dyn ControlInterface) -> Result<Self> {
        debug!("Initializing ADL session");

        control
            .main_control_create(true)
            .map_err(|status| {
                AtitweakError::session(format!(
                    "Couldn't initialize ADL interface ({status})."
                ))
            })?;

        Ok(Self { control })
    }

    // Return the native interface this session was created on
    pub fn control(&self) -> &'a dyn ControlInterface {
        self.control
    }
}

// Release the native session
pub fn shutdown(control: &dyn ControlInterface) -> Result<()> {
    debug!("Destroying ADL session");

    control.main_control_destroy().map_err(|status| {
        AtitweakError::session(format!(
            "Couldn't destroy ADL interface global pointers ({status})."
        ))
    })
}

// Result of a scoped session: the action outcome and the shutdown outcome
#[derive(Debug, PartialEq)]
pub struct SessionOutcome<T> {
    pub result: Result<T>,
    pub shutdown: Result<()>,
}

impl<T> SessionOutcome<T> {
    // Process exit status, any failure on either side gives 1
    pub fn exit_code(&self) -> u8 {
        if self.result.is_err() || self.shutdown.is_err() {
            1
        } else {
            0
        }
    }

    // Errors in the order they happened
    pub fn errors(&self) -> impl Iterator<Item = &AtitweakError> {
        self.result
            .as_ref()
            .err()
            .into_iter()
            .chain(self.shutdown.as_ref().err())
    }
}

// Run `action` inside a session.
//
// The shutdown is attempted exactly once whatever happened before it,
// including when the session could not be initialized.
pub fn with_session<T>(
    control: &dyn ControlInterface,
    action: impl FnOnce(&Session) -> Result<T>,
) -> SessionOutcome<T> {
    let result = Session::initialize(control).and_then(|session| action(&session));

    let shutdown = shutdown(control);
    if let Err(err) = &shutdown {
        debug!("{err}");
    }

    SessionOutcome { result, shutdown }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adl::{
        AdlStatus, ffi,
        mock::{Call, Entry, MockAdapter, MockInterface},
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn session_requests_active_adapters_only() {
        let mock = MockInterface::new();

        let outcome = with_session(&mock, |_| Ok(()));

        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(
            mock.calls(),
            vec![Call::Create { active_only: true }, Call::Destroy]
        );
    }

    #[test]
    fn failed_initialize_skips_action_but_still_shuts_down() {
        let mock = MockInterface::new().fail_on(Entry::Create, AdlStatus(ffi::ADL_ERR));
        let mut ran = false;

        let outcome = with_session(&mock, |_| {
            ran = true;
            Ok(())
        });

        assert!(!ran);
        assert!(matches!(outcome.result, Err(AtitweakError::Session { .. })));
        assert_eq!(outcome.shutdown, Ok(()));
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(mock.count(Entry::Destroy), 1);
    }

    #[test]
    fn action_error_still_shuts_down() {
        let mock = MockInterface::new().with_adapter(MockAdapter::new(0, "Radeon"));

        let outcome: SessionOutcome<()> = with_session(&mock, |_| {
            Err(AtitweakError::Query {
                reason: "boom".to_string(),
            })
        });

        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(mock.calls().last(), Some(&Call::Destroy));
    }

    #[test]
    fn shutdown_failure_alone_fails_the_run() {
        let mock = MockInterface::new().fail_on(Entry::Destroy, AdlStatus(ffi::ADL_ERR));

        let outcome = with_session(&mock, |_| Ok(()));

        assert_eq!(outcome.result, Ok(()));
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(outcome.errors().count(), 1);
    }

    #[test]
    fn shutdown_failure_does_not_mask_earlier_error() {
        let mock = MockInterface::new()
            .fail_on(Entry::Create, AdlStatus(ffi::ADL_ERR))
            .fail_on(Entry::Destroy, AdlStatus(ffi::ADL_ERR_NOT_INIT));

        let outcome = with_session(&mock, |_| Ok(()));
        let messages: Vec<String> = outcome.errors().map(|e| e.to_string()).collect();

        assert_eq!(
            messages,
            vec![
                "Couldn't initialize ADL interface (ADL_ERR).".to_string(),
                "Couldn't destroy ADL interface global pointers (ADL_ERR_NOT_INIT).".to_string(),
            ]
        );
        assert_eq!(outcome.exit_code(), 1);
    }
}
