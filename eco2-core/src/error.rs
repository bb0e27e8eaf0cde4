use uuid::Uuid;

use crate::accessor::AccessorError;
use crate::registry::RegistryError;
use crate::session::Step;
use crate::thermostat::Thermostat;

/// The four ways a read session can end without a saved registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The peripheral does not speak the Eco2 protocol
    Compatibility,
    /// The timer button has to be pushed before the secret can be read
    AuthenticationRequired,
    /// The bluetooth transport failed
    Transport,
    /// The session succeeded but the registry could not be written
    Persistence,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("did not find service with UUID {uuid}")]
    ServiceNotFound { uuid: Uuid },
    #[error("did not find {label} characteristic ({uuid})")]
    CharacteristicNotFound { label: &'static str, uuid: Uuid },
    #[error("you need to push the timer button on thermostat {serial}")]
    AuthenticationRequired { serial: String },
    #[error("{step} failed: {source}")]
    Transport {
        step: Step,
        #[source]
        source: AccessorError,
    },
    #[error("read thermostat {} but could not save it: {source}", .thermostat.serial)]
    Persistence {
        /// The record as captured, so the caller can still report the secret
        thermostat: Box<Thermostat>,
        #[source]
        source: RegistryError,
    },
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::ServiceNotFound { .. } | SyncError::CharacteristicNotFound { .. } => {
                ErrorKind::Compatibility
            }
            SyncError::AuthenticationRequired { .. } => ErrorKind::AuthenticationRequired,
            SyncError::Transport { .. } => ErrorKind::Transport,
            SyncError::Persistence { .. } => ErrorKind::Persistence,
        }
    }

    pub(crate) fn transport(step: Step) -> impl FnOnce(AccessorError) -> Self {
        move |source| SyncError::Transport { step, source }
    }
}
