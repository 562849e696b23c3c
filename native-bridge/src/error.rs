//! Error taxonomy of the bridge.
//!
//! Only [`Error::ConstructionFailure`] is a hard failure surfaced to callers of
//! the open primitives. Use-after-release is reported to the caller but never
//! reaches native code; lookup misses and callback faults are handled at the
//! trampoline and demultiplexer boundaries and end up in the native error
//! channel instead.

use crate::handle::ObjectKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An open/create primitive returned an invalid handle.
    #[error("failed to create {kind}: {message}")]
    ConstructionFailure { kind: ObjectKind, message: String },

    /// An operation was attempted on a wrapper whose native object was
    /// already released.
    #[error("{kind} used after release")]
    UseAfterRelease { kind: ObjectKind },

    /// A callback or event referenced a handle or id with no live wrapper.
    #[error("no live {kind} registered for {key}")]
    LookupMiss { kind: ObjectKind, key: String },

    /// A user callback invoked from native code panicked or failed.
    #[error("{callback} callback failed: {message}")]
    CallbackFault {
        callback: &'static str,
        message: String,
    },

    /// No native backend has been installed.
    #[error("the bridge runtime has not been initialized")]
    NotInitialized,

    /// A native backend is already installed.
    #[error("the bridge runtime has already been initialized")]
    AlreadyInitialized,

    /// A forwarded native call reported failure.
    #[error("{operation} failed: {message}")]
    Native {
        operation: &'static str,
        message: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn lookup_miss(kind: ObjectKind, key: impl std::fmt::Display) -> Self {
        Error::LookupMiss {
            kind,
            key: key.to_string(),
        }
    }

    /// Whether this error is the use-after-release guard firing.
    pub fn is_use_after_release(&self) -> bool {
        matches!(self, Error::UseAfterRelease { .. })
    }
}
