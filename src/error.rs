//! Error type for runtime-level failures.
//!
//! Only failures that affect the whole runtime surface here: poller setup,
//! descriptor registration, the readiness poll itself, and restricted opens.
//! Failures local to a single event (missing capability, mismatched
//! accessor) are logged and swallowed instead — see the logger module.

use std::io;
use std::os::fd::RawFd;
use std::path::PathBuf;

/// Errors surfaced to the embedding application.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The readiness poller could not be created.
    #[error("failed to create readiness poller: {0}")]
    PollerInit(#[source] io::Error),

    /// The multiplexer rejected a descriptor at registration.
    #[error("failed to register fd {fd} with the poller: {source}")]
    Register {
        fd: RawFd,
        #[source]
        source: io::Error,
    },

    /// The readiness poll itself failed.
    #[error("readiness poll failed: {0}")]
    Poll(#[source] io::Error),

    /// The session interface refused to open a device node.
    #[error("opening input device '{path}' failed: {source}")]
    OpenRestricted {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
