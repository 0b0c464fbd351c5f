//! Logger Module - Injected logging for the runtime
//!
//! The runtime never writes to stderr on its own. All diagnostics flow
//! through a [`LogHandler`] held by the context; the embedding application
//! supplies the sink. The default handler forwards to the `log` facade so
//! anything wired up there (env_logger, tracing bridges, ...) just works.
//!
//! Messages below the context's priority threshold are dropped before the
//! handler sees them. Contract violations carry a `bug:` or `client bug:`
//! marker so integration bugs stand out from ordinary errors.

use std::fmt;

// =============================================================================
// TYPES
// =============================================================================

/// Message priority, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogPriority {
    Debug = 10,
    Info = 20,
    Error = 30,
}

/// Sink for runtime diagnostics.
///
/// Handlers receive pre-formatted arguments and the priority that already
/// passed the context's threshold filter.
pub trait LogHandler {
    fn log(&mut self, priority: LogPriority, message: fmt::Arguments<'_>);
}

// =============================================================================
// DEFAULT HANDLER
// =============================================================================

/// Default handler: forwards to the `log` crate facade.
#[derive(Debug, Default)]
pub struct FacadeLogger;

impl LogHandler for FacadeLogger {
    fn log(&mut self, priority: LogPriority, message: fmt::Arguments<'_>) {
        match priority {
            LogPriority::Debug => log::debug!("{message}"),
            LogPriority::Info => log::info!("{message}"),
            LogPriority::Error => log::error!("{message}"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
