//! # spark-input
//!
//! Input-event runtime for Rust.
//!
//! spark-input turns low-level signals from input hardware (keys, pointer
//! motion, pointer buttons) into a lazily-drained, ordered stream of typed
//! event records, while multiplexing readiness for the underlying device
//! file descriptors.
//!
//! ## Architecture
//!
//! One [`Context`] owns an ordered set of [`Seat`]s; each seat owns the
//! [`Device`]s attached to it and a seat-wide press-count table shared by
//! all of them. Device-specific decoders (supplied by the embedding
//! application) register their descriptors with the context and feed the
//! runtime through the `notify_*` primitives, which gate on device
//! capabilities and post typed [`Event`]s to a growable circular queue.
//!
//! ```text
//! embedder loop → Context::dispatch → source callback (decoder)
//!               → Device::notify_*  → capability gate → press counts
//!               → event queue       → Context::get_event → consumer
//! ```
//!
//! The runtime is single-threaded and never blocks: `dispatch` polls with
//! a zero timeout, and [`Context::fd`] lets the embedding application fold
//! the runtime into its own readiness wait.
//!
//! ## Ownership
//!
//! `Context`, `Seat` and `Device` are cloneable handles with deterministic
//! destroy-on-last-release. A queued event keeps its device (and
//! transitively its seat) alive until the consumer drops the drained
//! event, so teardown always drains the queue first.
//!
//! ## Modules
//!
//! - [`types`] - Shared vocabulary (states, capabilities, coordinates)
//! - [`context`] - The root handle: dispatch, event draining, seats
//! - [`seat`] - Device grouping and seat-wide press counts
//! - [`device`] - Devices and the notify primitives
//! - [`event`] - Typed event records and their accessors
//! - [`logger`] - Injected logging

pub mod context;
pub mod device;
pub mod event;
pub mod logger;
pub mod seat;
pub mod types;

mod error;
mod queue;
mod source;

// Re-export commonly used items
pub use context::{Context, SessionInterface};
pub use device::Device;
pub use error::Error;
pub use event::{Event, EventKind};
pub use logger::{FacadeLogger, LogHandler, LogPriority};
pub use seat::Seat;
pub use source::SourceHandle;
pub use types::{
    ButtonState, DeviceCapabilities, KeyState, NormalizedCoords, RawCoords, CODE_COUNT, CODE_MAX,
};
