//! Context Module - the root of the runtime
//!
//! A [`Context`] owns everything: the readiness poller, the pending-event
//! queue and the ordered set of seats. The embedding application creates
//! one with a [`SessionInterface`] (the open/close callback pair for
//! restricted device nodes), waits on [`Context::fd`] in its own loop,
//! calls [`Context::dispatch`] when it wakes, and drains events with
//! [`Context::get_event`].
//!
//! The whole runtime is single-threaded and callback-driven. `dispatch`
//! polls with a zero timeout on purpose: blocking until readiness belongs
//! to the embedding application's loop, where this context's descriptor is
//! just one of many.
//!
//! Teardown order matters and is fixed: drain and destroy queued events
//! (they hold the only remaining device references), then detach devices
//! and close their descriptors through the session interface, then drop
//! seats, then reclaim any sources still pending destruction.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::io;
use std::os::fd::{OwnedFd, RawFd};
use std::path::Path;
use std::rc::Rc;

use crate::error::Error;
use crate::event::Event;
use crate::logger::{FacadeLogger, LogHandler, LogPriority};
use crate::queue::EventQueue;
use crate::seat::Seat;
use crate::source::{Poller, SourceHandle};
use crate::EventKind;

// =============================================================================
// SESSION INTERFACE
// =============================================================================

/// Open/close callbacks for restricted device nodes.
///
/// Device nodes usually need privileges to open; the embedding application
/// decides how (direct open, logind, seatd, ...). On failure
/// `open_restricted` returns the errno describing why.
pub trait SessionInterface {
    fn open_restricted(&mut self, path: &Path, flags: i32) -> Result<OwnedFd, i32>;
    fn close_restricted(&mut self, fd: OwnedFd);
}

// =============================================================================
// CONTEXT
// =============================================================================

pub(crate) struct ContextInner {
    pub(crate) poller: Poller,
    pub(crate) queue: RefCell<EventQueue>,
    pub(crate) seats: RefCell<Vec<Seat>>,
    pub(crate) interface: RefCell<Box<dyn SessionInterface>>,
    pub(crate) log_priority: Cell<LogPriority>,
    pub(crate) log_handler: RefCell<Box<dyn LogHandler>>,
    pub(crate) user_data: RefCell<Option<Rc<dyn Any>>>,
}

/// Root handle of the runtime. Cloning is reference sharing; the runtime
/// is torn down when the last handle is dropped.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl Context {
    /// Create a runtime with the given session interface.
    ///
    /// Fails only if the kernel readiness multiplexer cannot be created.
    pub fn new<I>(interface: I) -> Result<Self, Error>
    where
        I: SessionInterface + 'static,
    {
        Ok(Self {
            inner: Rc::new(ContextInner {
                poller: Poller::new()?,
                queue: RefCell::new(EventQueue::new()),
                seats: RefCell::new(Vec::new()),
                interface: RefCell::new(Box::new(interface)),
                log_priority: Cell::new(LogPriority::Error),
                log_handler: RefCell::new(Box::new(FacadeLogger)),
                user_data: RefCell::new(None),
            }),
        })
    }

    pub(crate) fn from_inner(inner: Rc<ContextInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Rc<ContextInner> {
        &self.inner
    }

    /// Descriptor for the embedding application's own readiness wait.
    ///
    /// When it polls readable, call [`Context::dispatch`].
    pub fn fd(&self) -> RawFd {
        self.inner.poller.fd()
    }

    /// Run one dispatch pass: poll the multiplexer without blocking,
    /// invoke the callback of every ready source, then reclaim sources
    /// removed during the pass.
    pub fn dispatch(&self) -> Result<(), Error> {
        self.inner.poller.dispatch(self)
    }

    /// Remove and return the oldest pending event.
    ///
    /// Ownership transfers to the caller; dropping the event releases its
    /// device reference.
    pub fn get_event(&self) -> Option<Event> {
        self.inner.queue.borrow_mut().pop()
    }

    /// Type of the oldest pending event without removing it.
    pub fn next_event_type(&self) -> Option<EventKind> {
        self.inner.queue.borrow().peek_kind()
    }

    /// Number of pending events.
    pub fn events_pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    // =========================================================================
    // SOURCES
    // =========================================================================

    /// Register read-interest for `fd`; `dispatch` is invoked from
    /// [`Context::dispatch`] whenever the descriptor is ready.
    pub fn add_fd<F>(&self, fd: RawFd, dispatch: F) -> Result<SourceHandle, Error>
    where
        F: FnMut(&Context) + 'static,
    {
        self.inner.poller.add_fd(fd, Box::new(dispatch))
    }

    /// Unregister a source.
    ///
    /// Destruction is deferred to the end of the current dispatch pass, so
    /// removing a source from inside a callback is safe even when it is
    /// ready in the same pass.
    pub fn remove_source(&self, handle: SourceHandle) {
        self.inner.poller.remove(handle);
    }

    // =========================================================================
    // SEATS
    // =========================================================================

    /// Return the seat with this identity, creating it if needed.
    /// Creation order is preserved in [`Context::seats`].
    pub fn get_seat(&self, physical_name: &str, logical_name: &str) -> Seat {
        let mut seats = self.inner.seats.borrow_mut();
        if let Some(seat) = seats.iter().find(|seat| {
            seat.physical_name() == physical_name && seat.logical_name() == logical_name
        }) {
            return seat.clone();
        }

        let seat = Seat::new(&self.inner, physical_name, logical_name);
        seats.push(seat.clone());
        seat
    }

    /// All seats, in creation order.
    pub fn seats(&self) -> Vec<Seat> {
        self.inner.seats.borrow().clone()
    }

    // =========================================================================
    // RESTRICTED OPEN/CLOSE
    // =========================================================================

    /// Open a device node through the session interface.
    pub fn open_path(&self, path: &Path, flags: i32) -> Result<OwnedFd, Error> {
        match self.inner.interface.borrow_mut().open_restricted(path, flags) {
            Ok(fd) => Ok(fd),
            Err(errno) => {
                let source = io::Error::from_raw_os_error(errno);
                self.inner.log(
                    LogPriority::Info,
                    format_args!("opening input device '{}' failed ({source})", path.display()),
                );
                Err(Error::OpenRestricted { path: path.to_path_buf(), source })
            }
        }
    }

    // =========================================================================
    // LOGGING / USER DATA
    // =========================================================================

    /// Lowest priority that reaches the log handler.
    pub fn log_priority(&self) -> LogPriority {
        self.inner.log_priority.get()
    }

    /// Set the priority threshold for the log handler.
    pub fn set_log_priority(&self, priority: LogPriority) {
        self.inner.log_priority.set(priority);
    }

    /// Replace the log sink.
    pub fn set_log_handler<H>(&self, handler: H)
    where
        H: LogHandler + 'static,
    {
        *self.inner.log_handler.borrow_mut() = Box::new(handler);
    }

    /// Attach arbitrary data to this context.
    pub fn set_user_data(&self, data: Rc<dyn Any>) {
        *self.inner.user_data.borrow_mut() = Some(data);
    }

    /// Data previously attached with [`Context::set_user_data`].
    pub fn user_data(&self) -> Option<Rc<dyn Any>> {
        self.inner.user_data.borrow().clone()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("seats", &self.inner.seats.borrow().len())
            .field("events_pending", &self.inner.queue.borrow().len())
            .finish()
    }
}

// =============================================================================
// CONTEXT INNER
// =============================================================================

impl ContextInner {
    /// Append an event to the pending queue.
    pub(crate) fn post_event(&self, event: Event) {
        self.queue.borrow_mut().push(event);
    }

    /// Close a descriptor through the session interface.
    pub(crate) fn close_restricted(&self, fd: OwnedFd) {
        self.interface.borrow_mut().close_restricted(fd);
    }

    /// Emit a message if it passes the priority threshold.
    pub(crate) fn log(&self, priority: LogPriority, message: fmt::Arguments<'_>) {
        if self.log_priority.get() <= priority {
            self.log_handler.borrow_mut().log(priority, message);
        }
    }

    /// Report an integration bug (backend/glue misuse).
    pub(crate) fn log_bug(&self, message: fmt::Arguments<'_>) {
        self.log(LogPriority::Error, format_args!("bug: {message}"));
    }

    /// Report a consumer bug (API contract misuse).
    pub(crate) fn log_bug_client(&self, message: fmt::Arguments<'_>) {
        self.log(LogPriority::Error, format_args!("client bug: {message}"));
    }
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        // Queued events hold the only remaining device references; destroy
        // them first so devices and seats unwind in order.
        self.queue.borrow_mut().clear();

        let seats = std::mem::take(&mut *self.seats.borrow_mut());
        for seat in &seats {
            for device in seat.take_devices() {
                if let Some(handle) = device.take_source() {
                    self.poller.remove(handle);
                }
                if let Some(fd) = device.take_fd() {
                    self.interface.borrow_mut().close_restricted(fd);
                }
            }
        }
        drop(seats);

        self.poller.reclaim();
    }
}

// =============================================================================
// TEST SUPPORT
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::cell::Cell;
    use std::fs::File;

    /// Interface that opens paths read-only and closes by dropping.
    pub(crate) struct NullInterface;

    impl SessionInterface for NullInterface {
        fn open_restricted(&mut self, path: &Path, _flags: i32) -> Result<OwnedFd, i32> {
            File::open(path)
                .map(OwnedFd::from)
                .map_err(|err| err.raw_os_error().unwrap_or(5))
        }

        fn close_restricted(&mut self, fd: OwnedFd) {
            drop(fd);
        }
    }

    /// Interface that counts how many descriptors it was asked to close.
    pub(crate) struct CountingInterface {
        pub(crate) closed: Rc<Cell<usize>>,
    }

    impl SessionInterface for CountingInterface {
        fn open_restricted(&mut self, path: &Path, _flags: i32) -> Result<OwnedFd, i32> {
            File::open(path)
                .map(OwnedFd::from)
                .map_err(|err| err.raw_os_error().unwrap_or(5))
        }

        fn close_restricted(&mut self, fd: OwnedFd) {
            self.closed.set(self.closed.get() + 1);
            drop(fd);
        }
    }

    /// Handler that records everything it sees.
    pub(crate) struct CaptureLogger {
        pub(crate) messages: Rc<RefCell<Vec<(LogPriority, String)>>>,
    }

    impl LogHandler for CaptureLogger {
        fn log(&mut self, priority: LogPriority, message: fmt::Arguments<'_>) {
            self.messages.borrow_mut().push((priority, message.to_string()));
        }
    }

    pub(crate) fn new_context() -> Context {
        Context::new(NullInterface).unwrap()
    }

    /// Install a capturing log handler and return its message store.
    pub(crate) fn with_capture_logger(ctx: &Context) -> Rc<RefCell<Vec<(LogPriority, String)>>> {
        let messages = Rc::new(RefCell::new(Vec::new()));
        ctx.set_log_handler(CaptureLogger { messages: messages.clone() });
        messages
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::types::{ButtonState, KeyState, NormalizedCoords, RawCoords};
    use crate::DeviceCapabilities;
    use std::cell::Cell;
    use std::io::{Read, Write};
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_context_has_pollable_fd() {
        let ctx = new_context();
        assert!(ctx.fd() >= 0);
    }

    #[test]
    fn test_get_seat_finds_or_creates() {
        let ctx = new_context();

        let first = ctx.get_seat("seat0", "default");
        let again = ctx.get_seat("seat0", "default");
        assert!(Rc::ptr_eq(&first.inner, &again.inner));

        let other = ctx.get_seat("seat0", "alt");
        assert!(!Rc::ptr_eq(&first.inner, &other.inner));

        let seats = ctx.seats();
        assert_eq!(seats.len(), 2);
        assert_eq!(seats[0].logical_name(), "default");
        assert_eq!(seats[1].logical_name(), "alt");
    }

    #[test]
    fn test_dispatch_decodes_and_posts() {
        let ctx = new_context();
        let seat = ctx.get_seat("seat0", "default");
        let device = seat.add_device("stream keyboard", DeviceCapabilities::KEYBOARD, None);

        let (mut reader, mut writer) = UnixStream::pair().unwrap();
        reader.set_nonblocking(true).unwrap();
        let fd = reader.as_raw_fd();

        // Toy decoder: one byte per key, high bit = release.
        let handle = ctx
            .add_fd(fd, {
                let device = device.clone();
                move |_ctx| {
                    let mut buf = [0u8; 32];
                    while let Ok(n) = reader.read(&mut buf) {
                        if n == 0 {
                            break;
                        }
                        for byte in &buf[..n] {
                            let state = if byte & 0x80 != 0 {
                                KeyState::Released
                            } else {
                                KeyState::Pressed
                            };
                            device.notify_key(1_000, u32::from(byte & 0x7f), state);
                        }
                    }
                }
            })
            .unwrap();
        device.set_source(handle);

        // Nothing ready: dispatch is a no-op.
        ctx.dispatch().unwrap();
        assert_eq!(ctx.events_pending(), 0);

        writer.write_all(&[30, 31]).unwrap();
        ctx.dispatch().unwrap();
        assert_eq!(ctx.events_pending(), 2);
        assert_eq!(ctx.next_event_type(), Some(crate::EventKind::KeyboardKey));

        let first = ctx.get_event().unwrap();
        assert_eq!(first.keyboard_key(), 30);
        assert_eq!(first.keyboard_seat_key_count(), 1);
        let second = ctx.get_event().unwrap();
        assert_eq!(second.keyboard_key(), 31);

        writer.write_all(&[30 | 0x80]).unwrap();
        ctx.dispatch().unwrap();
        let release = ctx.get_event().unwrap();
        assert_eq!(release.keyboard_key(), 30);
        assert_eq!(release.keyboard_key_state(), KeyState::Released);
        assert_eq!(release.keyboard_seat_key_count(), 0);
    }

    #[test]
    fn test_events_drain_fifo_across_devices() {
        let ctx = new_context();
        let seat = ctx.get_seat("seat0", "default");
        let kbd = seat.add_device("kbd", DeviceCapabilities::KEYBOARD, None);
        let mouse = seat.add_device("mouse", DeviceCapabilities::POINTER, None);

        kbd.notify_key(1, 30, KeyState::Pressed);
        mouse.notify_motion(2, NormalizedCoords::new(1.0, 0.0), RawCoords::default());
        mouse.notify_button(3, 1, ButtonState::Pressed);
        kbd.notify_key(4, 30, KeyState::Released);

        let kinds: Vec<_> = std::iter::from_fn(|| ctx.get_event()).map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                crate::EventKind::KeyboardKey,
                crate::EventKind::PointerMotion,
                crate::EventKind::PointerButton,
                crate::EventKind::KeyboardKey,
            ]
        );
    }

    #[test]
    fn test_open_path_maps_errno_and_logs_info() {
        let ctx = new_context();
        let messages = with_capture_logger(&ctx);

        // Default threshold is Error: the info message is filtered.
        let err = ctx.open_path(Path::new("/nonexistent/input/device"), 0);
        assert!(matches!(err, Err(Error::OpenRestricted { .. })));
        assert!(messages.borrow().is_empty());

        ctx.set_log_priority(LogPriority::Debug);
        let _ = ctx.open_path(Path::new("/nonexistent/input/device"), 0);
        let recorded = messages.borrow();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, LogPriority::Info);
        assert!(recorded[0].1.contains("opening input device"));
    }

    #[test]
    fn test_log_priority_roundtrip() {
        let ctx = new_context();
        assert_eq!(ctx.log_priority(), LogPriority::Error);
        ctx.set_log_priority(LogPriority::Debug);
        assert_eq!(ctx.log_priority(), LogPriority::Debug);
    }

    #[test]
    fn test_user_data_round_trip() {
        let ctx = new_context();
        assert!(ctx.user_data().is_none());
        ctx.set_user_data(Rc::new("embedder".to_string()));
        let data = ctx.user_data().unwrap();
        assert_eq!(*data.downcast::<String>().unwrap(), "embedder");
    }

    #[test]
    fn test_teardown_closes_devices_and_frees_graph() {
        let closed = Rc::new(Cell::new(0));
        let ctx = Context::new(CountingInterface { closed: closed.clone() }).unwrap();
        let seat = ctx.get_seat("seat0", "default");

        let fd = ctx.open_path(Path::new("/dev/null"), 0).unwrap();
        let device = seat.add_device("null device", DeviceCapabilities::KEYBOARD, Some(fd));
        device.notify_key(1_000, 30, KeyState::Pressed);

        let weak_device = Rc::downgrade(&device.inner);
        let weak_seat = Rc::downgrade(&seat.inner);
        drop(device);
        drop(seat);

        // The context (its seat list and queue) still keeps everything alive.
        assert!(weak_device.upgrade().is_some());
        assert!(weak_seat.upgrade().is_some());

        drop(ctx);
        assert_eq!(closed.get(), 1);
        assert!(weak_device.upgrade().is_none());
        assert!(weak_seat.upgrade().is_none());
    }

    #[test]
    fn test_teardown_with_clone_only_on_last_drop() {
        let ctx = new_context();
        let clone = ctx.clone();
        let seat = ctx.get_seat("seat0", "default");

        drop(ctx);
        // The clone keeps the runtime alive.
        assert!(seat.context().is_some());

        drop(clone);
        assert!(seat.context().is_none());
    }
}
