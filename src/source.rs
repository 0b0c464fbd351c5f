//! Source Registry - readiness multiplexing for registered descriptors
//!
//! Each registered file descriptor becomes a `Source`: the descriptor, a
//! dispatch callback and an arena slot whose index doubles as the poller
//! token. A dispatch pass polls the multiplexer without blocking, resolves
//! each ready token back to its source and invokes the callback.
//!
//! Removal is deferred: unregistering only detaches the descriptor from the
//! multiplexer and marks the source with a sentinel. The slot itself is
//! reclaimed after the pass, so readiness results already collected for a
//! removed source resolve to the sentinel and are skipped instead of
//! touching a freed entry.

use std::cell::{Cell, RefCell};
use std::os::fd::{AsRawFd, RawFd};
use std::rc::Rc;
use std::time::Duration;

use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};

use crate::context::Context;
use crate::error::Error;

/// Descriptor value marking a source as removed.
const FD_REMOVED: RawFd = -1;

/// Ready sources collected per dispatch pass.
const DISPATCH_BATCH: usize = 32;

/// Callback invoked when a source's descriptor is read-ready.
pub(crate) type SourceDispatch = Box<dyn FnMut(&Context)>;

struct Source {
    fd: Cell<RawFd>,
    dispatch: RefCell<SourceDispatch>,
}

/// Token for a registered source. Consumed by unregistration.
#[derive(Debug)]
pub struct SourceHandle {
    token: usize,
}

/// Registry of sources over the kernel readiness multiplexer.
pub(crate) struct Poller {
    poll: RefCell<Poll>,
    slots: RefCell<Vec<Option<Rc<Source>>>>,
    free: RefCell<Vec<usize>>,
    destroy_pending: RefCell<Vec<usize>>,
}

impl Poller {
    pub(crate) fn new() -> Result<Self, Error> {
        let poll = Poll::new().map_err(Error::PollerInit)?;
        Ok(Self {
            poll: RefCell::new(poll),
            slots: RefCell::new(Vec::new()),
            free: RefCell::new(Vec::new()),
            destroy_pending: RefCell::new(Vec::new()),
        })
    }

    /// Descriptor the embedding application can wait on.
    pub(crate) fn fd(&self) -> RawFd {
        self.poll.borrow().as_raw_fd()
    }

    /// Register read-interest for `fd`. The arena index is the token.
    ///
    /// A rejected registration releases the reserved slot again; nothing
    /// is left allocated for the failed source.
    pub(crate) fn add_fd(&self, fd: RawFd, dispatch: SourceDispatch) -> Result<SourceHandle, Error> {
        let token = self.free.borrow_mut().pop().unwrap_or_else(|| {
            let mut slots = self.slots.borrow_mut();
            slots.push(None);
            slots.len() - 1
        });

        let registered = self
            .poll
            .borrow()
            .registry()
            .register(&mut SourceFd(&fd), Token(token), Interest::READABLE);
        if let Err(source) = registered {
            self.free.borrow_mut().push(token);
            return Err(Error::Register { fd, source });
        }

        self.slots.borrow_mut()[token] = Some(Rc::new(Source {
            fd: Cell::new(fd),
            dispatch: RefCell::new(dispatch),
        }));
        Ok(SourceHandle { token })
    }

    /// Detach a source from the multiplexer and queue it for reclamation.
    ///
    /// The slot stays occupied (sentinel-marked) until the end of the
    /// current dispatch pass so stale readiness results keep resolving.
    pub(crate) fn remove(&self, handle: SourceHandle) {
        let SourceHandle { token } = handle;
        let source = self.slots.borrow().get(token).cloned().flatten();
        let Some(source) = source else {
            return;
        };

        let fd = source.fd.get();
        if fd == FD_REMOVED {
            return;
        }

        let _ = self.poll.borrow().registry().deregister(&mut SourceFd(&fd));
        source.fd.set(FD_REMOVED);
        self.destroy_pending.borrow_mut().push(token);
    }

    /// One dispatch pass: non-blocking poll, invoke callbacks for every
    /// ready source that is still active, then reclaim removed sources.
    pub(crate) fn dispatch(&self, context: &Context) -> Result<(), Error> {
        let mut events = Events::with_capacity(DISPATCH_BATCH);
        self.poll
            .borrow_mut()
            .poll(&mut events, Some(Duration::ZERO))
            .map_err(Error::Poll)?;

        let ready: Vec<usize> = events.iter().map(|event| event.token().0).collect();
        for token in ready {
            let source = self.slots.borrow().get(token).cloned().flatten();
            let Some(source) = source else {
                continue;
            };
            // Removed earlier in this same pass.
            if source.fd.get() == FD_REMOVED {
                continue;
            }
            let mut dispatch = source.dispatch.borrow_mut();
            (*dispatch)(context);
        }

        self.reclaim();
        Ok(())
    }

    /// Free every source queued for destruction and recycle its slot.
    pub(crate) fn reclaim(&self) {
        let pending = std::mem::take(&mut *self.destroy_pending.borrow_mut());
        if pending.is_empty() {
            return;
        }

        let mut slots = self.slots.borrow_mut();
        let mut free = self.free.borrow_mut();
        for token in pending {
            slots[token] = None;
            free.push(token);
        }
    }

    #[cfg(test)]
    fn active_count(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .flatten()
            .filter(|source| source.fd.get() != FD_REMOVED)
            .count()
    }
}

// =============================================================================
// TESTS
// =============================================================================
