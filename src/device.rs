//! Device Module - input devices and the notify primitives
//!
//! A device is one input source on a seat: a name, a capability set, and
//! optionally the descriptor the embedding glue opened through the session
//! interface. Device-specific decoders feed the runtime exclusively through
//! the `notify_*` primitives below; each primitive gates on the device's
//! capabilities, updates the seat press counts where applicable, and posts
//! a typed event to the context queue.
//!
//! Ownership: a device holds a strong handle on its seat, and every queued
//! event holds a strong handle on its device. A device is therefore never
//! freed while an undrained event still references it.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::rc::Rc;

use crate::context::Context;
use crate::event::{Event, EventPayload};
use crate::seat::Seat;
use crate::source::SourceHandle;
use crate::types::{code_in_range, ButtonState, KeyState, NormalizedCoords, RawCoords};
use crate::DeviceCapabilities;

// =============================================================================
// DEVICE
// =============================================================================

pub(crate) struct DeviceInner {
    seat: Seat,
    name: String,
    capabilities: DeviceCapabilities,
    fd: RefCell<Option<OwnedFd>>,
    source: RefCell<Option<SourceHandle>>,
    user_data: RefCell<Option<Rc<dyn Any>>>,
}

/// One input device. Cloning is reference sharing.
#[derive(Clone)]
pub struct Device {
    pub(crate) inner: Rc<DeviceInner>,
}

impl Device {
    pub(crate) fn new(
        seat: &Seat,
        name: &str,
        capabilities: DeviceCapabilities,
        fd: Option<OwnedFd>,
    ) -> Self {
        Self {
            inner: Rc::new(DeviceInner {
                seat: seat.clone(),
                name: name.to_string(),
                capabilities,
                fd: RefCell::new(fd),
                source: RefCell::new(None),
                user_data: RefCell::new(None),
            }),
        }
    }

    /// The seat this device belongs to.
    pub fn seat(&self) -> &Seat {
        &self.inner.seat
    }

    /// The owning context, if it is still alive.
    pub fn context(&self) -> Option<Context> {
        self.inner.seat.context()
    }

    /// Device name as supplied by the embedding glue.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Full capability set.
    pub fn capabilities(&self) -> DeviceCapabilities {
        self.inner.capabilities
    }

    /// Whether the device declares `capability`.
    pub fn has_capability(&self, capability: DeviceCapabilities) -> bool {
        self.inner.capabilities.contains(capability)
    }

    /// Raw view of the device's descriptor, if it has one.
    pub fn fd(&self) -> Option<RawFd> {
        self.inner.fd.borrow().as_ref().map(|fd| fd.as_raw_fd())
    }

    /// Remember the readiness source registered for this device so
    /// [`Device::remove`] can unregister it.
    pub fn set_source(&self, handle: SourceHandle) {
        *self.inner.source.borrow_mut() = Some(handle);
    }

    /// Attach arbitrary data to this device.
    pub fn set_user_data(&self, data: Rc<dyn Any>) {
        *self.inner.user_data.borrow_mut() = Some(data);
    }

    /// Data previously attached with [`Device::set_user_data`].
    pub fn user_data(&self) -> Option<Rc<dyn Any>> {
        self.inner.user_data.borrow().clone()
    }

    /// Detach the device: unregister its source, close its descriptor
    /// through the session interface, and drop the seat's handle on it.
    ///
    /// The device record itself lives on until the last handle (including
    /// handles held by queued events) is dropped.
    pub fn remove(&self) {
        let context = self.context();

        if let Some(handle) = self.inner.source.borrow_mut().take() {
            if let Some(ctx) = &context {
                ctx.remove_source(handle);
            }
        }

        if let Some(fd) = self.inner.fd.borrow_mut().take() {
            match &context {
                Some(ctx) => ctx.inner().close_restricted(fd),
                None => drop(fd),
            }
        }

        self.inner.seat.detach(self);
    }

    pub(crate) fn take_source(&self) -> Option<SourceHandle> {
        self.inner.source.borrow_mut().take()
    }

    pub(crate) fn take_fd(&self) -> Option<OwnedFd> {
        self.inner.fd.borrow_mut().take()
    }

    // =========================================================================
    // NOTIFY PRIMITIVES
    // =========================================================================

    /// Post a device-added event for this device.
    pub fn notify_added(&self) {
        let Some(context) = self.context() else { return };
        context.inner().post_event(Event::new(self.clone(), EventPayload::DeviceAdded));
    }

    /// Post a device-removed event for this device.
    pub fn notify_removed(&self) {
        let Some(context) = self.context() else { return };
        context.inner().post_event(Event::new(self.clone(), EventPayload::DeviceRemoved));
    }

    /// Post a key event. Requires the keyboard capability.
    ///
    /// Updates the seat-wide press count for `key` and attaches the
    /// resulting count to the event.
    pub fn notify_key(&self, time: u64, key: u32, state: KeyState) {
        let Some(context) = self.context() else { return };
        if !self.expect_capability(&context, DeviceCapabilities::KEYBOARD) {
            return;
        }
        if !self.expect_code(&context, key) {
            return;
        }

        let seat_key_count = self.inner.seat.update_key_count(key, state);
        context.inner().post_event(Event::new(
            self.clone(),
            EventPayload::KeyboardKey { time, key, state, seat_key_count },
        ));
    }

    /// Post a relative pointer-motion event. Requires the pointer
    /// capability. `delta` is accelerated, `raw` is the device delta.
    pub fn notify_motion(&self, time: u64, delta: NormalizedCoords, raw: RawCoords) {
        let Some(context) = self.context() else { return };
        if !self.expect_capability(&context, DeviceCapabilities::POINTER) {
            return;
        }

        context.inner().post_event(Event::new(
            self.clone(),
            EventPayload::PointerMotion { time, delta, raw },
        ));
    }

    /// Post a pointer-button event. Requires the pointer capability.
    ///
    /// Updates the seat-wide press count for `button` and attaches the
    /// resulting count to the event.
    pub fn notify_button(&self, time: u64, button: u32, state: ButtonState) {
        let Some(context) = self.context() else { return };
        if !self.expect_capability(&context, DeviceCapabilities::POINTER) {
            return;
        }
        if !self.expect_code(&context, button) {
            return;
        }

        let seat_button_count = self.inner.seat.update_button_count(button, state);
        context.inner().post_event(Event::new(
            self.clone(),
            EventPayload::PointerButton { time, button, state, seat_button_count },
        ));
    }

    /// Post a scroll-axis event. Requires the pointer capability.
    pub fn notify_axis(&self, time: u64, delta: NormalizedCoords) {
        let Some(context) = self.context() else { return };
        if !self.expect_capability(&context, DeviceCapabilities::POINTER) {
            return;
        }

        context.inner().post_event(Event::new(
            self.clone(),
            EventPayload::PointerAxis { time, delta },
        ));
    }

    // =========================================================================
    // GATES
    // =========================================================================

    fn expect_capability(&self, context: &Context, capability: DeviceCapabilities) -> bool {
        if self.has_capability(capability) {
            return true;
        }

        let label = if capability == DeviceCapabilities::POINTER {
            "pointer"
        } else if capability == DeviceCapabilities::KEYBOARD {
            "keyboard"
        } else if capability == DeviceCapabilities::TOUCH {
            "touch"
        } else {
            "unknown"
        };
        context.inner().log_bug(format_args!(
            "event for missing {label} capability on device \"{}\"",
            self.inner.name
        ));
        false
    }

    fn expect_code(&self, context: &Context, code: u32) -> bool {
        if code_in_range(code) {
            return true;
        }

        context.inner().log_bug(format_args!(
            "key/button code {code} out of range on device \"{}\"",
            self.inner.name
        ));
        false
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.inner.name)
            .field("capabilities", &self.inner.capabilities)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
