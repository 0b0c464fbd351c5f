//! Seat Module - device grouping and seat-wide press counts
//!
//! A seat is a named grouping of devices acting as one logical
//! pointer/keyboard pair (one physical seat may expose several logical
//! devices). Every device on the seat feeds the same press-count table, so
//! consumers can ask "how many keys/buttons are currently held across the
//! whole seat" straight from an event payload.
//!
//! Seats are cloneable handles: the context keeps them alive through its
//! seat list, and every attached device holds its own strong handle back
//! to the seat.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::os::fd::OwnedFd;
use std::rc::{Rc, Weak};

use crate::context::{Context, ContextInner};
use crate::device::Device;
use crate::types::{ButtonState, KeyState, CODE_COUNT};
use crate::DeviceCapabilities;

// =============================================================================
// SEAT
// =============================================================================

pub(crate) struct SeatInner {
    context: Weak<ContextInner>,
    physical_name: String,
    logical_name: String,
    devices: RefCell<Vec<Device>>,
    /// Held-press counts per canonical code, aggregated across all devices
    /// on this seat. Keys and buttons share the table.
    press_counts: RefCell<[u32; CODE_COUNT]>,
    user_data: RefCell<Option<Rc<dyn Any>>>,
}

/// A logical grouping of input devices. Cloning is reference sharing.
#[derive(Clone)]
pub struct Seat {
    pub(crate) inner: Rc<SeatInner>,
}

impl Seat {
    pub(crate) fn new(context: &Rc<ContextInner>, physical_name: &str, logical_name: &str) -> Self {
        Self {
            inner: Rc::new(SeatInner {
                context: Rc::downgrade(context),
                physical_name: physical_name.to_string(),
                logical_name: logical_name.to_string(),
                devices: RefCell::new(Vec::new()),
                press_counts: RefCell::new([0; CODE_COUNT]),
                user_data: RefCell::new(None),
            }),
        }
    }

    /// The owning context, if it is still alive.
    pub fn context(&self) -> Option<Context> {
        self.inner.context.upgrade().map(Context::from_inner)
    }

    /// Name of the physical seat.
    pub fn physical_name(&self) -> &str {
        &self.inner.physical_name
    }

    /// Name of the logical seat within the physical one.
    pub fn logical_name(&self) -> &str {
        &self.inner.logical_name
    }

    /// Devices currently attached to this seat.
    pub fn devices(&self) -> Vec<Device> {
        self.inner.devices.borrow().clone()
    }

    /// Attach a new device to this seat.
    ///
    /// `fd` is the descriptor the embedding glue opened through the
    /// session interface, if the device is backed by one.
    pub fn add_device(
        &self,
        name: &str,
        capabilities: DeviceCapabilities,
        fd: Option<OwnedFd>,
    ) -> Device {
        let device = Device::new(self, name, capabilities, fd);
        self.inner.devices.borrow_mut().push(device.clone());
        device
    }

    /// Attach arbitrary data to this seat.
    pub fn set_user_data(&self, data: Rc<dyn Any>) {
        *self.inner.user_data.borrow_mut() = Some(data);
    }

    /// Data previously attached with [`Seat::set_user_data`].
    pub fn user_data(&self) -> Option<Rc<dyn Any>> {
        self.inner.user_data.borrow().clone()
    }

    /// Drop the seat's strong handle on `device`.
    pub(crate) fn detach(&self, device: &Device) {
        self.inner
            .devices
            .borrow_mut()
            .retain(|attached| !Rc::ptr_eq(&attached.inner, &device.inner));
    }

    /// Drain the device list (context teardown).
    pub(crate) fn take_devices(&self) -> Vec<Device> {
        std::mem::take(&mut *self.inner.devices.borrow_mut())
    }

    // =========================================================================
    // PRESS COUNTS
    // =========================================================================

    /// Update the seat-wide count for a key and return the new count.
    pub(crate) fn update_key_count(&self, key: u32, state: KeyState) -> u32 {
        self.bump(key, state == KeyState::Pressed)
    }

    /// Update the seat-wide count for a button and return the new count.
    pub(crate) fn update_button_count(&self, button: u32, state: ButtonState) -> u32 {
        self.bump(button, state == ButtonState::Pressed)
    }

    fn bump(&self, code: u32, pressed: bool) -> u32 {
        let mut counts = self.inner.press_counts.borrow_mut();
        let slot = &mut counts[code as usize];
        if pressed {
            *slot += 1;
        } else {
            // The matching press may never have been seen; stay at zero.
            if *slot == 0 {
                return 0;
            }
            *slot -= 1;
        }
        *slot
    }

    #[cfg(test)]
    pub(crate) fn press_count(&self, code: u32) -> u32 {
        self.inner.press_counts.borrow()[code as usize]
    }
}

impl fmt::Debug for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seat")
            .field("physical_name", &self.inner.physical_name)
            .field("logical_name", &self.inner.logical_name)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::new_context;

    #[test]
    fn test_seat_names() {
        let ctx = new_context();
        let seat = ctx.get_seat("seat0", "default");
        assert_eq!(seat.physical_name(), "seat0");
        assert_eq!(seat.logical_name(), "default");
        assert!(seat.context().is_some());
    }

    #[test]
    fn test_press_then_release() {
        let ctx = new_context();
        let seat = ctx.get_seat("seat0", "default");

        assert_eq!(seat.update_key_count(30, KeyState::Pressed), 1);
        assert_eq!(seat.update_key_count(30, KeyState::Released), 0);
        assert_eq!(seat.press_count(30), 0);
    }

    #[test]
    fn test_release_without_press_saturates() {
        let ctx = new_context();
        let seat = ctx.get_seat("seat0", "default");

        // A missed initial press must not underflow the count.
        assert_eq!(seat.update_key_count(17, KeyState::Released), 0);
        assert_eq!(seat.update_key_count(17, KeyState::Released), 0);
        assert_eq!(seat.press_count(17), 0);
    }

    #[test]
    fn test_double_press_counts_to_two() {
        let ctx = new_context();
        let seat = ctx.get_seat("seat0", "default");

        assert_eq!(seat.update_key_count(42, KeyState::Pressed), 1);
        assert_eq!(seat.update_key_count(42, KeyState::Pressed), 2);
        assert_eq!(seat.update_key_count(42, KeyState::Released), 1);
        assert_eq!(seat.update_key_count(42, KeyState::Released), 0);
        assert_eq!(seat.update_key_count(42, KeyState::Released), 0);
    }

    #[test]
    fn test_keys_and_buttons_share_the_table() {
        let ctx = new_context();
        let seat = ctx.get_seat("seat0", "default");

        assert_eq!(seat.update_button_count(1, ButtonState::Pressed), 1);
        assert_eq!(seat.update_key_count(1, KeyState::Pressed), 2);
        assert_eq!(seat.update_button_count(1, ButtonState::Released), 1);
        assert_eq!(seat.update_key_count(1, KeyState::Released), 0);
    }

    #[test]
    fn test_counts_aggregate_across_devices() {
        let ctx = new_context();
        let seat = ctx.get_seat("seat0", "default");
        let kbd_a = seat.add_device("kbd a", DeviceCapabilities::KEYBOARD, None);
        let kbd_b = seat.add_device("kbd b", DeviceCapabilities::KEYBOARD, None);

        kbd_a.notify_key(1000, 30, KeyState::Pressed);
        kbd_b.notify_key(2000, 30, KeyState::Pressed);
        assert_eq!(seat.press_count(30), 2);

        // The second event carries the aggregate count.
        let _first = ctx.get_event().unwrap();
        let second = ctx.get_event().unwrap();
        assert_eq!(second.keyboard_seat_key_count(), 2);
    }

    #[test]
    fn test_user_data_round_trip() {
        let ctx = new_context();
        let seat = ctx.get_seat("seat0", "default");

        assert!(seat.user_data().is_none());
        seat.set_user_data(Rc::new(7_u32));
        let data = seat.user_data().unwrap();
        assert_eq!(*data.downcast::<u32>().unwrap(), 7);
    }

    #[test]
    fn test_detach_removes_only_target() {
        let ctx = new_context();
        let seat = ctx.get_seat("seat0", "default");
        let a = seat.add_device("a", DeviceCapabilities::POINTER, None);
        let b = seat.add_device("b", DeviceCapabilities::POINTER, None);

        assert_eq!(seat.devices().len(), 2);
        seat.detach(&a);
        let remaining = seat.devices();
        assert_eq!(remaining.len(), 1);
        assert!(Rc::ptr_eq(&remaining[0].inner, &b.inner));
    }
}
