//! Event Module - typed event records
//!
//! Every occurrence the runtime reports is an [`Event`]: a reference to the
//! originating device plus one typed payload variant. Events are created by
//! the notify primitives, queued on the context, drained one at a time by
//! the consumer and destroyed by dropping them (which releases the device
//! reference).
//!
//! Accessors are contractually restricted to the event kinds they apply
//! to. Calling one on a mismatched event is a caller bug: it is logged at
//! error priority with a `client bug:` marker and returns a neutral value
//! instead of reading another variant's data.

use std::fmt;

use crate::context::Context;
use crate::device::Device;
use crate::types::{us2ms, ButtonState, KeyState, NormalizedCoords, RawCoords};

// =============================================================================
// TYPES
// =============================================================================

/// Discriminant of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    DeviceAdded,
    DeviceRemoved,
    KeyboardKey,
    PointerMotion,
    PointerButton,
    PointerAxis,
}

/// Per-kind payload.
pub(crate) enum EventPayload {
    DeviceAdded,
    DeviceRemoved,
    KeyboardKey {
        time: u64,
        key: u32,
        state: KeyState,
        seat_key_count: u32,
    },
    PointerMotion {
        time: u64,
        delta: NormalizedCoords,
        raw: RawCoords,
    },
    PointerButton {
        time: u64,
        button: u32,
        state: ButtonState,
        seat_button_count: u32,
    },
    PointerAxis {
        time: u64,
        delta: NormalizedCoords,
    },
}

/// One input occurrence, owned by the consumer after draining.
pub struct Event {
    device: Device,
    payload: EventPayload,
}

// =============================================================================
// EVENT
// =============================================================================

impl Event {
    pub(crate) fn new(device: Device, payload: EventPayload) -> Self {
        Self { device, payload }
    }

    /// The event's discriminant.
    pub fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::DeviceAdded => EventKind::DeviceAdded,
            EventPayload::DeviceRemoved => EventKind::DeviceRemoved,
            EventPayload::KeyboardKey { .. } => EventKind::KeyboardKey,
            EventPayload::PointerMotion { .. } => EventKind::PointerMotion,
            EventPayload::PointerButton { .. } => EventKind::PointerButton,
            EventPayload::PointerAxis { .. } => EventKind::PointerAxis,
        }
    }

    /// The device this event originated from.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The owning context, if it is still alive.
    pub fn context(&self) -> Option<Context> {
        self.device.context()
    }

    // =========================================================================
    // TIMESTAMPS
    // =========================================================================

    /// Event time in microseconds. Zero for device-notify events.
    pub fn time_usec(&self) -> u64 {
        if !self.expect_kind(
            &[
                EventKind::KeyboardKey,
                EventKind::PointerMotion,
                EventKind::PointerButton,
                EventKind::PointerAxis,
            ],
            "time_usec",
        ) {
            return 0;
        }

        match self.payload {
            EventPayload::KeyboardKey { time, .. }
            | EventPayload::PointerMotion { time, .. }
            | EventPayload::PointerButton { time, .. }
            | EventPayload::PointerAxis { time, .. } => time,
            _ => 0,
        }
    }

    /// Event time in milliseconds. Zero for device-notify events.
    pub fn time(&self) -> u32 {
        us2ms(self.time_usec())
    }

    // =========================================================================
    // KEYBOARD ACCESSORS
    // =========================================================================

    /// Canonical key code of a keyboard event.
    pub fn keyboard_key(&self) -> u32 {
        if !self.expect_kind(&[EventKind::KeyboardKey], "keyboard_key") {
            return 0;
        }
        match self.payload {
            EventPayload::KeyboardKey { key, .. } => key,
            _ => 0,
        }
    }

    /// Press state of a keyboard event.
    pub fn keyboard_key_state(&self) -> KeyState {
        if !self.expect_kind(&[EventKind::KeyboardKey], "keyboard_key_state") {
            return KeyState::Released;
        }
        match self.payload {
            EventPayload::KeyboardKey { state, .. } => state,
            _ => KeyState::Released,
        }
    }

    /// Seat-wide held count for this key, after this event.
    pub fn keyboard_seat_key_count(&self) -> u32 {
        if !self.expect_kind(&[EventKind::KeyboardKey], "keyboard_seat_key_count") {
            return 0;
        }
        match self.payload {
            EventPayload::KeyboardKey { seat_key_count, .. } => seat_key_count,
            _ => 0,
        }
    }

    // =========================================================================
    // POINTER ACCESSORS
    // =========================================================================

    /// Accelerated x delta of a pointer-motion event.
    pub fn pointer_dx(&self) -> f64 {
        if !self.expect_kind(&[EventKind::PointerMotion], "pointer_dx") {
            return 0.0;
        }
        match self.payload {
            EventPayload::PointerMotion { delta, .. } => delta.x,
            _ => 0.0,
        }
    }

    /// Accelerated y delta of a pointer-motion event.
    pub fn pointer_dy(&self) -> f64 {
        if !self.expect_kind(&[EventKind::PointerMotion], "pointer_dy") {
            return 0.0;
        }
        match self.payload {
            EventPayload::PointerMotion { delta, .. } => delta.y,
            _ => 0.0,
        }
    }

    /// Unaccelerated x delta of a pointer-motion event.
    pub fn pointer_dx_unaccelerated(&self) -> f64 {
        if !self.expect_kind(&[EventKind::PointerMotion], "pointer_dx_unaccelerated") {
            return 0.0;
        }
        match self.payload {
            EventPayload::PointerMotion { raw, .. } => raw.x,
            _ => 0.0,
        }
    }

    /// Unaccelerated y delta of a pointer-motion event.
    pub fn pointer_dy_unaccelerated(&self) -> f64 {
        if !self.expect_kind(&[EventKind::PointerMotion], "pointer_dy_unaccelerated") {
            return 0.0;
        }
        match self.payload {
            EventPayload::PointerMotion { raw, .. } => raw.y,
            _ => 0.0,
        }
    }

    /// Canonical button code of a pointer-button event.
    pub fn pointer_button(&self) -> u32 {
        if !self.expect_kind(&[EventKind::PointerButton], "pointer_button") {
            return 0;
        }
        match self.payload {
            EventPayload::PointerButton { button, .. } => button,
            _ => 0,
        }
    }

    /// Press state of a pointer-button event.
    pub fn pointer_button_state(&self) -> ButtonState {
        if !self.expect_kind(&[EventKind::PointerButton], "pointer_button_state") {
            return ButtonState::Released;
        }
        match self.payload {
            EventPayload::PointerButton { state, .. } => state,
            _ => ButtonState::Released,
        }
    }

    /// Seat-wide held count for this button, after this event.
    pub fn pointer_seat_button_count(&self) -> u32 {
        if !self.expect_kind(&[EventKind::PointerButton], "pointer_seat_button_count") {
            return 0;
        }
        match self.payload {
            EventPayload::PointerButton { seat_button_count, .. } => seat_button_count,
            _ => 0,
        }
    }

    /// Horizontal scroll delta of a pointer-axis event.
    pub fn pointer_scroll_x(&self) -> f64 {
        if !self.expect_kind(&[EventKind::PointerAxis], "pointer_scroll_x") {
            return 0.0;
        }
        match self.payload {
            EventPayload::PointerAxis { delta, .. } => delta.x,
            _ => 0.0,
        }
    }

    /// Vertical scroll delta of a pointer-axis event.
    pub fn pointer_scroll_y(&self) -> f64 {
        if !self.expect_kind(&[EventKind::PointerAxis], "pointer_scroll_y") {
            return 0.0;
        }
        match self.payload {
            EventPayload::PointerAxis { delta, .. } => delta.y,
            _ => 0.0,
        }
    }

    // =========================================================================
    // GATE
    // =========================================================================

    /// Check an accessor against the kinds it is defined for.
    ///
    /// Mismatches are reported through the context logger and make the
    /// accessor return its neutral value.
    fn expect_kind(&self, allowed: &[EventKind], accessor: &'static str) -> bool {
        let kind = self.kind();
        if allowed.contains(&kind) {
            return true;
        }

        if let Some(context) = self.context() {
            context.inner().log_bug_client(format_args!(
                "invalid event type {kind:?} passed to {accessor}()"
            ));
        }
        false
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind())
            .field("device", &self.device.name())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
