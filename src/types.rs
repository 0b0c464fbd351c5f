//! Core types for spark-input.
//!
//! The vocabulary shared by every module: press states, device capabilities,
//! coordinate pairs and the canonical key/button code range.

// =============================================================================
// Key / button codes
// =============================================================================

/// Highest canonical key/button code the runtime tracks.
///
/// Decoders are expected to translate device-specific scan codes into this
/// canonical range before calling a notify primitive.
pub const CODE_MAX: u32 = 255;

/// Number of entries in a seat's press-count table.
pub const CODE_COUNT: usize = (CODE_MAX as usize) + 1;

/// Whether a canonical code fits the seat press-count table.
pub(crate) fn code_in_range(code: u32) -> bool {
    code <= CODE_MAX
}

// =============================================================================
// Press states
// =============================================================================

/// Logical state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Released,
    Pressed,
}

/// Logical state of a pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Released,
    Pressed,
}

// =============================================================================
// Device capabilities
// =============================================================================

bitflags::bitflags! {
    /// Declared abilities of a device.
    ///
    /// Capabilities gate which notify primitives may post events for a
    /// device; they are supplied by the embedding glue when the device is
    /// attached to its seat.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DeviceCapabilities: u32 {
        /// Pointer motion, buttons and scroll axes.
        const POINTER = 1 << 0;
        /// Keyboard keys.
        const KEYBOARD = 1 << 1;
        /// Touch contacts. Representable but no touch events are posted.
        const TOUCH = 1 << 2;
    }
}

// =============================================================================
// Coordinates
// =============================================================================

/// An accelerated (dpi-normalized) delta pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedCoords {
    pub x: f64,
    pub y: f64,
}

impl NormalizedCoords {
    /// Create a delta pair.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An unaccelerated delta pair in device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawCoords {
    pub x: f64,
    pub y: f64,
}

impl RawCoords {
    /// Create a raw delta pair.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// =============================================================================
// Time
// =============================================================================

/// Truncate a microsecond timestamp to milliseconds.
pub(crate) fn us2ms(us: u64) -> u32 {
    (us / 1000) as u32
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_range() {
        assert!(code_in_range(0));
        assert!(code_in_range(CODE_MAX));
        assert!(!code_in_range(CODE_MAX + 1));
        assert_eq!(CODE_COUNT, 256);
    }

    #[test]
    fn test_capability_flags() {
        let caps = DeviceCapabilities::POINTER | DeviceCapabilities::KEYBOARD;
        assert!(caps.contains(DeviceCapabilities::POINTER));
        assert!(caps.contains(DeviceCapabilities::KEYBOARD));
        assert!(!caps.contains(DeviceCapabilities::TOUCH));
        assert_eq!(DeviceCapabilities::default(), DeviceCapabilities::empty());
    }

    #[test]
    fn test_us2ms_truncates() {
        assert_eq!(us2ms(0), 0);
        assert_eq!(us2ms(999), 0);
        assert_eq!(us2ms(1000), 1);
        assert_eq!(us2ms(1_234_567), 1234);
    }
}
