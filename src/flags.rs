/// Blocking policy of a ring buffer, one bit per face.
///
/// Bit positions are stable: bit 0 selects a non-blocking producer face,
/// bit 1 a non-blocking consumer face. The four presets cover all
/// combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags(u8);

impl Flags {
    /// Bit selecting a non-blocking producer face.
    pub const NONBLOCKING_WRITE: u8 = 1 << 0;
    /// Bit selecting a non-blocking consumer face.
    pub const NONBLOCKING_READ: u8 = 1 << 1;

    /// Both faces park when they cannot make progress.
    pub const RD_BLOCKING_WR_BLOCKING: Flags = Flags(0);
    /// Reads park when empty; writes on a full ring fail with `WouldBlock`.
    ///
    /// This is the configuration pipeline queues use: a producer stage must
    /// never stall its capture loop.
    pub const RD_BLOCKING_WR_NONBLOCKING: Flags = Flags(Self::NONBLOCKING_WRITE);
    /// Writes park when full; reads on an empty ring fail with `WouldBlock`.
    pub const RD_NONBLOCKING_WR_BLOCKING: Flags = Flags(Self::NONBLOCKING_READ);
    /// Neither face ever parks.
    pub const RD_NONBLOCKING_WR_NONBLOCKING: Flags =
        Flags(Self::NONBLOCKING_WRITE | Self::NONBLOCKING_READ);

    /// Builds flags from raw bits; bits beyond the two defined ones are
    /// ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Flags(bits & (Self::NONBLOCKING_WRITE | Self::NONBLOCKING_READ))
    }

    /// Returns the raw bit pattern.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when the producer face is non-blocking.
    #[inline]
    pub const fn nonblocking_write(self) -> bool {
        self.0 & Self::NONBLOCKING_WRITE != 0
    }

    /// True when the consumer face is non-blocking.
    #[inline]
    pub const fn nonblocking_read(self) -> bool {
        self.0 & Self::NONBLOCKING_READ != 0
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::RD_NONBLOCKING_WR_NONBLOCKING
    }
}

/// Selects which face an out-of-band operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The writing face.
    Producer,
    /// The reading face.
    Consumer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_bit_positions() {
        assert_eq!(Flags::RD_BLOCKING_WR_BLOCKING.bits(), 0b00);
        assert_eq!(Flags::RD_BLOCKING_WR_NONBLOCKING.bits(), 0b01);
        assert_eq!(Flags::RD_NONBLOCKING_WR_BLOCKING.bits(), 0b10);
        assert_eq!(Flags::RD_NONBLOCKING_WR_NONBLOCKING.bits(), 0b11);
    }

    #[test]
    fn test_flags_accessors() {
        let flags = Flags::RD_BLOCKING_WR_NONBLOCKING;
        assert!(flags.nonblocking_write());
        assert!(!flags.nonblocking_read());
    }

    #[test]
    fn test_flags_from_bits_masks_unknown_bits() {
        assert_eq!(Flags::from_bits(0xFF), Flags::RD_NONBLOCKING_WR_NONBLOCKING);
    }
}
