//! Shared value types.

use std::fmt;

/// An address inside a persistent region, stored as an offset from the
/// region base.
///
/// Offsets keep their meaning across processes no matter where the region is
/// mapped. The naming service treats the value as opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PmAddr(u64);

impl PmAddr {
    /// Creates an address from a raw offset.
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// Returns the raw offset.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for PmAddr {
    fn from(offset: u64) -> Self {
        Self(offset)
    }
}

impl From<PmAddr> for u64 {
    fn from(addr: PmAddr) -> Self {
        addr.0
    }
}

impl fmt::Display for PmAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addr_conversions() {
        let addr = PmAddr::from(0xcafe);
        assert_eq!(addr.as_u64(), 0xcafe);
        assert_eq!(u64::from(addr), 0xcafe);
        assert_eq!(PmAddr::new(0xcafe), addr);
    }

    #[test]
    fn addr_display_is_hex() {
        assert_eq!(PmAddr::new(0xc0ffee).to_string(), "0xc0ffee");
    }
}
