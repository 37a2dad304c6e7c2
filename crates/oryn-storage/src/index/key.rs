//! Fixed-width index keys.

/// A fixed-width index key of `N` bytes.
///
/// Keys compare lexicographically, which for the big-endian encodings
/// produced by `from_u64` matches numeric order. The index instantiates
/// widths of 4, 8, 16, 32, and 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenericKey<const N: usize>([u8; N]);

/// 4-byte key.
pub type Key4 = GenericKey<4>;
/// 8-byte key.
pub type Key8 = GenericKey<8>;
/// 16-byte key.
pub type Key16 = GenericKey<16>;
/// 32-byte key.
pub type Key32 = GenericKey<32>;
/// 64-byte key.
pub type Key64 = GenericKey<64>;

impl<const N: usize> GenericKey<N> {
    /// Key width in bytes.
    pub const WIDTH: usize = N;

    /// The all-zero key.
    pub fn zero() -> Self {
        Self([0u8; N])
    }

    /// Builds a key from raw bytes, truncating or zero-padding to width.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = [0u8; N];
        let len = bytes.len().min(N);
        data[..len].copy_from_slice(&bytes[..len]);
        Self(data)
    }

    /// Builds a key from an integer, big-endian and right-aligned so that
    /// lexicographic order matches numeric order.
    pub fn from_u64(value: u64) -> Self {
        let mut data = [0u8; N];
        let be = value.to_be_bytes();
        if N >= 8 {
            data[N - 8..].copy_from_slice(&be);
        } else {
            data.copy_from_slice(&be[8 - N..]);
        }
        Self(data)
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Default for GenericKey<N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const N: usize> std::fmt::Debug for GenericKey<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "key:")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
