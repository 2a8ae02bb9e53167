use std::cmp::Ordering;
use std::fmt;

/// A fixed-width scalar that can be hashed and written to disk.
///
/// The byte image is little-endian. The same bytes feed the bloom filter
/// hash and the on-disk page encoding, so a key always hashes identically
/// whether it sits in a memory run or a disk run.
pub trait Scalar: Copy + fmt::Debug + 'static {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Call `f` with the encoded bytes of `self`. Nothing is allocated.
    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R;

    /// Decode from the first `WIDTH` bytes of `bytes`.
    fn decode(bytes: &[u8]) -> Self;
}

/// Ordered scalar usable as an engine key.
pub trait Key: Scalar + Ord {}

impl<T: Scalar + Ord> Key for T {}

/// Scalar usable as an engine value.
pub trait Value: Scalar {}

impl<T: Scalar> Value for T {}

macro_rules! impl_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl Scalar for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
                    f(&self.to_le_bytes())
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_scalar!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// Immutable key-value pair. Equality and ordering look at the key only,
/// which is what sort-merge needs.
#[derive(Debug, Clone, Copy)]
pub struct KVPair<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> KVPair<K, V> {
    pub fn new(key: K, value: V) -> Self {
        KVPair { key, value }
    }

    /// Consume into a plain `(key, value)` tuple.
    pub fn into_tuple(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K: Ord, V> PartialEq for KVPair<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Ord, V> Eq for KVPair<K, V> {}

impl<K: Ord, V> PartialOrd for KVPair<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, V> Ord for KVPair<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// Engine-wide unique identifier of a disk run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_roundtrip_keeps_sign() {
        let bytes = (-42i32).with_bytes(|b| b.to_vec());
        assert_eq!(bytes.len(), 4);
        assert_eq!(i32::decode(&bytes), -42);
    }

    #[test]
    fn pairs_compare_by_key_only() {
        let a = KVPair::new(1u32, 10u32);
        let b = KVPair::new(1u32, 20u32);
        let c = KVPair::new(2u32, 0u32);
        assert_eq!(a, b);
        assert!(a < c);
    }
}
