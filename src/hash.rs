use std::hash::Hash;

use siphasher::sip128::{Hasher128, SipHasher13};

/// Produce a 128-bit hash of a value.
#[inline]
pub fn hash<T: Hash>(value: &T) -> u128 {
    let mut state = SipHasher13::new();
    value.hash(&mut state);
    state.finish128().as_u128()
}

/// Produce a 128-bit hash of a raw byte buffer.
///
/// Unlike [`hash`], this digests the buffer without the length prefix that
/// `impl Hash for [u8]` writes. Content digests use it because the buffer is
/// already a canonical encoding of the value.
#[inline]
pub fn hash_bytes(bytes: &[u8]) -> u128 {
    use std::hash::Hasher;
    let mut state = SipHasher13::new();
    state.write(bytes);
    state.finish128().as_u128()
}
