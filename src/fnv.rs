//! 64-bit FNV-1a over station names.

pub const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
pub const PRIME: u64 = 0x0000_0100_0000_01b3;

/// Folds one byte into a running hash. Start from [`OFFSET_BASIS`].
#[inline(always)]
pub fn step(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(PRIME)
}

#[inline]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(OFFSET_BASIS, |hash, &b| step(hash, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(fnv1a(b""), OFFSET_BASIS);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn incremental_equals_whole() {
        let name = "Saint-Étienne".as_bytes();
        let mut hash = OFFSET_BASIS;
        for &b in name {
            hash = step(hash, b);
        }
        assert_eq!(hash, fnv1a(name));
    }
}
