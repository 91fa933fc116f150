use primitive_types::{H160 as PrimitiveH160, H256 as PrimitiveH256};

pub type H160 = PrimitiveH160;
pub type H256 = PrimitiveH256;

/// Lossy slice constructors: shorter input is left-aligned, longer input is
/// truncated to the leading bytes.
pub trait HashExt {
    fn from_slice_truncated(slice: &[u8]) -> Self;
}

impl HashExt for H160 {
    fn from_slice_truncated(slice: &[u8]) -> Self {
        let mut hash = H160::zero();
        let len = std::cmp::min(slice.len(), 20);
        hash.as_bytes_mut()[..len].copy_from_slice(&slice[..len]);
        hash
    }
}

impl HashExt for H256 {
    fn from_slice_truncated(slice: &[u8]) -> Self {
        let mut hash = H256::zero();
        let len = std::cmp::min(slice.len(), 32);
        hash.as_bytes_mut()[..len].copy_from_slice(&slice[..len]);
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_short_slice() {
        let data = vec![0xffu8; 10];
        let h = H256::from_slice_truncated(&data);
        assert_eq!(h.as_bytes()[9], 0xff);
        assert_eq!(h.as_bytes()[10], 0);
    }

    #[test]
    fn test_from_long_slice() {
        let data = vec![1u8; 100];
        let h = H256::from_slice_truncated(&data);
        assert_eq!(h.as_bytes()[0], 1);
        assert_eq!(h.as_bytes()[31], 1);
    }
}
