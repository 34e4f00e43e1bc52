//! 常量时间比较（防时序侧信道）

use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};

/// 常量时间比较两个字节串
///
/// 先对两侧做SHA-256，长度不同的输入比较耗时也相同。
pub fn ct_eq_hashed(a: &[u8], b: &[u8]) -> Choice {
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    ha[..].ct_eq(&hb[..])
}

/// [`ct_eq_hashed`] 的bool版本
pub fn constant_time_eq_hash(a: &[u8], b: &[u8]) -> bool {
    ct_eq_hashed(a, b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq_hash() {
        assert!(constant_time_eq_hash(b"secret", b"secret"));
        assert!(!constant_time_eq_hash(b"secret", b"Secret"));
        assert!(!constant_time_eq_hash(b"secret", b"secret-but-longer"));
        assert!(constant_time_eq_hash(b"", b""));
    }
}
