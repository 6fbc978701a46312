//! 共享密钥校验

/// 常量时间比较两个密钥
///
/// 比较次数只取决于较长一方的长度，不因第一个不同字节提前返回。
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let a = provided.as_bytes();
    let b = expected.as_bytes();

    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("S", "S"));
        assert!(secrets_match("", ""));
        assert!(!secrets_match("wrong", "S"));
        assert!(!secrets_match("S", "S\0"));
        assert!(!secrets_match("abc", "abd"));
    }
}
