use blake3::Hasher;

/// 32-byte BLAKE3 key of a normalized text, used to memoize embedding vectors.
#[inline]
pub fn hash_text(normalized: &str) -> [u8; 32] {
    *blake3::hash(normalized.as_bytes()).as_bytes()
}

/// Content fingerprint of a bank generation.
///
/// Order-sensitive: the same rows in a different order produce a different
/// fingerprint, since bank order decides exact-stage tie-breaks.
pub fn fingerprint_entries<'a, I>(entries: I) -> u64
where
    I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
{
    let mut hasher = Hasher::new();
    for (id, question, answer) in entries {
        hasher.update(id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(question.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(answer.as_bytes());
        hasher.update(b"\x1e");
    }

    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_text_determinism() {
        let text = "what is the office address?";
        assert_eq!(hash_text(text), hash_text(text));
    }

    #[test]
    fn test_hash_text_uniqueness() {
        assert_ne!(
            hash_text("what is the office address?"),
            hash_text("what is the office address")
        );
    }

    #[test]
    fn test_fingerprint_is_order_sensitive() {
        let a = ("1", "q1", "a1");
        let b = ("2", "q2", "a2");
        assert_eq!(fingerprint_entries([a, b]), fingerprint_entries([a, b]));
        assert_ne!(fingerprint_entries([a, b]), fingerprint_entries([b, a]));
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        let joined = fingerprint_entries([("1", "ab", "c")]);
        let shifted = fingerprint_entries([("1", "a", "bc")]);
        assert_ne!(joined, shifted);
    }
}
