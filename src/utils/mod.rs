pub mod config;
pub mod logger;

/// Split `text` into chunks of at most `size` characters, never inside a
/// character. Used to replay a complete response as a stream.
pub fn split_chunks(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    for (count, (idx, _)) in text.char_indices().enumerate() {
        if count > 0 && count % size == 0 {
            chunks.push(&text[start..idx]);
            start = idx;
        }
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_chunks() {
        assert_eq!(split_chunks("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(split_chunks("héllo", 2), vec!["hé", "ll", "o"]);
        assert_eq!(split_chunks("ab", 0), vec!["a", "b"]);
        assert!(split_chunks("", 4).is_empty());
    }
}
