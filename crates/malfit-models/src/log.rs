//! Bounded job trace log.

/// Default number of characters retained in a job's `log` field.
pub const DEFAULT_LOG_CAP: usize = 4000;

/// Append `line` to `current` (newline separated) and keep only the last
/// `cap` characters.
///
/// Truncation counts Unicode scalar values, never bytes, so multi-byte
/// text is never split mid-character.
pub fn append_capped(current: &str, line: &str, cap: usize) -> String {
    let mut joined = String::with_capacity(current.len() + line.len() + 1);
    joined.push_str(current);
    if !current.is_empty() {
        joined.push('\n');
    }
    joined.push_str(line);

    let total = joined.chars().count();
    if total <= cap {
        return joined;
    }

    let skip = total - cap;
    match joined.char_indices().nth(skip) {
        Some((byte_idx, _)) => joined[byte_idx..].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line_has_no_separator() {
        assert_eq!(append_capped("", "started", 100), "started");
        assert_eq!(append_capped("started", "audio: .m4a", 100), "started\naudio: .m4a");
    }

    #[test]
    fn test_drops_oldest_characters_first() {
        let log = append_capped("abcdef", "ghij", 6);
        assert_eq!(log, "f\nghij");
        assert_eq!(log.chars().count(), 6);
    }

    #[test]
    fn test_truncates_on_char_boundaries() {
        let log = append_capped("완료", "에러 ❌", 4);
        assert_eq!(log.chars().count(), 4);
        assert_eq!(log, "에러 ❌");
    }

    #[test]
    fn test_zero_cap_keeps_nothing() {
        assert_eq!(append_capped("abc", "def", 0), "");
    }
}
