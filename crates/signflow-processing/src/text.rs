//! Text helpers for the standard PDF fonts

/// Keep the first `max_chars` characters, appending `...` when anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Encode text for a Type1 font using `WinAnsiEncoding`.
///
/// Latin-1 characters map to their single byte; anything else becomes `?`.
pub fn win_ansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match u32::from(c) {
            code @ 0x20..=0x7E | code @ 0xA0..=0xFF => code as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_is_unchanged() {
        assert_eq!(truncate_chars("Contract", 60), "Contract");
        assert_eq!(truncate_chars("", 5), "");
        assert_eq!(truncate_chars("exact", 5), "exact");
    }

    #[test]
    fn truncate_long_appends_ellipsis() {
        assert_eq!(truncate_chars("hello world", 5), "hello...");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("Núñez Gómez", 5), "Núñez...");
    }

    #[test]
    fn win_ansi_keeps_latin1() {
        assert_eq!(win_ansi_bytes("José"), vec![b'J', b'o', b's', 0xE9]);
        assert_eq!(win_ansi_bytes("a\u{4E2D}b"), b"a?b".to_vec());
    }
}
