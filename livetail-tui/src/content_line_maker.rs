use unicode_width::UnicodeWidthChar;

/// Strips ANSI escape sequences and control characters (except `\n`) so a
/// record cannot corrupt the terminal or desync the row layout.
pub fn sanitize_control_chars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphabetic() {
                        chars.next();
                        break;
                    }
                    chars.next();
                }
            }
            continue;
        }
        if c.is_control() && c != '\n' {
            continue;
        }
        result.push(c);
    }

    result
}

/// Wraps sanitized content into display rows of at most `width` cells.
///
/// Every `\n`-separated segment produces at least one row, including a
/// trailing empty one, so `wrap_content(x, w).len()` is exactly the height
/// the renderer reports back to the layout.
pub fn wrap_content(content: &str, width: u16) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }

    let width = width as usize;
    let sanitized = sanitize_control_chars(content);
    let mut rows = Vec::new();

    for segment in sanitized.split('\n') {
        let mut current = String::new();
        let mut used = 0usize;

        for ch in segment.chars() {
            let cells = ch.width().unwrap_or(0);
            if used + cells > width && !current.is_empty() {
                rows.push(std::mem::take(&mut current));
                used = 0;
            }
            current.push(ch);
            used += cells;
        }

        rows.push(current);
    }

    rows
}

/// Number of display rows `content` occupies at `width` cells.
pub fn wrapped_rows(content: &str, width: u16) -> u16 {
    wrap_content(content, width).len().min(u16::MAX as usize) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content() {
        let result = wrap_content("", 10);
        assert_eq!(result, vec![""]);
    }

    #[test]
    fn test_zero_width() {
        let result = wrap_content("hello", 0);
        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_short_content() {
        let result = wrap_content("hello", 10);
        assert_eq!(result, vec!["hello"]);
    }

    #[test]
    fn test_exact_width() {
        let result = wrap_content("hello", 5);
        assert_eq!(result, vec!["hello"]);
    }

    #[test]
    fn test_long_content() {
        let result = wrap_content("hello world", 5);
        assert_eq!(result, vec!["hello", " worl", "d"]);
    }

    #[test]
    fn test_newline_handling() {
        let result = wrap_content("hello\nworld", 10);
        assert_eq!(result, vec!["hello", "world"]);
    }

    #[test]
    fn test_multiple_newlines() {
        let result = wrap_content("hello\n\nworld", 10);
        assert_eq!(result, vec!["hello", "", "world"]);
    }

    #[test]
    fn test_trailing_newline_keeps_a_row() {
        let result = wrap_content("hello\n", 10);
        assert_eq!(result, vec!["hello", ""]);
    }

    #[test]
    fn test_wide_chars_wrap_by_cells() {
        // each CJK char is two cells, so four chars need two rows at width 4
        let result = wrap_content("你好世界", 4);
        assert_eq!(result, vec!["你好", "世界"]);
    }

    #[test]
    fn test_wide_char_never_splits() {
        let result = wrap_content("a你", 2);
        assert_eq!(result, vec!["a", "你"]);
    }

    #[test]
    fn test_sanitize_removes_carriage_return() {
        assert_eq!(sanitize_control_chars("hello\rworld"), "helloworld");
    }

    #[test]
    fn test_sanitize_removes_ansi_escape() {
        assert_eq!(sanitize_control_chars("hello\x1b[31mworld"), "helloworld");
    }

    #[test]
    fn test_sanitize_removes_ansi_with_reset() {
        assert_eq!(
            sanitize_control_chars("hello\x1b[31mred\x1b[0mworld"),
            "helloredworld"
        );
    }

    #[test]
    fn test_sanitize_preserves_newline() {
        assert_eq!(sanitize_control_chars("hello\nworld\ttab"), "hello\nworldtab");
    }

    #[test]
    fn test_wrapped_rows_matches_wrap_content() {
        for content in ["", "hello world", "a\nb\nc", "你好世界님", "line\n"] {
            for width in [1u16, 3, 8, 80] {
                assert_eq!(
                    wrapped_rows(content, width) as usize,
                    wrap_content(content, width).len(),
                    "content {:?} width {}",
                    content,
                    width
                );
            }
        }
    }
}
