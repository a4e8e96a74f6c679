//! ANSI-aware text measurement and truncation
//!
//! Strings are split into visible runs and CSI escape sequences
//! (`ESC [ params letter`). Width counts characters of visible runs only, so
//! color codes never shift column alignment.

pub const RESET: &str = "\x1b[0m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const BOLD: &str = "\x1b[1m";

pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    Escape(&'a str),
}

/// Split `s` into visible runs and escape sequences, preserving every byte.
/// An unterminated escape is treated as visible text.
pub fn tokenize(s: &str) -> Vec<Token<'_>> {
    let bytes = s.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(end) = escape_end(bytes, i) {
            if text_start < i {
                tokens.push(Token::Text(&s[text_start..i]));
            }
            tokens.push(Token::Escape(&s[i..end]));
            i = end;
            text_start = end;
        } else {
            i += 1;
        }
    }
    if text_start < bytes.len() {
        tokens.push(Token::Text(&s[text_start..]));
    }
    tokens
}

/// End offset of a CSI sequence starting at `start`, if one starts there.
fn escape_end(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes.get(start) != Some(&0x1b) || bytes.get(start + 1) != Some(&b'[') {
        return None;
    }
    let mut j = start + 2;
    while let Some(&b) = bytes.get(j) {
        match b {
            b'0'..=b'9' | b';' => j += 1,
            b'a'..=b'z' | b'A'..=b'Z' => return Some(j + 1),
            _ => return None,
        }
    }
    None
}

/// Visible character count, ignoring escape sequences.
pub fn display_width(s: &str) -> usize {
    tokenize(s)
        .iter()
        .map(|token| match token {
            Token::Text(text) => text.chars().count(),
            Token::Escape(_) => 0,
        })
        .sum()
}

pub fn strip(s: &str) -> String {
    tokenize(s)
        .iter()
        .filter_map(|token| match token {
            Token::Text(text) => Some(*text),
            Token::Escape(_) => None,
        })
        .collect()
}

/// Shorten `s` to at most `max` visible characters.
///
/// Text that needs cutting keeps `max - 3` characters and ends in `...`. Escape
/// codes seen before the cut are kept in order, so the ellipsis carries the
/// color active at the cut, and a reset closes colored results. Budgets smaller than
/// the ellipsis get a plain cut of the color-stripped text.
pub fn truncate(s: &str, max: usize) -> String {
    if display_width(s) <= max {
        return s.to_string();
    }

    if max < ELLIPSIS.len() {
        return strip(s).chars().take(max).collect();
    }

    let budget = max - ELLIPSIS.len();
    let mut out = String::with_capacity(s.len());
    let mut kept = 0;
    let mut colored = false;

    'tokens: for token in tokenize(s) {
        match token {
            Token::Escape(code) => {
                out.push_str(code);
                colored = true;
            }
            Token::Text(text) => {
                for ch in text.chars() {
                    if kept == budget {
                        break 'tokens;
                    }
                    out.push(ch);
                    kept += 1;
                }
            }
        }
    }

    out.push_str(ELLIPSIS);
    if colored {
        out.push_str(RESET);
    }
    out
}

/// Left-align `s` in a field of `width` visible characters. Never shortens.
pub fn pad(s: &str, width: usize) -> String {
    let current = display_width(s);
    if current >= width {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + width - current);
    out.push_str(s);
    out.extend(std::iter::repeat(' ').take(width - current));
    out
}

/// Truncate then pad: the result is exactly `width` visible characters.
pub fn fit(s: &str, width: usize) -> String {
    pad(&truncate(s, width), width)
}

/// Wrap `s` in `color` and a reset, or return it untouched when colors are off.
pub fn paint(s: &str, color: &str, enabled: bool) -> String {
    if enabled {
        format!("{color}{s}{RESET}")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_round_trips_bytes() {
        let s = "a\x1b[31mbc\x1b[0m\x1b[1;32md";
        let tokens = tokenize(s);
        assert_eq!(
            tokens,
            vec![
                Token::Text("a"),
                Token::Escape("\x1b[31m"),
                Token::Text("bc"),
                Token::Escape("\x1b[0m"),
                Token::Escape("\x1b[1;32m"),
                Token::Text("d"),
            ]
        );
        let joined: String = tokens
            .iter()
            .map(|t| match t {
                Token::Text(x) | Token::Escape(x) => *x,
            })
            .collect();
        assert_eq!(joined, s);
    }

    #[test]
    fn test_unterminated_escape_is_text() {
        assert_eq!(tokenize("ab\x1b[3"), vec![Token::Text("ab\x1b[3")]);
        assert_eq!(display_width("\x1b["), 2);
    }

    #[test]
    fn test_display_width_ignores_escapes() {
        assert_eq!(display_width("\x1b[31mAB\x1b[0m"), 2);
        assert_eq!(display_width("\x1b[1m\x1b[34m\x1b[0mAB\x1b[0m\x1b[0m"), 2);
        assert_eq!(display_width("├─ nœud"), 7);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn test_strip() {
        assert_eq!(strip("x\x1b[33mSTANDBY\x1b[0m]"), "xSTANDBY]");
    }

    #[test]
    fn test_truncate_plain() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("very-long-device-name-1234", 20), "very-long-device-...");
        assert_eq!(display_width(&truncate("very-long-device-name-1234", 20)), 20);
    }

    #[test]
    fn test_truncate_keeps_color_active_at_cut() {
        let s = format!("fw-01 [{GREEN}ACTIVE{RESET}]");
        let cut = truncate(&s, 11);
        assert_eq!(cut, format!("fw-01 [{GREEN}A...{RESET}"));
        assert_eq!(display_width(&cut), 11);
    }

    #[test]
    fn test_truncate_keeps_reset_before_cut() {
        let s = format!("{RED}AB{RESET}CDEFG");
        assert_eq!(truncate(&s, 5), format!("{RED}AB{RESET}...{RESET}"));
    }

    #[test]
    fn test_truncate_tiny_budget_hard_cut() {
        let s = format!("{RED}ABCDEF{RESET}");
        assert_eq!(truncate(&s, 2), "AB");
        assert_eq!(truncate(&s, 0), "");
        assert_eq!(truncate(&s, 3), format!("{RED}...{RESET}"));
    }

    #[test]
    fn test_truncate_is_idempotent() {
        let inputs = [
            "very-long-device-name-1234".to_string(),
            format!("fw [{YELLOW}STANDBY{RESET}] with a tail"),
            format!("{BOLD}{BLUE}header{RESET} and more text"),
            "nœud-ünïcode-名前-long".to_string(),
        ];
        for input in &inputs {
            for width in 0..30 {
                let once = truncate(input, width);
                assert_eq!(truncate(&once, width), once, "width {width} input {input:?}");
                assert!(display_width(&once) <= width);
            }
        }
    }

    #[test]
    fn test_pad_and_fit() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcdef", 4), "abcdef");
        let colored = format!("{GREEN}OK{RESET}");
        assert_eq!(display_width(&pad(&colored, 6)), 6);
        assert_eq!(display_width(&fit("abcdefghij", 6)), 6);
        assert_eq!(fit("ab", 0), "");
    }

    #[test]
    fn test_paint() {
        assert_eq!(paint("x", RED, true), format!("{RED}x{RESET}"));
        assert_eq!(paint("x", RED, false), "x");
    }
}
