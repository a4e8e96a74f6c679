//! Short human labels for fetch failures shown in the error banner

/// Substring (lowercase) to label, checked in order.
const ERROR_PATTERNS: &[(&str, &str)] = &[
    ("deadline exceeded", "Connection timeout"),
    ("timed out", "Connection timeout"),
    ("connection refused", "Connection refused"),
    ("no such host", "Host not found"),
    ("failed to lookup address", "Host not found"),
    ("dns error", "Host not found"),
    ("invalid credentials", "Invalid credentials"),
    ("no session cookie", "Authentication failed"),
    ("unauthorized", "Authentication failed"),
    ("forbidden", "Access denied"),
    ("not found", "Endpoint not found"),
    ("internal server error", "Server error"),
    ("bad gateway", "Bad gateway"),
    ("service unavailable", "Service unavailable"),
    ("network is unreachable", "Network unreachable"),
    ("certificate", "Certificate error"),
    ("tls handshake", "TLS/SSL error"),
    ("tls error", "TLS/SSL error"),
    ("handshake failure", "TLS/SSL error"),
    ("timeout", "Connection timeout"),
    ("connection reset", "Connection reset"),
    ("broken pipe", "Connection broken"),
];

const NOISE_PREFIXES: &[&str] = &["failed to ", "error: ", "unable to ", "cannot "];

const MAX_RAW_LEN: usize = 80;

/// Reduce a full error message to a label fit for a one-line banner.
pub fn summarize_error(message: &str) -> String {
    // URLs name hosts, not failures, and must not trigger a pattern
    let lower = message
        .split_whitespace()
        .filter(|word| !word.contains("://"))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if let Some((_, label)) = ERROR_PATTERNS.iter().find(|(pattern, _)| lower.contains(pattern)) {
        return label.to_string();
    }

    if let Some((_, tail)) = message.rsplit_once(": ") {
        let mut tail = tail;
        for prefix in NOISE_PREFIXES {
            tail = tail.strip_prefix(prefix).unwrap_or(tail);
        }
        let tail = capitalize(tail);
        if let Some(inner) = parenthesized(&tail) {
            return inner.to_string();
        }
        return tail;
    }

    if message.chars().count() > MAX_RAW_LEN {
        let head: String = message.chars().take(MAX_RAW_LEN - 3).collect();
        return format!("{head}...");
    }
    message.to_string()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parenthesized(s: &str) -> Option<&str> {
    let open = s.find('(')?;
    let close = open + s[open..].find(')')?;
    Some(&s[open + 1..close])
}
