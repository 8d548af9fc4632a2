//! Helpers for putting peer-supplied text into single-line log records.

use serde_json::Value;

const MAX_PREVIEW: usize = 120;

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
/// - other control characters => `\xNN`
///
/// Strings longer than 120 characters are cut with an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// `cmd` plus the acting player of a raw request, e.g. `hunt player=alice`.
/// Used for debug lines before the request has been parsed.
pub fn request_summary(request: &Value) -> String {
    let field = |key: &str| request.get(key).and_then(Value::as_str).map(escape_log);
    let cmd = field("cmd").unwrap_or_else(|| "<none>".to_string());
    match field("player").or_else(|| field("name")) {
        Some(who) => format!("{} player={}", cmd, who),
        None => cmd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_newlines_and_truncates() {
        assert_eq!(escape_log("Line1\nLine2\r\tEnd"), "Line1\\nLine2\\r\\tEnd");
        assert_eq!(escape_log("a\u{1b}b"), "a\\x1Bb");
        let long = "x".repeat(500);
        let esc = escape_log(&long);
        assert_eq!(esc.chars().count(), MAX_PREVIEW + 1);
        assert!(esc.ends_with('…'));
    }

    #[test]
    fn summarizes_requests() {
        assert_eq!(request_summary(&json!({"cmd": "hunt", "player": "al\nice"})), "hunt player=al\\nice");
        assert_eq!(request_summary(&json!({"cmd": "register", "name": "bob"})), "register player=bob");
        assert_eq!(request_summary(&json!({"cmd": "leaderboard"})), "leaderboard");
        assert_eq!(request_summary(&json!({"foo": 1})), "<none>");
    }
}
