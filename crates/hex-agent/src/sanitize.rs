//! Terminal control-sequence stripping for captured agent output

use std::sync::LazyLock;

use regex::Regex;

/// CSI: ESC [ params* intermediates* final-letter
static CSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-?]*[ -/]*[A-Za-z]").expect("valid CSI pattern"));

/// OSC: ESC ] ... terminated by BEL or ST
static OSC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)").expect("valid OSC pattern")
});

/// DCS / SOS / PM / APC strings, which may span lines
static STRING_SEQ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\x1b[PX^_].*?(?:\x1b\\|\x07)").expect("valid string-sequence pattern")
});

/// Left behind by some terminals when a keyboard-protocol pop loses its ESC.
const GARBAGE_TOKEN: &str = "[<u";

/// Strip escape sequences and control bytes, then trim.
///
/// Total and idempotent. Any ESC surviving the sequence passes is dropped as a
/// control byte. The token check runs on the output tail after every push, so
/// pieces joined by a dropped byte (`"[<\x01u"`) or by an inner removal
/// (`"[<[<uu"`) are caught in the same scan.
pub fn sanitize(raw: &str) -> String {
    let text = CSI.replace_all(raw, "");
    let text = OSC.replace_all(&text, "");
    let text = STRING_SEQ.replace_all(&text, "");

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_stripped_control(c) {
            continue;
        }
        out.push(c);
        if c == 'u' && out.ends_with(GARBAGE_TOKEN) {
            out.truncate(out.len() - GARBAGE_TOKEN.len());
        }
    }
    out.trim().to_string()
}

/// C0 controls except tab and newline, plus DEL
fn is_stripped_control(c: char) -> bool {
    matches!(c, '\x00'..='\x08' | '\x0b'..='\x1f' | '\x7f')
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "plain text",
        "  padded  \n",
        "\x1b[31mred\x1b[0m text",
        "\x1b[?25l\x1b[2K\x1b[1;32mok\x1b[m",
        "\x1b]0;window title\x07after",
        "\x1b]8;;https://example.com\x1b\\link\x1b]8;;\x1b\\",
        "\x1bPq#0;2;0;0;0\nmulti\nline\x1b\\visible",
        "\x1b_apc payload\x07tail",
        "[<u[<uhello[<u",
        "[<\x01u",
        "[\x1b[0m<u",
        "tab\tand\nnewline\r\n\x00\x07\x08\x7f",
        "\x1b[31",
        "\x1b",
        "ünïcödé \x1b[1m✓\x1b[0m",
    ];

    #[test]
    fn test_strips_csi() {
        assert_eq!(sanitize("\x1b[1;31mError\x1b[0m: boom"), "Error: boom");
        assert_eq!(sanitize("\x1b[?2004hready\x1b[?2004l"), "ready");
        assert_eq!(sanitize("a\x1b[2 qb"), "ab");
    }

    #[test]
    fn test_strips_osc_with_either_terminator() {
        assert_eq!(sanitize("\x1b]0;title\x07body"), "body");
        assert_eq!(sanitize("\x1b]2;title\x1b\\body"), "body");
    }

    #[test]
    fn test_strips_string_sequences_across_lines() {
        assert_eq!(sanitize("before\x1bPline1\nline2\x1b\\after"), "beforeafter");
        assert_eq!(sanitize("x\x1b^privacy\x07y"), "xy");
    }

    #[test]
    fn test_removes_garbage_token() {
        assert_eq!(sanitize("[<uHello[<u world"), "Hello world");
        assert!(!sanitize("[<\x02u").contains("[<u"));
    }

    #[test]
    fn test_removes_control_bytes_but_keeps_tab_and_newline() {
        let out = sanitize("a\x00b\x07c\x08d\x7fe\tf\ng\r\n");
        assert_eq!(out, "abcde\tf\ng");
        for c in out.chars() {
            assert!(c == '\t' || c == '\n' || !c.is_control());
        }
    }

    #[test]
    fn test_unterminated_escape_leaves_no_control_bytes() {
        assert_eq!(sanitize("ok\x1b[31"), "ok[31");
        assert_eq!(sanitize("\x1b"), "");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(sanitize("\n\n  answer  \n"), "answer");
    }

    #[test]
    fn test_nested_tokens_collapse_in_linear_time() {
        let depth = 20_000;
        let nested = "[<".repeat(depth) + &"u".repeat(depth);
        let start = std::time::Instant::now();
        assert_eq!(sanitize(&nested), "");
        assert!(start.elapsed() < std::time::Duration::from_secs(2));

        assert_eq!(sanitize("a[<[<\x01uub"), "ab");
        assert_eq!(sanitize("[<[<u"), "[<");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for sample in SAMPLES {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_preserves_unicode() {
        assert_eq!(sanitize("ünïcödé \x1b[1m✓\x1b[0m"), "ünïcödé ✓");
    }
}
