//! Output truncation policy.
//!
//! Security tools tend to wrap their results in setup and summary noise while
//! the interesting lines are scattered through the middle. Output above
//! [`MAX_OUTPUT_CHARS`] is therefore cut one of two ways:
//!
//! 1. more than [`KEYWORD_LINE_THRESHOLD`] lines contain a signal keyword →
//!    keep the first [`MAX_KEYWORD_LINES`] of those lines, then the marker
//! 2. otherwise → the first and last [`HEAD_TAIL_CHARS`] characters joined by
//!    the marker
//!
//! Lengths are counted in characters, never bytes.

/// Output at or below this many characters is returned untouched.
pub const MAX_OUTPUT_CHARS: usize = 5000;

/// Characters kept from each end in head/tail mode.
pub const HEAD_TAIL_CHARS: usize = 2500;

/// Keyword-line mode applies only above this many matching lines.
pub const KEYWORD_LINE_THRESHOLD: usize = 20;

/// Matching lines kept in keyword-line mode.
pub const MAX_KEYWORD_LINES: usize = 50;

/// Case-insensitive signal keywords.
pub const SIGNAL_KEYWORDS: &[&str] = &[
    "vulnerability",
    "critical",
    "[+]",
    "finding",
    "exposed",
    "error",
    "warning",
];

pub const TRUNCATION_MARKER: &str = "\n...[TRUNCATED]...\n";

/// Does this line carry one of the signal keywords?
pub fn is_signal_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    SIGNAL_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Apply the truncation policy to combined tool output.
pub fn truncate_output(output: &str) -> String {
    let total = output.chars().count();
    if total <= MAX_OUTPUT_CHARS {
        return output.to_string();
    }

    let signal: Vec<&str> = output.lines().filter(|l| is_signal_line(l)).collect();
    if signal.len() > KEYWORD_LINE_THRESHOLD {
        let mut kept = signal
            .iter()
            .take(MAX_KEYWORD_LINES)
            .copied()
            .collect::<Vec<_>>()
            .join("\n");
        kept.push_str(TRUNCATION_MARKER);
        return kept;
    }

    let head: String = output.chars().take(HEAD_TAIL_CHARS).collect();
    let tail: String = output.chars().skip(total - HEAD_TAIL_CHARS).collect();
    format!("{head}{TRUNCATION_MARKER}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pad `lines` with neutral filler until the text exceeds `min_chars`.
    fn padded(lines: &[String], min_chars: usize) -> String {
        let mut out = String::new();
        let mut i = 0;
        for line in lines {
            out.push_str(line);
            out.push('\n');
            out.push_str(&format!("port {i}/tcp closed service unknown padding text here\n"));
            i += 1;
        }
        while out.chars().count() < min_chars {
            out.push_str(&format!("port {i}/tcp closed service unknown padding text here\n"));
            i += 1;
        }
        out
    }

    #[test]
    fn short_output_is_untouched() {
        let text = "critical\n".repeat(100);
        assert!(text.len() <= MAX_OUTPUT_CHARS);
        assert_eq!(truncate_output(&text), text);
    }

    #[test]
    fn dense_signal_keeps_keyword_lines() {
        let lines: Vec<String> = (0..25).map(|i| format!("[!] CRITICAL issue number {i}")).collect();
        let text = padded(&lines, 6000);
        assert!(text.chars().count() >= 6000);

        let result = truncate_output(&text);
        let expected = format!("{}{}", lines.join("\n"), TRUNCATION_MARKER);
        assert_eq!(result, expected);
        assert!(result.chars().count() < MAX_OUTPUT_CHARS);
    }

    #[test]
    fn keyword_mode_keeps_at_most_fifty_lines() {
        let lines: Vec<String> = (0..80).map(|i| format!("[+] finding {i}")).collect();
        let text = padded(&lines, 6000);
        let result = truncate_output(&text);
        let kept: Vec<&str> = result.trim_end_matches(TRUNCATION_MARKER).lines().collect();
        assert_eq!(kept.len(), MAX_KEYWORD_LINES);
        assert_eq!(kept[0], "[+] finding 0");
        assert_eq!(kept[49], "[+] finding 49");
    }

    #[test]
    fn sparse_signal_keeps_head_and_tail() {
        let lines: Vec<String> = (0..5).map(|i| format!("critical thing {i}")).collect();
        let text = padded(&lines, 6000);
        let total = text.chars().count();

        let result = truncate_output(&text);
        let head: String = text.chars().take(2500).collect();
        let tail: String = text.chars().skip(total - 2500).collect();
        assert_eq!(result, format!("{head}{TRUNCATION_MARKER}{tail}"));
    }

    #[test]
    fn exactly_threshold_lines_uses_head_tail() {
        let lines: Vec<String> = (0..KEYWORD_LINE_THRESHOLD).map(|i| format!("warning {i}")).collect();
        let text = padded(&lines, 6000);
        let result = truncate_output(&text);
        assert!(result.starts_with("warning 0\n"));
        assert_eq!(result.chars().count(), 2 * HEAD_TAIL_CHARS + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "é".repeat(4000);
        assert!(text.len() > MAX_OUTPUT_CHARS);
        assert_eq!(truncate_output(&text), text);
    }

    #[test]
    fn long_signal_lines_are_kept_whole() {
        let lines: Vec<String> = (0..25)
            .map(|i| format!("critical {i} {}", "x".repeat(1500)))
            .collect();
        let text = lines.join("\n");
        let result = truncate_output(&text);
        let kept: Vec<&str> = result.trim_end_matches(TRUNCATION_MARKER).lines().collect();
        assert_eq!(kept.len(), 25);
        for (kept, line) in kept.iter().zip(&lines) {
            assert_eq!(kept, line);
        }
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        assert!(is_signal_line("Port 22 EXPOSED to the internet"));
        assert!(is_signal_line("[+] Found admin panel"));
        assert!(!is_signal_line("22/tcp open ssh"));
    }
}
