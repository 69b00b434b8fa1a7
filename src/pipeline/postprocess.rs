//! Optional tidy pass over the final document.
//!
//! Pasted content drags in editor artefacts: CRLF line endings from Windows
//! clipboards, non-breaking spaces from word processors, zero-width joiners
//! and BOMs from web pages. None of these change the rendered Markdown, but
//! they make stored documents noisy to diff and search.
//!
//! The pass is off by default ([`crate::config::IngestConfig::tidy_output`]):
//! with it disabled the output is exactly what the compiler and resolution
//! pass produced.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule only sees `\n`.
//! Invisible characters go before whitespace trimming, since a line ending in
//! `" \u{200B}"` should lose its trailing space too.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all tidy rules, in order:
///
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Replace non-breaking spaces with plain spaces
/// 3. Strip invisible Unicode (zero-width characters, BOM, soft hyphen)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive newlines down to 2
/// 6. Ensure the text ends with exactly one newline
pub fn tidy_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = replace_nbsp(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Non-breaking spaces ──────────────────────────────────────────────

fn replace_nbsp(input: &str) -> String {
    input.replace(['\u{00A0}', '\u{202F}'], " ")
}

// ── Rule 3: Invisible characters ─────────────────────────────────────────────

static RE_INVISIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{200B}\u{200C}\u{200D}\u{2060}\u{FEFF}\u{00AD}]").unwrap());

fn remove_invisible_chars(input: &str) -> String {
    RE_INVISIBLE.replace_all(input, "").into_owned()
}

// ── Rule 4: Trailing whitespace ──────────────────────────────────────────────

static RE_TRAILING_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)[ \t]+$").unwrap());

fn trim_trailing_whitespace(input: &str) -> String {
    RE_TRAILING_WS.replace_all(input, "").into_owned()
}

// ── Rule 5: Blank lines ──────────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Rule 6: Final newline ────────────────────────────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end_matches('\n');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}
