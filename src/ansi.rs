use once_cell::sync::Lazy;
use regex::Regex;

// CSI sequences (colors, cursor movement), OSC sequences (titles, hyperlinks)
// terminated by BEL or ST, and lone two-byte escapes.
static ANSI_SEQUENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \x1b\[[0-?]*[\x20-/]*[@-~]
        | \x1b\][^\x07\x1b]*(?:\x07|\x1b\\)
        | \x1b[@-Z\\-_]
        | \x9b[0-?]*[\x20-/]*[@-~]",
    )
    .expect("valid ANSI pattern")
});

/// Strip terminal control sequences so command output can be parsed as JSON.
pub fn strip_ansi(text: &str) -> String {
    ANSI_SEQUENCE.replace_all(text, "").into_owned()
}
