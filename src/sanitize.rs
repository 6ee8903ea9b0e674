//! Removal of model control tags from assistant text.
//!
//! Some models wrap internal reasoning as `<|channel|>analysis<|message|>` and sprinkle role
//! markers such as `<|start|>` or `<|end|>` into their output.  None of it is meant for the
//! reader.

use std::sync::LazyLock;

use regex::Regex;

static CHANNEL_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\|channel\|>.*?<\|message\|>").expect("valid regex"));

static CONTROL_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|[^|]*\|>").expect("valid regex"));

/// Strip control tags from `text` and trim the result.
///
/// Removal repeats until nothing matches, so a marker exposed by removing an inner one is
/// removed too.  This makes `clean` idempotent.
pub fn clean(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = CONTROL_MARKER
            .replace_all(&CHANNEL_SPAN.replace_all(&current, ""), "")
            .into_owned();
        // Every removal shortens the text, so equal means nothing matched.
        if next == current {
            break;
        }
        current = next;
    }
    current.trim().to_string()
}
