//! Reply formatting - pretty JSON inside Discord's message size limit.

use serde_json::Value;

/// Maximum characters in one Discord message
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

const TRUNCATED_MARKER: &str = "\n…(truncated)";

/// Renders `value` as pretty JSON in a code block after `label`.
///
/// The JSON is shortened so the whole reply fits in one message; the code
/// fence is always closed.
#[must_use]
pub fn json_block(label: &str, value: &Value) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    let prefix = format!("{label}\n```json\n");
    let suffix = "\n```";

    let budget = DISCORD_MESSAGE_LIMIT
        .saturating_sub(prefix.chars().count() + suffix.len());
    format!("{prefix}{}{suffix}", truncate_chars(&pretty, budget))
}

/// Shortens free text to fit in a single message.
#[must_use]
pub fn truncate_message(text: &str) -> String {
    truncate_chars(text, DISCORD_MESSAGE_LIMIT)
}

/// Cuts `text` to at most `max` characters, marking the cut.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(TRUNCATED_MARKER.chars().count());
    let mut shortened: String = text.chars().take(keep).collect();
    shortened.push_str(TRUNCATED_MARKER);
    shortened
}
