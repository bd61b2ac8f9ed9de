use chrono::{DateTime, Local, Utc};

/// Default rendering for timestamps in exported files, close to an en-US locale string
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

// Helper method for parsing tags
pub fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Renders a stored UTC timestamp in local time
pub fn format_timestamp(timestamp: &DateTime<Utc>, format: &str) -> String {
    timestamp.with_timezone(&Local).format(format).to_string()
}

/// Removes the leading `<!-- ... -->` block written into the editor template.
///
/// Comments further down belong to the prompt and are kept.
pub fn strip_editor_comments(content: &str) -> String {
    let body = content
        .trim_start()
        .strip_prefix("<!--")
        .and_then(|rest| rest.split_once("-->"))
        .map(|(_, after)| after)
        .unwrap_or(content);

    body.trim().to_string()
}

/// First non-empty line of the content, cut to `max_chars` characters
pub fn content_preview(content: &str, max_chars: usize) -> String {
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    if first_line.chars().count() <= max_chars {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tags_trims_and_keeps_order() {
        assert_eq!(
            parse_tags(Some(" b , a,, b ".to_string())),
            vec!["b", "a", "b"]
        );
        assert!(parse_tags(None).is_empty());
        assert!(parse_tags(Some(" , ".to_string())).is_empty());
    }

    #[test]
    fn editor_header_is_removed() {
        let raw = "<!--\nPrompt: X\nWrite below.\n-->\n\nActual prompt\nmore\n";
        assert_eq!(strip_editor_comments(raw), "Actual prompt\nmore");
    }

    #[test]
    fn comments_in_the_body_survive() {
        let raw = "<!--\nPrompt: X\n-->\n\n<!-- Use the persona below -->\nYou are a helpful assistant.";
        assert_eq!(
            strip_editor_comments(raw),
            "<!-- Use the persona below -->\nYou are a helpful assistant."
        );

        // a file whose header was deleted is taken as-is
        assert_eq!(
            strip_editor_comments("Plain text\n<!-- note -->"),
            "Plain text\n<!-- note -->"
        );
    }

    #[test]
    fn preview_is_char_safe() {
        assert_eq!(content_preview("\n\nhéllo wörld", 5), "héllo...");
        assert_eq!(content_preview("short", 10), "short");
    }

    #[test]
    fn timestamp_uses_given_format() {
        let ts = DateTime::parse_from_rfc3339("2024-03-05T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(&ts, "%Y"), "2024");
    }
}
