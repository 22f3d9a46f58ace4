use std::sync::OnceLock;
use regex::Regex;
use crate::events::RawLine;

fn line_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+) \| (.*?) \| (.*)$").expect("static line pattern"))
}

/// Decodes `<line> | <timestamp> | <content>`. The first two ` | ` separators
/// delimit the fields; any later `|` stays in the content.
pub fn decode_line(line: &str) -> Option<RawLine> {
    let caps = line_shape().captures(line)?;
    let line_number = caps.get(1)?.as_str().parse::<u64>().ok()?;
    Some(RawLine {
        line_number,
        timestamp: caps.get(2)?.as_str().to_string(),
        content: caps.get(3)?.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_three_part_line() {
        let r = decode_line("42 | 2024-05-01 10:00:00.123 | renderSize={10, 20}").unwrap();
        assert_eq!(r.line_number, 42);
        assert_eq!(r.timestamp, "2024-05-01 10:00:00.123");
        assert_eq!(r.content, "renderSize={10, 20}");
    }

    #[test]
    fn keeps_pipes_inside_content() {
        let r = decode_line("7 | 12:00:00 | a | b | c").unwrap();
        assert_eq!(r.timestamp, "12:00:00");
        assert_eq!(r.content, "a | b | c");
    }

    #[test]
    fn rejects_free_text() {
        assert!(decode_line("text_style_guid:ABC").is_none());
        assert!(decode_line("}").is_none());
        assert!(decode_line("x | 12:00 | nope").is_none());
        assert!(decode_line("12 | only-two-fields").is_none());
        assert!(decode_line("").is_none());
    }

    #[test]
    fn rejects_line_number_overflow() {
        assert!(decode_line("99999999999999999999999 | t | c").is_none());
    }
}
