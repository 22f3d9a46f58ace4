use std::collections::HashMap;
use crate::decoder::decode_line;
use crate::events::{Event, EventData};

pub const BLOCK_OPEN: &str = "Action:{";
pub const BLOCK_CLOSE: &str = "}";
const GUID_KEY: &str = "text_style_guid";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState { Outside, InsideBlock }

#[derive(Debug, PartialEq)]
pub enum BlockStep {
    /// Not part of a block; the caller hands the line to the extractors.
    Passthrough,
    Opened,
    Field,
    Closed(Option<Event>),
}

/// Two-state scanner for `Action:{ ... }` records. Blocks are flat: an open
/// marker seen inside a block is stored like any other `key:value` line.
#[derive(Debug)]
pub struct ActionBlockAccumulator {
    state: BlockState,
    fields: HashMap<String, String>,
    anchor_line: u64,
    anchor_timestamp: String,
}

impl Default for ActionBlockAccumulator {
    fn default() -> Self { Self::new() }
}

impl ActionBlockAccumulator {
    pub fn new() -> Self {
        Self { state: BlockState::Outside, fields: HashMap::new(), anchor_line: 0, anchor_timestamp: String::new() }
    }

    #[cfg(test)]
    pub fn state(&self) -> BlockState { self.state }

    /// `line` and `previous` are already trimmed. `previous` is the raw line
    /// immediately before `line`, whatever it contained.
    pub fn feed(&mut self, line: &str, previous: Option<&str>) -> BlockStep {
        match self.state {
            BlockState::Outside => {
                if !(line == BLOCK_OPEN || line.ends_with(BLOCK_OPEN)) { return BlockStep::Passthrough; }
                let anchor = decode_line(line).or_else(|| previous.and_then(decode_line));
                match anchor {
                    Some(raw) => { self.anchor_line = raw.line_number; self.anchor_timestamp = raw.timestamp; }
                    None => { self.anchor_line = 0; self.anchor_timestamp.clear(); }
                }
                self.fields.clear();
                self.state = BlockState::InsideBlock;
                log::trace!("action block opened, anchor line {}", self.anchor_line);
                BlockStep::Opened
            }
            BlockState::InsideBlock => {
                if line == BLOCK_CLOSE {
                    self.state = BlockState::Outside;
                    let ev = self.take_event();
                    self.fields.clear();
                    return BlockStep::Closed(ev);
                }
                if let Some((k, v)) = line.split_once(':') {
                    self.fields.insert(k.to_string(), v.to_string());
                }
                BlockStep::Field
            }
        }
    }

    fn take_event(&mut self) -> Option<Event> {
        let guid = self.fields.remove(GUID_KEY)?;
        let mut field = |k: &str| self.fields.remove(k).unwrap_or_default();
        let data = EventData::TextStyle {
            guid,
            operation: field("operation"),
            feature_name: field("feature_name"),
            text_category: field("text_category"),
        };
        Some(Event::new(self.anchor_line, &self.anchor_timestamp, data))
    }

    pub fn finish(mut self) -> bool {
        let dropped = self.state == BlockState::InsideBlock;
        if dropped { log::debug!("discarding unterminated action block opened at line {} ({} fields)", self.anchor_line, self.fields.len()); }
        self.fields.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(lines: &[&str]) -> (Vec<Event>, bool) {
        let mut acc = ActionBlockAccumulator::new();
        let mut out = vec![];
        let mut prev: Option<&str> = None;
        for l in lines {
            if let BlockStep::Closed(Some(e)) = acc.feed(l, prev) { out.push(e); }
            prev = Some(l);
        }
        (out, acc.finish())
    }

    #[test]
    fn anchor_comes_from_preceding_line() {
        let (evs, dropped) = run(&["5 | 12:00:00 | start", "Action:{", "text_style_guid:ABC123", "operation:apply", "}"]);
        assert!(!dropped);
        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].line, 5);
        assert_eq!(evs[0].timestamp, "12:00:00");
        assert_eq!(evs[0].data, EventData::TextStyle {
            guid: "ABC123".to_string(),
            operation: "apply".to_string(),
            feature_name: String::new(),
            text_category: String::new(),
        });
    }

    #[test]
    fn anchor_comes_from_opening_line_when_decodable() {
        let (evs, _) = run(&["1 | t0 | other", "9 | 08:15:00 | Action:{", "text_style_guid:G", "}"]);
        assert_eq!(evs[0].line, 9);
        assert_eq!(evs[0].timestamp, "08:15:00");
    }

    #[test]
    fn block_without_guid_emits_nothing_and_resets() {
        let (evs, _) = run(&["1 | t | x", "Action:{", "operation:apply", "}", "2 | t2 | y", "Action:{", "text_style_guid:Z", "}"]);
        assert_eq!(evs.len(), 1);
        match &evs[0].data { EventData::TextStyle { operation, .. } => assert_eq!(operation, ""), _ => panic!() }
        assert_eq!(evs[0].line, 2);
    }

    #[test]
    fn split_on_first_colon_and_last_write_wins() {
        let (evs, _) = run(&["3 | t | x", "Action:{", "text_style_guid:a:b", "text_category:one", "text_category:two", "}"]);
        match &evs[0].data {
            EventData::TextStyle { guid, text_category, .. } => { assert_eq!(guid, "a:b"); assert_eq!(text_category, "two"); }
            _ => panic!(),
        }
    }

    #[test]
    fn nested_open_marker_is_a_plain_field() {
        let mut acc = ActionBlockAccumulator::new();
        assert_eq!(acc.feed("Action:{", Some("4 | t | x")), BlockStep::Opened);
        assert_eq!(acc.feed("Action:{", None), BlockStep::Field);
        assert_eq!(acc.state(), BlockState::InsideBlock);
        assert_eq!(acc.feed("text_style_guid:Q", None), BlockStep::Field);
        match acc.feed("}", None) {
            BlockStep::Closed(Some(e)) => assert_eq!(e.line, 4),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(acc.feed("}", None), BlockStep::Passthrough);
    }

    #[test]
    fn unterminated_block_is_discarded() {
        let (evs, dropped) = run(&["1 | t | x", "Action:{", "text_style_guid:LOST"]);
        assert!(evs.is_empty());
        assert!(dropped);
    }
}
