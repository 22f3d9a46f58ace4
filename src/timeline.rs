use serde::Serialize;
use crate::action_block::{ActionBlockAccumulator, BlockStep};
use crate::decoder::decode_line;
use crate::events::{Event, EventKind};
use crate::extractors::extract_all;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Timeline {
    pub events: Vec<Event>,
}

impl Timeline {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, e: Event) { self.events.push(e); }

    pub fn len(&self) -> usize { self.events.len() }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool { self.events.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Event> { self.events.iter() }

    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.kind() == kind)
    }

    // stable: equal lines keep emission order
    pub fn sorted_by_line(&self) -> Vec<&Event> {
        let mut v: Vec<&Event> = self.events.iter().collect();
        v.sort_by_key(|e| e.line);
        v
    }

    pub fn counts_by_kind(&self) -> Vec<(EventKind, usize)> {
        EventKind::ALL.iter().map(|k| (*k, self.of_kind(*k).count())).collect()
    }

    pub fn retain_kinds(mut self, keep: impl Fn(EventKind) -> bool) -> Self {
        self.events.retain(|e| keep(e.kind()));
        self
    }
}

/// Single forward pass: block accumulation first, then every extractor on the
/// decoded lines the accumulator passed through.
pub fn scan_log(text: &str) -> Timeline {
    let mut timeline = Timeline::new();
    let mut acc = ActionBlockAccumulator::new();
    let mut previous: Option<&str> = None;
    let mut decoded_lines = 0usize;
    for raw_line in text.split('\n') {
        let line = raw_line.trim();
        match acc.feed(line, previous) {
            BlockStep::Passthrough => {
                if let Some(raw) = decode_line(line) {
                    decoded_lines += 1;
                    for e in extract_all(&raw) { timeline.push(e); }
                }
            }
            BlockStep::Closed(Some(e)) => timeline.push(e),
            BlockStep::Opened | BlockStep::Field | BlockStep::Closed(None) => {}
        }
        previous = Some(line);
    }
    acc.finish();
    log::debug!("scan complete: {} decoded lines, {} events", decoded_lines, timeline.len());
    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventData, FrameType};

    fn task(line: u64, d: &str) -> Event { Event::new(line, "t", EventData::RenderTask { description: d.to_string() }) }

    #[test]
    fn sort_is_stable_for_equal_lines() {
        let mut t = Timeline::new();
        t.push(task(9, "late"));
        t.push(task(7, "A"));
        t.push(task(7, "B"));
        t.push(task(1, "first"));
        let sorted: Vec<String> = t.sorted_by_line().iter().map(|e| e.describe()).collect();
        assert_eq!(sorted, vec!["first", "A", "B", "late"]);
        assert_eq!(t.events[0].line, 9);
    }

    #[test]
    fn scan_mixes_blocks_and_extractors_in_order() {
        let log = "\
3 | 10:00:01 | renderSize={100, 50}
4 | 10:00:02 | open
Action:{
text_style_guid:G-1
feature_name:bubble
renderSize={0, 0}
}
garbage line
6 | 10:00:03 | expandFrameWithSize: size={NaN, 12}
";
        let t = scan_log(log);
        let kinds: Vec<EventKind> = t.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EventKind::RenderSize, EventKind::TextStyle, EventKind::FrameChange]);
        assert_eq!(t.events[1].line, 4);
        match &t.events[2].data {
            EventData::FrameChange { frame_type, width, height } => { assert_eq!(*frame_type, FrameType::Expand); assert!(width.is_nan()); assert_eq!(*height, 12.0); }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn counts_include_every_kind() {
        let t = scan_log("1 | t | render task\n2 | t | Executing new render task");
        let counts = t.counts_by_kind();
        assert_eq!(counts.len(), EventKind::ALL.len());
        assert!(counts.contains(&(EventKind::RenderTask, 2)));
        assert!(counts.contains(&(EventKind::FrameChange, 0)));
    }

    #[test]
    fn placeholder_values_do_not_look_like_a_crash() {
        let t = scan_log("1 | t | expandFrameWithSize: size={width, height}\n2 | t | letterSpacing=auto new letterSpacing=none changed=1\n");
        assert!(t.is_empty());
        let a = crate::diagnosis::analyze_crash(&t);
        assert_eq!(a.severity, crate::diagnosis::Severity::Normal);
        assert!(!a.has_crash);
    }

    #[test]
    fn handles_crlf_and_empty_input() {
        assert!(scan_log("").is_empty());
        let t = scan_log("1 | t | renderSize={1, 2}\r\n2 | t | renderSize={3, 4}\r\n");
        assert_eq!(t.len(), 2);
    }
}
