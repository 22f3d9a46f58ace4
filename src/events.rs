use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RawLine {
    pub line_number: u64,
    pub timestamp: String,
    pub content: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameType { Expand, Current, New }

impl FrameType {
    pub fn as_str(&self) -> &'static str {
        match self { FrameType::Expand => "expand", FrameType::Current => "current", FrameType::New => "new" }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpacingChange {
    pub current_value: f64,
    pub new_value: f64,
    pub changed: bool,
    pub delta: f64,
}

impl SpacingChange {
    pub fn new(current_value: f64, new_value: f64, changed: bool) -> Self {
        Self { current_value, new_value, changed, delta: new_value - current_value }
    }

    pub fn has_nan(&self) -> bool { self.current_value.is_nan() || self.new_value.is_nan() }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventData {
    TextStyle { guid: String, operation: String, feature_name: String, text_category: String },
    FrameChange { frame_type: FrameType, width: f64, height: f64 },
    RenderSize { width: f64, height: f64, ratio: f64 },
    LetterSpacing(SpacingChange),
    LineSpacing(SpacingChange),
    SpacingDegreeChange { letter_spacing_value: Option<f64>, line_spacing_value: Option<f64>, mode: Option<i64> },
    RenderTask { description: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind { TextStyle, FrameChange, RenderSize, LetterSpacing, LineSpacing, SpacingDegreeChange, RenderTask }

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::TextStyle,
        EventKind::FrameChange,
        EventKind::RenderSize,
        EventKind::LetterSpacing,
        EventKind::LineSpacing,
        EventKind::SpacingDegreeChange,
        EventKind::RenderTask,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TextStyle => "text_style",
            EventKind::FrameChange => "frame_change",
            EventKind::RenderSize => "render_size",
            EventKind::LetterSpacing => "letter_spacing",
            EventKind::LineSpacing => "line_spacing",
            EventKind::SpacingDegreeChange => "spacing_degree_change",
            EventKind::RenderTask => "render_task",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventKind::TextStyle => "Text Style GUIDs",
            EventKind::FrameChange => "Frame Changes",
            EventKind::RenderSize => "Render Sizes",
            EventKind::LetterSpacing => "Letter Spacing",
            EventKind::LineSpacing => "Line Spacing",
            EventKind::SpacingDegreeChange => "Spacing Degree Changes",
            EventKind::RenderTask => "Render Tasks",
        }
    }

    pub fn is_spacing(&self) -> bool {
        matches!(self, EventKind::LetterSpacing | EventKind::LineSpacing | EventKind::SpacingDegreeChange)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Event {
    pub line: u64,
    pub timestamp: String,
    #[serde(flatten)]
    pub data: EventData,
}

impl Event {
    pub fn new(line: u64, timestamp: &str, data: EventData) -> Self {
        Self { line, timestamp: timestamp.to_string(), data }
    }

    pub fn kind(&self) -> EventKind {
        match &self.data {
            EventData::TextStyle { .. } => EventKind::TextStyle,
            EventData::FrameChange { .. } => EventKind::FrameChange,
            EventData::RenderSize { .. } => EventKind::RenderSize,
            EventData::LetterSpacing(_) => EventKind::LetterSpacing,
            EventData::LineSpacing(_) => EventKind::LineSpacing,
            EventData::SpacingDegreeChange { .. } => EventKind::SpacingDegreeChange,
            EventData::RenderTask { .. } => EventKind::RenderTask,
        }
    }

    pub fn dimensions(&self) -> Option<(f64, f64)> {
        match &self.data {
            EventData::FrameChange { width, height, .. } | EventData::RenderSize { width, height, .. } => Some((*width, *height)),
            _ => None,
        }
    }

    pub fn has_nan_dimension(&self) -> bool {
        self.dimensions().is_some_and(|(w, h)| w.is_nan() || h.is_nan())
    }

    pub fn has_zero_dimension(&self) -> bool {
        self.dimensions().is_some_and(|(w, h)| w == 0.0 || h == 0.0)
    }

    pub fn spacing(&self) -> Option<&SpacingChange> {
        match &self.data {
            EventData::LetterSpacing(s) | EventData::LineSpacing(s) => Some(s),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match &self.data {
            EventData::TextStyle { guid, operation, feature_name, text_category } => {
                format!("guid={} operation={} feature={} category={}", guid, or_na(operation), or_na(feature_name), or_na(text_category))
            }
            EventData::FrameChange { frame_type, width, height } => format!("{} {}x{}", frame_type.as_str(), width, height),
            EventData::RenderSize { width, height, ratio } => format!("{}x{} ratio={}", width, height, ratio),
            EventData::LetterSpacing(s) | EventData::LineSpacing(s) => {
                format!("{} -> {} (delta {}, changed={})", s.current_value, s.new_value, s.delta, s.changed)
            }
            EventData::SpacingDegreeChange { letter_spacing_value, line_spacing_value, mode } => {
                let l = letter_spacing_value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
                let ls = line_spacing_value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
                let m = mode.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
                format!("letter={} line={} mode={}", l, ls, m)
            }
            EventData::RenderTask { description } => description.clone(),
        }
    }
}

fn or_na(s: &str) -> &str { if s.is_empty() { "N/A" } else { s } }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacing_delta_is_new_minus_current() {
        let s = SpacingChange::new(2.0, 14.5, true);
        assert_eq!(s.delta, 12.5);
        assert!(!s.has_nan());
        assert!(SpacingChange::new(f64::NAN, 1.0, false).delta.is_nan());
    }

    #[test]
    fn render_size_serializes_with_kind_tag() {
        let e = Event::new(3, "12:00:01", EventData::RenderSize { width: 10.0, height: 5.0, ratio: 2.0 });
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["kind"], "render_size");
        assert_eq!(v["line"], 3);
        assert_eq!(v["ratio"], 2.0);
    }

    #[test]
    fn zero_and_nan_dimension_checks() {
        let nan = Event::new(1, "t", EventData::FrameChange { frame_type: FrameType::New, width: f64::NAN, height: 4.0 });
        let zero = Event::new(2, "t", EventData::RenderSize { width: 0.0, height: 4.0, ratio: 0.0 });
        let task = Event::new(3, "t", EventData::RenderTask { description: "Render task event".to_string() });
        assert!(nan.has_nan_dimension() && !nan.has_zero_dimension());
        assert!(zero.has_zero_dimension() && !zero.has_nan_dimension());
        assert!(!task.has_nan_dimension() && !task.has_zero_dimension());
    }
}
