use serde::Serialize;
use crate::diagnosis::{CrashAnalysis, Severity};
use crate::events::{EventData, EventKind};
use crate::timeline::Timeline;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority { High, Medium, Low }

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self { Priority::High => "HIGH", Priority::Medium => "MEDIUM", Priority::Low => "LOW" }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub title: &'static str,
    pub description: &'static str,
    pub sample_fix: &'static str,
}

const fn rec(priority: Priority, title: &'static str, description: &'static str, sample_fix: &'static str) -> Recommendation {
    Recommendation { priority, title, description, sample_fix }
}

pub const NAN_GUARD: Recommendation = rec(
    Priority::High,
    "Immediate Fix Required",
    "Add NaN validation before all frame calculations in expandFrameWithSize method",
    "if (isnan(width) || isnan(height)) { /* fallback logic */ }",
);
pub const ZERO_RENDER: Recommendation = rec(
    Priority::High,
    "Prevent Zero Render Sizes",
    "Add validation to prevent zero render dimensions that trigger NaN calculations",
    "if (renderSize.width <= 0 || renderSize.height <= 0) { /* use minimum viable size */ }",
);
pub const LETTER_SPACING_NAN: Recommendation = rec(
    Priority::High,
    "Fix Letter Spacing NaN",
    "Letter spacing values are NaN before or after a change; reject non-finite spacing before it reaches layout",
    "if (!isfinite(newLetterSpacing)) { newLetterSpacing = currentLetterSpacing; }",
);
pub const LINE_SPACING_NAN: Recommendation = rec(
    Priority::High,
    "Fix Line Spacing NaN",
    "Line spacing values are NaN before or after a change; reject non-finite spacing before it reaches layout",
    "if (!isfinite(newLineSpacing)) { newLineSpacing = currentLineSpacing; }",
);
pub const SPACING_BOUNDS: Recommendation = rec(
    Priority::Medium,
    "Bound Spacing Changes",
    "Spacing changed by more than 10 points in a single step; clamp spacing adjustments to a sane range",
    "newSpacing = MAX(minSpacing, MIN(maxSpacing, newSpacing));",
);
pub const TEXT_STYLE: Recommendation = rec(
    Priority::Medium,
    "Text Style Validation",
    "Validate text style parameters before applying them to prevent invalid frame calculations",
    "validateTextStyleBeforeApply(textStyle);",
);
pub const DEFENSIVE_BASELINE: Recommendation = rec(
    Priority::Medium,
    "Add Defensive Programming",
    "Implement bounds checking and fallback values for all frame calculations",
    "const safeWidth = Math.max(minWidth, Math.min(maxWidth, calculatedWidth));",
);

const SPACING_DELTA_LIMIT: f64 = 10.0;

/// Rules are evaluated in a fixed order and fire independently; the defensive
/// baseline is always last.
pub fn generate_recommendations(analysis: &CrashAnalysis, t: &Timeline) -> Vec<Recommendation> {
    let mut out = vec![];
    if analysis.severity == Severity::Critical { out.push(NAN_GUARD); }
    if t.of_kind(EventKind::RenderSize).any(|e| e.has_zero_dimension()) { out.push(ZERO_RENDER); }
    if t.iter().any(|e| matches!(&e.data, EventData::LetterSpacing(s) if s.has_nan())) { out.push(LETTER_SPACING_NAN); }
    if t.iter().any(|e| matches!(&e.data, EventData::LineSpacing(s) if s.has_nan())) { out.push(LINE_SPACING_NAN); }
    if t.iter().filter_map(|e| e.spacing()).any(|s| s.changed && s.delta.abs() > SPACING_DELTA_LIMIT) { out.push(SPACING_BOUNDS); }
    if t.of_kind(EventKind::TextStyle).next().is_some() { out.push(TEXT_STYLE); }
    out.push(DEFENSIVE_BASELINE);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::analyze_crash;
    use crate::events::{Event, FrameType, SpacingChange};

    fn tl(events: Vec<Event>) -> Timeline { Timeline { events } }
    fn titles(r: &[Recommendation]) -> Vec<&'static str> { r.iter().map(|x| x.title).collect() }

    #[test]
    fn baseline_always_present() {
        let t = Timeline::new();
        let r = generate_recommendations(&analyze_crash(&t), &t);
        assert_eq!(r, vec![DEFENSIVE_BASELINE]);
    }

    #[test]
    fn nan_guard_comes_first_when_critical() {
        let t = tl(vec![
            Event::new(1, "t", EventData::RenderSize { width: 0.0, height: 0.0, ratio: f64::NAN }),
            Event::new(2, "t", EventData::FrameChange { frame_type: FrameType::New, width: f64::NAN, height: 3.0 }),
            Event::new(3, "t", EventData::TextStyle { guid: "g".into(), operation: String::new(), feature_name: String::new(), text_category: String::new() }),
        ]);
        let r = generate_recommendations(&analyze_crash(&t), &t);
        assert_eq!(titles(&r), vec![NAN_GUARD.title, ZERO_RENDER.title, TEXT_STYLE.title, DEFENSIVE_BASELINE.title]);
        assert_eq!(r[0].priority, Priority::High);
    }

    #[test]
    fn spacing_rules() {
        let t = tl(vec![
            Event::new(1, "t", EventData::LetterSpacing(SpacingChange::new(f64::NAN, 1.0, false))),
            Event::new(2, "t", EventData::LineSpacing(SpacingChange::new(1.0, 20.0, true))),
            Event::new(3, "t", EventData::LineSpacing(SpacingChange::new(1.0, 2.0, false))),
        ]);
        let r = generate_recommendations(&analyze_crash(&t), &t);
        assert_eq!(titles(&r), vec![LETTER_SPACING_NAN.title, SPACING_BOUNDS.title, DEFENSIVE_BASELINE.title]);
    }

    #[test]
    fn large_delta_without_changed_flag_is_ignored() {
        let t = tl(vec![Event::new(1, "t", EventData::LetterSpacing(SpacingChange::new(0.0, 50.0, false)))]);
        let r = generate_recommendations(&analyze_crash(&t), &t);
        assert_eq!(r.len(), 1);
        assert_eq!(Priority::Medium.as_str(), "MEDIUM");
    }
}
