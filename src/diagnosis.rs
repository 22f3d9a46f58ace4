use serde::Serialize;
use crate::events::{Event, EventKind};
use crate::timeline::Timeline;

pub const NAN_PRIMARY_CAUSE: &str = "NaN values in frame calculations";
const CASCADE_DEPTH: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity { Normal, Warning, Critical }

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self { Severity::Normal => "normal", Severity::Warning => "warning", Severity::Critical => "critical" }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CascadePhase {
    pub phase: String,
    pub events: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CrashAnalysis {
    pub has_crash: bool,
    pub severity: Severity,
    pub primary_cause: Option<String>,
    pub trigger_events: Vec<String>,
    pub cascade: Vec<CascadePhase>,
}

fn nan_frames(t: &Timeline) -> impl Iterator<Item = &Event> {
    t.of_kind(EventKind::FrameChange).filter(|e| e.has_nan_dimension())
}

fn zero_renders(t: &Timeline) -> impl Iterator<Item = &Event> {
    t.of_kind(EventKind::RenderSize).filter(|e| e.has_zero_dimension())
}

pub fn assess_severity(t: &Timeline) -> Severity {
    if nan_frames(t).next().is_some() { return Severity::Critical; }
    let zero_frame_count = t.of_kind(EventKind::FrameChange).filter(|e| e.has_zero_dimension()).count();
    if zero_renders(t).count() > 2 || zero_frame_count > 2 { return Severity::Warning; }
    Severity::Normal
}

/// Two sequential checks. The zero-render step only raises a still-normal
/// severity; it never touches a critical one.
pub fn analyze_crash(t: &Timeline) -> CrashAnalysis {
    let mut analysis = CrashAnalysis { has_crash: false, severity: Severity::Normal, primary_cause: None, trigger_events: vec![], cascade: vec![] };
    let nan: Vec<&Event> = nan_frames(t).collect();
    if !nan.is_empty() {
        analysis.has_crash = true;
        analysis.severity = Severity::Critical;
        analysis.primary_cause = Some(NAN_PRIMARY_CAUSE.to_string());
        analysis.trigger_events.push(format!("{} NaN frame events detected", nan.len()));
    }
    let zero = zero_renders(t).count();
    if zero > 0 {
        analysis.trigger_events.push(format!("{} zero render size events", zero));
        if analysis.severity == Severity::Normal { analysis.severity = Severity::Warning; }
    }
    if analysis.has_crash && let Some(first) = nan.first() {
        analysis.cascade = trace_cascade(t, first);
    }
    log::debug!("crash analysis: severity={} triggers={}", analysis.severity, analysis.trigger_events.len());
    analysis
}

fn cascade_entry(e: &Event) -> String {
    let label = match &e.data {
        crate::events::EventData::FrameChange { frame_type, .. } => frame_type.as_str(),
        _ => "render",
    };
    let (w, h) = e.dimensions().unwrap_or((f64::NAN, f64::NAN));
    format!("Line {}: {} {}x{}", e.line, label, w, h)
}

fn last_before(t: &Timeline, kind: EventKind, line: u64) -> Vec<&Event> {
    let before: Vec<&Event> = t.of_kind(kind).filter(|e| e.line < line).collect();
    let skip = before.len().saturating_sub(CASCADE_DEPTH);
    before.into_iter().skip(skip).collect()
}

/// Pre-crash context for the first NaN frame: the three latest render sizes and
/// the three latest frame changes before its line, merged by line.
pub fn trace_cascade(t: &Timeline, crash: &Event) -> Vec<CascadePhase> {
    let mut pre = last_before(t, EventKind::RenderSize, crash.line);
    pre.extend(last_before(t, EventKind::FrameChange, crash.line));
    pre.sort_by_key(|e| e.line);
    vec![
        CascadePhase { phase: "Pre-crash Events".to_string(), events: pre.into_iter().map(cascade_entry).collect() },
        CascadePhase { phase: "Crash Event".to_string(), events: vec![format!("Line {}: NaN frame values detected", crash.line)] },
    ]
}
