use serde::Serialize;
use crate::events::{Event, EventData, EventKind, FrameType};
use crate::timeline::Timeline;

const EXTREME_FRAME: f64 = 10000.0;
const EXTREME_RATIO_HIGH: f64 = 100.0;
const EXTREME_RATIO_LOW: f64 = 0.01;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GuidSummary {
    pub guid: String,
    pub count: usize,
    pub text_category: String,
    pub operation: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameRef {
    pub line: u64,
    pub timestamp: String,
    pub frame_type: FrameType,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NanFrameDetail {
    pub frame: FrameRef,
    pub previous: Option<(f64, f64)>,
    pub next: Option<(f64, f64)>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameRange { pub min_width: f64, pub max_width: f64, pub min_height: f64, pub max_height: f64 }

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameAnomalies {
    pub nan_frames: Vec<NanFrameDetail>,
    pub zero_frames: Vec<FrameRef>,
    pub negative_frames: Vec<FrameRef>,
    pub extreme_frames: Vec<FrameRef>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RenderDiagnostics {
    pub zero_renders: usize,
    pub nan_ratios: usize,
    pub extreme_ratios: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Statistics {
    pub total_frame_changes: usize,
    pub total_render_sizes: usize,
    pub nan_count: usize,
    pub zero_count: usize,
    pub average_frame_size: Option<(f64, f64)>,
    pub frame_range: Option<FrameRange>,
    pub guids: Vec<GuidSummary>,
    pub frames: FrameAnomalies,
    pub renders: RenderDiagnostics,
}

fn frame_ref(e: &Event) -> Option<FrameRef> {
    match &e.data {
        EventData::FrameChange { frame_type, width, height } => Some(FrameRef { line: e.line, timestamp: e.timestamp.clone(), frame_type: *frame_type, width: *width, height: *height }),
        _ => None,
    }
}

pub fn summarize_guids(t: &Timeline) -> Vec<GuidSummary> {
    let mut out: Vec<GuidSummary> = vec![];
    for e in t.iter() {
        if let EventData::TextStyle { guid, operation, text_category, .. } = &e.data {
            match out.iter_mut().find(|g| g.guid == *guid) {
                Some(g) => g.count += 1,
                None => out.push(GuidSummary { guid: guid.clone(), count: 1, text_category: text_category.clone(), operation: operation.clone() }),
            }
        }
    }
    out
}

pub fn frame_anomalies(t: &Timeline) -> FrameAnomalies {
    let frames: Vec<FrameRef> = t.of_kind(EventKind::FrameChange).filter_map(frame_ref).collect();
    let mut a = FrameAnomalies::default();
    for (i, f) in frames.iter().enumerate() {
        if f.width.is_nan() || f.height.is_nan() {
            let previous = i.checked_sub(1).map(|p| (frames[p].width, frames[p].height));
            let next = frames.get(i + 1).map(|n| (n.width, n.height));
            a.nan_frames.push(NanFrameDetail { frame: f.clone(), previous, next });
        }
        if f.width == 0.0 || f.height == 0.0 { a.zero_frames.push(f.clone()); }
        if f.width < 0.0 || f.height < 0.0 { a.negative_frames.push(f.clone()); }
        if f.width > EXTREME_FRAME || f.height > EXTREME_FRAME { a.extreme_frames.push(f.clone()); }
    }
    a
}

/// Up to three frames ending at `index`, or `None` when fewer than two precede it.
pub fn frame_progression(t: &Timeline, index: usize) -> Option<Vec<(f64, f64)>> {
    let frames: Vec<(f64, f64)> = t.of_kind(EventKind::FrameChange).filter_map(|e| e.dimensions()).collect();
    if index < 2 || index >= frames.len() { return None; }
    Some(frames[index - 2..=index].to_vec())
}

pub fn render_diagnostics(t: &Timeline) -> RenderDiagnostics {
    let mut d = RenderDiagnostics::default();
    for e in t.of_kind(EventKind::RenderSize) {
        if let EventData::RenderSize { width, height, ratio } = &e.data {
            if *width == 0.0 || *height == 0.0 { d.zero_renders += 1; }
            if ratio.is_nan() { d.nan_ratios += 1; }
            if *ratio > EXTREME_RATIO_HIGH || (*ratio < EXTREME_RATIO_LOW && *ratio > 0.0) { d.extreme_ratios += 1; }
        }
    }
    d
}

pub fn compute_statistics(t: &Timeline) -> Statistics {
    let frames: Vec<(f64, f64)> = t.of_kind(EventKind::FrameChange).filter_map(|e| e.dimensions()).collect();
    let valid: Vec<(f64, f64)> = frames.iter().copied().filter(|(w, h)| !w.is_nan() && !h.is_nan() && *w > 0.0 && *h > 0.0).collect();
    let (average_frame_size, frame_range) = if valid.is_empty() { (None, None) } else {
        let n = valid.len() as f64;
        let avg = (valid.iter().map(|v| v.0).sum::<f64>() / n, valid.iter().map(|v| v.1).sum::<f64>() / n);
        let range = FrameRange {
            min_width: valid.iter().map(|v| v.0).fold(f64::INFINITY, f64::min),
            max_width: valid.iter().map(|v| v.0).fold(f64::NEG_INFINITY, f64::max),
            min_height: valid.iter().map(|v| v.1).fold(f64::INFINITY, f64::min),
            max_height: valid.iter().map(|v| v.1).fold(f64::NEG_INFINITY, f64::max),
        };
        (Some(avg), Some(range))
    };
    Statistics {
        total_frame_changes: frames.len(),
        total_render_sizes: t.of_kind(EventKind::RenderSize).count(),
        nan_count: frames.iter().filter(|(w, h)| w.is_nan() || h.is_nan()).count(),
        zero_count: frames.iter().filter(|(w, h)| *w == 0.0 || *h == 0.0).count(),
        average_frame_size,
        frame_range,
        guids: summarize_guids(t),
        frames: frame_anomalies(t),
        renders: render_diagnostics(t),
    }
}
