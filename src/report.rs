use std::io::Write;
use std::sync::OnceLock;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use crate::diagnosis::{analyze_crash, assess_severity, CrashAnalysis, Severity};
use crate::events::{Event, EventKind};
use crate::parsers::ParserInfo;
use crate::recommendations::{generate_recommendations, Priority, Recommendation};
use crate::stats::{compute_statistics, frame_progression, Statistics};
use crate::timeline::Timeline;

static ENABLE_COLOR: OnceLock<bool> = OnceLock::new();

pub fn set_color_enabled(on: bool) { let _ = ENABLE_COLOR.set(on); }

fn paint(s: &str, code: &str) -> String {
    if *ENABLE_COLOR.get().unwrap_or(&false) { format!("\x1b[{}m{}\x1b[0m", code, s) } else { s.to_string() }
}

fn sev_code(s: Severity) -> &'static str { match s { Severity::Critical => "1;31", Severity::Warning => "33", Severity::Normal => "32" } }

fn priority_code(p: Priority) -> &'static str { match p { Priority::High => "1;31", Priority::Medium => "33", Priority::Low => "32" } }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimelineOrder { Scan, Line }

#[derive(Clone, Debug)]
pub struct DisplayOptions {
    pub emoji: bool,
    pub table: bool,
    pub order: TimelineOrder,
    pub timeline_limit: usize,
    pub summary_only: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self { Self { emoji: false, table: false, order: TimelineOrder::Line, timeline_limit: 15, summary_only: false } }
}

#[derive(Clone, Debug, Serialize)]
pub struct CrashReport {
    pub source: Option<String>,
    pub parser: ParserInfo,
    pub counts: Vec<(EventKind, usize)>,
    pub severity: Severity,
    pub analysis: CrashAnalysis,
    pub recommendations: Vec<Recommendation>,
    pub statistics: Statistics,
    pub timeline: Timeline,
}

impl CrashReport {
    pub fn build(parser: ParserInfo, timeline: Timeline) -> Self {
        let analysis = analyze_crash(&timeline);
        let recommendations = generate_recommendations(&analysis, &timeline);
        Self {
            source: None,
            parser,
            counts: timeline.counts_by_kind(),
            severity: assess_severity(&timeline),
            analysis,
            recommendations,
            statistics: compute_statistics(&timeline),
            timeline,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self { self.source = Some(source.to_string()); self }

    pub fn count(&self, kind: EventKind) -> usize {
        self.counts.iter().find(|(k, _)| *k == kind).map(|(_, c)| *c).unwrap_or(0)
    }

    pub fn timeline_view(&self, order: TimelineOrder, limit: usize) -> Vec<&Event> {
        let all: Vec<&Event> = match order { TimelineOrder::Scan => self.timeline.iter().collect(), TimelineOrder::Line => self.timeline.sorted_by_line() };
        let skip = all.len().saturating_sub(limit);
        all.into_iter().skip(skip).collect()
    }
}

fn dim(v: f64) -> String { if v.is_nan() { "NaN".to_string() } else { format!("{:.1}", v) } }

fn heading(out: &mut dyn Write, title: &str) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", paint(title, "1;36"))
}

pub fn write_header(rep: &CrashReport, out: &mut dyn Write, _opts: &DisplayOptions) -> std::io::Result<()> {
    if let Some(src) = rep.source.as_ref() { writeln!(out, "{}", paint(&format!("Log: {}", src), "1"))?; }
    writeln!(out, "{}", paint(&format!("Parser: {} v{} ({})", rep.parser.name, rep.parser.version, rep.parser.id), "1;36"))?;
    writeln!(out, "Target: {}", rep.parser.target_crash_event)
}

pub fn write_summary(rep: &CrashReport, out: &mut dyn Write, _opts: &DisplayOptions, kinds: &[EventKind]) -> std::io::Result<()> {
    heading(out, "Summary:")?;
    for k in kinds { writeln!(out, "• {}: {}", k.label(), rep.count(*k))?; }
    writeln!(out, "• Crash Severity: {}", paint(&rep.severity.as_str().to_uppercase(), sev_code(rep.severity)))
}

pub fn write_crash_analysis(rep: &CrashReport, out: &mut dyn Write, opts: &DisplayOptions) -> std::io::Result<()> {
    let a = &rep.analysis;
    let mark = if opts.emoji { "🚨 " } else { "" };
    heading(out, &format!("{}CRASH ANALYSIS - {} SEVERITY", mark, a.severity.as_str().to_uppercase()))?;
    if let Some(c) = a.primary_cause.as_ref() { writeln!(out, "Primary Cause: {}", paint(c, "1;31"))?; }
    if !a.trigger_events.is_empty() {
        writeln!(out, "Trigger Events:")?;
        for t in &a.trigger_events { writeln!(out, "- {}", t)?; }
    }
    if !a.cascade.is_empty() {
        writeln!(out, "Crash Cascade Pattern:")?;
        for phase in &a.cascade {
            writeln!(out, "  {}:", phase.phase)?;
            for e in &phase.events { writeln!(out, "    - {}", e)?; }
        }
    }
    Ok(())
}

pub fn write_guids(rep: &CrashReport, out: &mut dyn Write, _opts: &DisplayOptions) -> std::io::Result<()> {
    heading(out, "Text Style GUID Analysis:")?;
    if rep.statistics.guids.is_empty() { return writeln!(out, "{}", paint("No text style GUIDs found in the log.", "2")); }
    for g in &rep.statistics.guids {
        let na = |s: &str| if s.is_empty() { "N/A".to_string() } else { s.to_string() };
        writeln!(out, "• {}: {} times (Category: {} | Operation: {})", g.guid, g.count, na(&g.text_category), na(&g.operation))?;
    }
    Ok(())
}

pub fn write_frames(rep: &CrashReport, out: &mut dyn Write, _opts: &DisplayOptions) -> std::io::Result<()> {
    let f = &rep.statistics.frames;
    heading(out, "Frame Size Evolution:")?;
    if rep.statistics.total_frame_changes == 0 { return writeln!(out, "{}", paint("No expandFrameWithSize events found in this log.", "2")); }
    if !f.nan_frames.is_empty() {
        writeln!(out, "{}", paint("CRITICAL: NaN Frame Values Detected", "1;31"))?;
        for (i, n) in f.nan_frames.iter().enumerate() {
            let ctx = |o: Option<(f64, f64)>| o.map(|(w, h)| format!("{}x{}", dim(w), dim(h))).unwrap_or_else(|| "N/A".to_string());
            writeln!(out, "  NaN Event #{}: line {}: {} x {} ({}) | previous: {} | next: {}", i + 1, n.frame.line, dim(n.frame.width), dim(n.frame.height), n.frame.frame_type.as_str(), ctx(n.previous), ctx(n.next))?;
        }
    }
    if !f.zero_frames.is_empty() {
        writeln!(out, "{}", paint("Zero-Dimension Issues", "33"))?;
        let frame_lines: Vec<u64> = rep.timeline.of_kind(EventKind::FrameChange).map(|e| e.line).collect();
        for z in f.zero_frames.iter().take(5) {
            // progression is positional: use the first frame logged on this line
            let progression = frame_lines.iter().position(|l| *l == z.line)
                .and_then(|i| frame_progression(&rep.timeline, i))
                .map(|p| p.iter().map(|(w, h)| format!("{:.0}x{:.0}", w, h)).collect::<Vec<_>>().join(" -> "))
                .unwrap_or_else(|| "Insufficient data".to_string());
            writeln!(out, "  line {}: {} x {} ({}) | progression: {}", z.line, dim(z.width), dim(z.height), z.frame_type.as_str(), progression)?;
        }
        if f.zero_frames.len() > 5 { writeln!(out, "  ... and {} more zero-dimension events", f.zero_frames.len() - 5)?; }
    }
    if !f.negative_frames.is_empty() {
        writeln!(out, "{}", paint("Negative Frame Dimensions", "33"))?;
        for n in &f.negative_frames { writeln!(out, "  line {}: {} x {} ({})", n.line, dim(n.width), dim(n.height), n.frame_type.as_str())?; }
    }
    if !f.extreme_frames.is_empty() {
        writeln!(out, "{}", paint("Extreme Frame Sizes", "33"))?;
        for n in &f.extreme_frames { writeln!(out, "  line {}: {} x {} ({})", n.line, dim(n.width), dim(n.height), n.frame_type.as_str())?; }
    }
    Ok(())
}

pub fn write_renders(rep: &CrashReport, out: &mut dyn Write, _opts: &DisplayOptions) -> std::io::Result<()> {
    let r = &rep.statistics.renders;
    heading(out, "Render Size Diagnostics:")?;
    if rep.statistics.total_render_sizes == 0 { return writeln!(out, "{}", paint("No render size data found in this log.", "2")); }
    writeln!(out, "• Zero render dimensions: {}", r.zero_renders)?;
    writeln!(out, "• NaN ratios: {}", r.nan_ratios)?;
    writeln!(out, "• Extreme aspect ratios: {}", r.extreme_ratios)
}

pub fn write_statistics(rep: &CrashReport, out: &mut dyn Write, _opts: &DisplayOptions) -> std::io::Result<()> {
    let s = &rep.statistics;
    heading(out, "Statistical Summary:")?;
    writeln!(out, "• Frame Events: {}", s.total_frame_changes)?;
    writeln!(out, "• NaN Incidents: {}", paint(&s.nan_count.to_string(), if s.nan_count > 0 { "1;31" } else { "32" }))?;
    writeln!(out, "• Zero Dimensions: {}", paint(&s.zero_count.to_string(), if s.zero_count > 0 { "33" } else { "32" }))?;
    writeln!(out, "• Render Events: {}", s.total_render_sizes)?;
    if let Some((w, h)) = s.average_frame_size { writeln!(out, "• Average Frame Size: {:.1} x {:.1}", w, h)?; }
    if let Some(r) = s.frame_range.as_ref() { writeln!(out, "• Frame Size Range: {:.1}-{:.1} x {:.1}-{:.1}", r.min_width, r.max_width, r.min_height, r.max_height)?; }
    Ok(())
}

fn event_code(e: &Event) -> &'static str {
    if e.has_nan_dimension() { "1;31" } else if e.has_zero_dimension() { "33" } else { "0" }
}

pub fn write_timeline(rep: &CrashReport, out: &mut dyn Write, opts: &DisplayOptions) -> std::io::Result<()> {
    let view = rep.timeline_view(opts.order, opts.timeline_limit);
    heading(out, &format!("Timeline (last {} of {}):", view.len(), rep.timeline.len()))?;
    if view.is_empty() { return writeln!(out, "{}", paint("No events found.", "2")); }
    if opts.table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Line", "Time", "Kind", "Details"]);
        for e in &view { table.add_row(vec![e.line.to_string(), e.timestamp.clone(), e.kind().as_str().to_string(), e.describe()]); }
        return writeln!(out, "{}", table);
    }
    for e in &view {
        let line = format!("{:>6}  {:<24} {:<22} {}", e.line, e.timestamp, e.kind().as_str(), e.describe());
        writeln!(out, "{}", paint(&line, event_code(e)))?;
    }
    Ok(())
}

pub fn write_recommendations(rep: &CrashReport, out: &mut dyn Write, _opts: &DisplayOptions) -> std::io::Result<()> {
    heading(out, "Recommendations:")?;
    for r in &rep.recommendations {
        writeln!(out, "{}", paint(&format!("{} PRIORITY: {}", r.priority.as_str(), r.title), priority_code(r.priority)))?;
        writeln!(out, "  {}", r.description)?;
        writeln!(out, "  {}", paint(r.sample_fix, "2"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{CrashParser, ExpandFrameParser};

    const LOG: &str = "\
1 | 10:00:00 | expandFrameWithSize: size={10, 10}
2 | 10:00:01 | expandFrameWithSize: size={20, 20}
3 | 10:00:02 | expandFrameWithSize: size={0, 30} current frameSize={5, 5}
4 | 10:00:03 | renderSize={12, 4}
";

    fn render(rep: &CrashReport, opts: &DisplayOptions) -> String {
        let mut buf: Vec<u8> = vec![];
        ExpandFrameParser::default().display_results(rep, &mut buf, opts).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn report_counts_and_view() {
        let rep = ExpandFrameParser::default().analyze(LOG).with_source("a.log");
        assert_eq!(rep.count(EventKind::FrameChange), 4);
        assert_eq!(rep.count(EventKind::RenderSize), 1);
        assert_eq!(rep.severity, Severity::Normal);
        let view = rep.timeline_view(TimelineOrder::Scan, 2);
        assert_eq!(view.iter().map(|e| e.line).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn text_report_has_progression_and_no_crash_section() {
        let rep = ExpandFrameParser::default().analyze(LOG).with_source("a.log");
        let s = render(&rep, &DisplayOptions::default());
        assert!(s.contains("Log: a.log"));
        assert!(!s.contains("CRASH ANALYSIS"));
        assert!(s.contains("progression: 10x10 -> 20x20 -> 0x30"));
        assert!(s.contains("Average Frame Size: 11.7 x 11.7"));
        assert!(s.contains("MEDIUM PRIORITY: Add Defensive Programming"));
    }

    #[test]
    fn summary_only_stops_after_counts() {
        let rep = ExpandFrameParser::default().analyze(LOG);
        let s = render(&rep, &DisplayOptions { summary_only: true, ..Default::default() });
        assert!(s.contains("Frame Changes: 4"));
        assert!(!s.contains("Recommendations:"));
    }

    #[test]
    fn table_timeline_renders() {
        let rep = ExpandFrameParser::default().analyze(LOG);
        let s = render(&rep, &DisplayOptions { table: true, ..Default::default() });
        assert!(s.contains("frame_change"));
        assert!(s.contains("Details"));
    }
}
