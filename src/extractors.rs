use std::sync::OnceLock;
use regex::{Captures, Regex};
use crate::events::{Event, EventData, FrameType, RawLine, SpacingChange};

// Digits/dot/minus runs, or an IEEE spelling (`NaN`, `inf`, `infinity`).
const NUM: &str = r"((?i:[+-]?(?:nan|inf(?:inity)?))\b|[0-9.\-]+)";

struct Patterns {
    frame_expand: Regex,
    frame_current: Regex,
    frame_new: Regex,
    render_size: Regex,
    letter_spacing: Regex,
    line_spacing: Regex,
    changed: Regex,
    degree_letter: Regex,
    degree_line: Regex,
    degree_mode: Regex,
}

fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| {
        let re = |s: String| Regex::new(&s).expect("static extractor pattern");
        Patterns {
            frame_expand: re(format!(r"size=\{{\s*{NUM}\s*,\s*{NUM}\s*\}}")),
            frame_current: re(format!(r"current frameSize=\{{\s*{NUM}\s*,\s*{NUM}\s*\}}")),
            frame_new: re(format!(r"newFrame=\{{\{{[^}}]*\}},\s*\{{\s*{NUM}\s*,\s*{NUM}\s*\}}\}}")),
            render_size: re(format!(r"renderSize=\{{\s*{NUM}\s*,\s*{NUM}\s*\}}")),
            letter_spacing: re(format!(r"(new\s+)?letterSpacing={NUM}")),
            line_spacing: re(format!(r"(new\s+)?lineSpacing={NUM}")),
            changed: re(r"\bchanged=([01])\b".to_string()),
            degree_letter: re(format!(r"letterSpacingValue={NUM}")),
            degree_line: re(format!(r"lineSpacingValue={NUM}")),
            degree_mode: re(r"\bmode=(-?\d+)".to_string()),
        }
    })
}

// unparsable text is NaN, never an error
pub fn parse_number(token: &str) -> f64 { token.parse::<f64>().unwrap_or(f64::NAN) }

fn pair(caps: &Captures) -> Option<(f64, f64)> {
    Some((parse_number(caps.get(1)?.as_str()), parse_number(caps.get(2)?.as_str())))
}

fn capture_number(re: &Regex, content: &str) -> Option<f64> {
    re.captures(content).and_then(|c| c.get(1)).map(|m| parse_number(m.as_str()))
}

pub fn extract_frame_changes(raw: &RawLine) -> Vec<Event> {
    let c = &raw.content;
    if !(c.contains("expandFrameWithSize:") || c.contains("expandFrameSize:")) { return vec![]; }
    let p = patterns();
    let mut out = vec![];
    for (re, frame_type) in [(&p.frame_expand, FrameType::Expand), (&p.frame_current, FrameType::Current), (&p.frame_new, FrameType::New)] {
        if let Some((width, height)) = re.captures(c).as_ref().and_then(pair) {
            out.push(Event::new(raw.line_number, &raw.timestamp, EventData::FrameChange { frame_type, width, height }));
        }
    }
    out
}

pub fn extract_render_size(raw: &RawLine) -> Option<Event> {
    if !raw.content.contains("renderSize=") { return None; }
    let (width, height) = patterns().render_size.captures(&raw.content).as_ref().and_then(pair)?;
    Some(Event::new(raw.line_number, &raw.timestamp, EventData::RenderSize { width, height, ratio: width / height }))
}

fn extract_spacing(raw: &RawLine, name: &str, re: &Regex) -> Option<SpacingChange> {
    let c = &raw.content;
    if !(c.contains(&format!("{}=", name)) && c.contains(&format!("new {}=", name))) { return None; }
    let mut current = None;
    let mut new = None;
    for caps in re.captures_iter(c) {
        let value = caps.get(2).map(|m| parse_number(m.as_str()));
        if caps.get(1).is_some() { new = new.or(value); } else { current = current.or(value); }
    }
    let changed = patterns().changed.captures(c).and_then(|m| m.get(1)).is_some_and(|m| m.as_str() == "1");
    Some(SpacingChange::new(current?, new?, changed))
}

pub fn extract_letter_spacing(raw: &RawLine) -> Option<Event> {
    let s = extract_spacing(raw, "letterSpacing", &patterns().letter_spacing)?;
    Some(Event::new(raw.line_number, &raw.timestamp, EventData::LetterSpacing(s)))
}

pub fn extract_line_spacing(raw: &RawLine) -> Option<Event> {
    let s = extract_spacing(raw, "lineSpacing", &patterns().line_spacing)?;
    Some(Event::new(raw.line_number, &raw.timestamp, EventData::LineSpacing(s)))
}

pub fn extract_spacing_degree_change(raw: &RawLine) -> Option<Event> {
    let c = &raw.content;
    if !(c.contains("degreeValueChangedByLetterSpacing:") && c.contains("letterSpacingValue=")) { return None; }
    let p = patterns();
    let letter_spacing_value = capture_number(&p.degree_letter, c);
    let line_spacing_value = capture_number(&p.degree_line, c);
    if letter_spacing_value.is_none() && line_spacing_value.is_none() { return None; }
    let mode = p.degree_mode.captures(c).and_then(|m| m.get(1)).and_then(|m| m.as_str().parse::<i64>().ok());
    Some(Event::new(raw.line_number, &raw.timestamp, EventData::SpacingDegreeChange { letter_spacing_value, line_spacing_value, mode }))
}

pub fn extract_render_task(raw: &RawLine) -> Option<Event> {
    if !raw.content.contains("render task") { return None; }
    let description = if raw.content.contains("Executing new render task") { "New render task started" } else { "Render task event" };
    Some(Event::new(raw.line_number, &raw.timestamp, EventData::RenderTask { description: description.to_string() }))
}

pub fn extract_all(raw: &RawLine) -> Vec<Event> {
    let mut out = extract_frame_changes(raw);
    out.extend(extract_render_size(raw));
    out.extend(extract_letter_spacing(raw));
    out.extend(extract_line_spacing(raw));
    out.extend(extract_spacing_degree_change(raw));
    out.extend(extract_render_task(raw));
    if !out.is_empty() { log::trace!("line {}: {} event(s) extracted", raw.line_number, out.len()); }
    out
}
