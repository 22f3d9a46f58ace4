use std::io::Write;
use serde::Serialize;
use crate::events::EventKind;
use crate::report::{self, CrashReport, DisplayOptions};
use crate::timeline::{scan_log, Timeline};

/// Descriptive plug-in metadata. Never consulted by the algorithms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParserInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub target_crash_event: &'static str,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown parser '{0}' (available: {1})")]
    UnknownParser(String, String),
    #[error("parser id '{0}' is already registered")]
    DuplicateParser(String),
}

pub trait CrashParser {
    fn info(&self) -> &ParserInfo;

    fn parse(&self, text: &str) -> Timeline;

    fn display_results(&self, report: &CrashReport, out: &mut dyn Write, opts: &DisplayOptions) -> std::io::Result<()>;

    fn analyze(&self, text: &str) -> CrashReport {
        let timeline = self.parse(text);
        log::info!("{}: {} events", self.info().id, timeline.len());
        CrashReport::build(self.info().clone(), timeline)
    }
}

pub struct ExpandFrameParser { info: ParserInfo }

impl Default for ExpandFrameParser {
    fn default() -> Self {
        Self { info: ParserInfo {
            id: "expandFrame",
            name: "ExpandFrame Crash Parser",
            version: "1.0.0",
            description: "Specialized parser for TextBubbleStickerView expandFrameWithSize crashes",
            target_crash_event: "-[TextBubbleStickerView expandFrameWithSize:]",
        } }
    }
}

impl CrashParser for ExpandFrameParser {
    fn info(&self) -> &ParserInfo { &self.info }

    fn parse(&self, text: &str) -> Timeline { scan_log(text) }

    fn display_results(&self, rep: &CrashReport, out: &mut dyn Write, opts: &DisplayOptions) -> std::io::Result<()> {
        report::write_header(rep, out, opts)?;
        report::write_summary(rep, out, opts, &[EventKind::TextStyle, EventKind::FrameChange, EventKind::RenderSize])?;
        if opts.summary_only { return Ok(()); }
        if rep.analysis.has_crash { report::write_crash_analysis(rep, out, opts)?; }
        report::write_guids(rep, out, opts)?;
        report::write_frames(rep, out, opts)?;
        report::write_renders(rep, out, opts)?;
        report::write_statistics(rep, out, opts)?;
        report::write_timeline(rep, out, opts)?;
        report::write_recommendations(rep, out, opts)
    }
}

pub struct SpacingParser { info: ParserInfo }

impl Default for SpacingParser {
    fn default() -> Self {
        Self { info: ParserInfo {
            id: "spacing",
            name: "Spacing Parser",
            version: "1.0.0",
            description: "Analyzes spacing changes",
            target_crash_event: "Spacing Issues",
        } }
    }
}

impl CrashParser for SpacingParser {
    fn info(&self) -> &ParserInfo { &self.info }

    fn parse(&self, text: &str) -> Timeline { scan_log(text).retain_kinds(|k| k.is_spacing()) }

    fn display_results(&self, rep: &CrashReport, out: &mut dyn Write, opts: &DisplayOptions) -> std::io::Result<()> {
        report::write_header(rep, out, opts)?;
        report::write_summary(rep, out, opts, &[EventKind::LetterSpacing, EventKind::LineSpacing, EventKind::SpacingDegreeChange])?;
        if opts.summary_only { return Ok(()); }
        report::write_timeline(rep, out, opts)?;
        report::write_recommendations(rep, out, opts)
    }
}

pub struct GeneralParser { info: ParserInfo }

impl Default for GeneralParser {
    fn default() -> Self {
        Self { info: ParserInfo {
            id: "general",
            name: "General Parser",
            version: "1.0.0",
            description: "Comprehensive analysis for all crash types",
            target_crash_event: "All Crash Types",
        } }
    }
}

impl CrashParser for GeneralParser {
    fn info(&self) -> &ParserInfo { &self.info }

    fn parse(&self, text: &str) -> Timeline { scan_log(text) }

    fn display_results(&self, rep: &CrashReport, out: &mut dyn Write, opts: &DisplayOptions) -> std::io::Result<()> {
        report::write_header(rep, out, opts)?;
        report::write_summary(rep, out, opts, &EventKind::ALL)?;
        if opts.summary_only { return Ok(()); }
        report::write_recommendations(rep, out, opts)
    }
}

pub const DEFAULT_PARSER: &str = "expandFrame";

pub struct ParserRegistry {
    parsers: Vec<Box<dyn CrashParser>>,
}

impl ParserRegistry {
    pub fn empty() -> Self { Self { parsers: vec![] } }

    pub fn builtin() -> Self {
        let mut r = Self::empty();
        let builtins: Vec<Box<dyn CrashParser>> = vec![Box::new(ExpandFrameParser::default()), Box::new(SpacingParser::default()), Box::new(GeneralParser::default())];
        for p in builtins {
            if let Err(e) = r.register(p) { log::warn!("skipping built-in parser: {}", e); }
        }
        r
    }

    pub fn register(&mut self, parser: Box<dyn CrashParser>) -> Result<(), RegistryError> {
        let id = parser.info().id;
        if self.parsers.iter().any(|p| p.info().id == id) { return Err(RegistryError::DuplicateParser(id.to_string())); }
        log::debug!("registered parser: {} v{}", parser.info().name, parser.info().version);
        self.parsers.push(parser);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&dyn CrashParser, RegistryError> {
        self.parsers.iter().find(|p| p.info().id == id).map(|p| &**p).ok_or_else(|| {
            let ids: Vec<&str> = self.parsers.iter().map(|p| p.info().id).collect();
            RegistryError::UnknownParser(id.to_string(), ids.join(", "))
        })
    }

    pub fn infos(&self) -> impl Iterator<Item = &ParserInfo> { self.parsers.iter().map(|p| p.info()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::Severity;

    const LOG: &str = "\
1 | 00:00:01 | letterSpacing=1 new letterSpacing=NaN changed=1
2 | 00:00:02 | renderSize={0,0}
3 | 00:00:03 | expandFrameWithSize: size={NaN, NaN}
";

    #[test]
    fn builtin_registry_lists_three_parsers() {
        let r = ParserRegistry::builtin();
        let ids: Vec<&str> = r.infos().map(|i| i.id).collect();
        assert_eq!(ids, vec!["expandFrame", "spacing", "general"]);
        assert_eq!(r.get(DEFAULT_PARSER).unwrap().info().target_crash_event, "-[TextBubbleStickerView expandFrameWithSize:]");
    }

    #[test]
    fn unknown_and_duplicate_ids_are_errors() {
        let mut r = ParserRegistry::builtin();
        match r.get("nope") {
            Err(RegistryError::UnknownParser(id, avail)) => { assert_eq!(id, "nope"); assert!(avail.contains("spacing")); }
            _ => panic!("expected unknown parser error"),
        }
        assert_eq!(r.register(Box::new(GeneralParser::default())), Err(RegistryError::DuplicateParser("general".to_string())));
    }

    #[test]
    fn spacing_parser_keeps_only_spacing_events() {
        let t = SpacingParser::default().parse(LOG);
        assert_eq!(t.len(), 1);
        assert!(t.iter().all(|e| e.kind().is_spacing()));
    }

    #[test]
    fn expand_frame_parser_end_to_end() {
        let rep = ExpandFrameParser::default().analyze(LOG);
        assert!(rep.analysis.has_crash);
        assert_eq!(rep.analysis.severity, Severity::Critical);
        assert_eq!(rep.severity, Severity::Critical);
        assert!(rep.analysis.primary_cause.as_deref().unwrap().contains("NaN"));
        assert!(rep.analysis.trigger_events.iter().any(|t| t.contains("zero render")));
        assert!(rep.analysis.trigger_events.iter().any(|t| t.contains("NaN frame")));
        assert_eq!(rep.recommendations[0].title, crate::recommendations::NAN_GUARD.title);
    }

    #[test]
    fn display_writes_sections() {
        let p = ExpandFrameParser::default();
        let rep = p.analyze(LOG);
        let mut buf: Vec<u8> = vec![];
        p.display_results(&rep, &mut buf, &DisplayOptions::default()).unwrap();
        let s = String::from_utf8(buf).unwrap();
        assert!(s.contains("ExpandFrame Crash Parser"));
        assert!(s.contains("CRASH ANALYSIS - CRITICAL SEVERITY"));
        assert!(s.contains("Line 3: NaN frame values detected"));
        assert!(s.contains("HIGH PRIORITY: Immediate Fix Required"));
    }
}
