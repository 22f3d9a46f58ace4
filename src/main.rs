use std::io::Read;
use anyhow::Context;
use clap::{ArgAction, ColorChoice, CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use is_terminal::IsTerminal;
use serde::{Deserialize, Serialize};
mod action_block;
mod decoder;
mod diagnosis;
mod events;
mod export;
mod extractors;
mod file_scan;
mod parsers;
mod recommendations;
mod report;
mod stats;
mod timeline;

use crate::diagnosis::Severity;
use crate::parsers::{CrashParser, ParserRegistry, DEFAULT_PARSER};
use crate::report::{CrashReport, DisplayOptions, TimelineOrder};

const DEFAULT_CONFIG: &str = "FrameDoctor.toml";
const DEFAULT_TIMELINE_LIMIT: usize = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFmt { Text, Json }

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TextFormat { Lines, Table }

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Order { Scan, Line }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogFormat { Text, Json }

#[derive(Parser, Debug)]
#[command(
    name = "FrameDoctor",
    about = "Crash log diagnostics for NaN frame-size calculations",
    long_about = "Decodes '<line> | <time> | <content>' crash-session logs into a typed event timeline, classifies crash severity, traces the pre-crash cascade and prints remediation suggestions.",
    after_long_help = "Examples:\n  FrameDoctor crash_session.log\n  FrameDoctor crash_session.log --output json --json-path report.json\n  FrameDoctor --scan-path ./logs --file-glob '*.log' --text-format table\n  FrameDoctor crash.log --parser spacing --timeline-order scan\n  cat crash.log | FrameDoctor -",
    color = ColorChoice::Auto
)]
struct Args {
    /// Log files to analyze ('-' reads stdin)
    inputs: Vec<String>,
    #[arg(long, short = 's')]
    scan_path: Option<String>,
    #[arg(long, short = 'g')]
    file_glob: Option<String>,
    #[arg(long, short = 'P')]
    parser: Option<String>,
    #[arg(long, default_value_t = false)]
    list_parsers: bool,
    /// Report format [default: text]
    #[arg(long, short = 'o', value_enum)]
    output: Option<OutputFmt>,
    #[arg(long, value_enum)]
    text_format: Option<TextFormat>,
    #[arg(long, value_enum)]
    timeline_order: Option<Order>,
    #[arg(long)]
    timeline_limit: Option<usize>,
    #[arg(long, default_value_t = false)]
    summary_only: bool,
    #[arg(long, short = 'j')]
    json_path: Option<String>,
    #[arg(long)]
    csv_path: Option<String>,
    #[arg(long)]
    ndjson_path: Option<String>,
    #[arg(long, short = 'C', default_value_t = false)]
    no_color: bool,
    #[arg(long, default_value_t = false)]
    force_color: bool,
    #[arg(long, default_value_t = false)]
    no_emoji: bool,
    #[arg(long, default_value_t = false)]
    progress: bool,
    /// Exit with status 1 when any analyzed log is not of normal severity
    #[arg(long, default_value_t = false)]
    warnings_as_errors: bool,
    #[arg(long)]
    log_level: Option<LogLevel>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    #[arg(long)]
    log_path: Option<String>,
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
    #[arg(long)]
    completions_out: Option<String>,
    #[arg(long)]
    config: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            inputs: vec![],
            scan_path: None,
            file_glob: None,
            parser: None,
            list_parsers: false,
            output: None,
            text_format: None,
            timeline_order: None,
            timeline_limit: None,
            summary_only: false,
            json_path: None,
            csv_path: None,
            ndjson_path: None,
            no_color: false,
            force_color: false,
            no_emoji: false,
            progress: false,
            warnings_as_errors: false,
            log_level: None,
            log_format: None,
            log_path: None,
            verbose: 0,
            quiet: false,
            completions: None,
            completions_out: None,
            config: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    parser: Option<String>,
    scan_path: Option<String>,
    file_glob: Option<String>,
    output: Option<OutputFmt>,
    text_format: Option<TextFormat>,
    timeline_order: Option<Order>,
    timeline_limit: Option<usize>,
    summary_only: Option<bool>,
    json_path: Option<String>,
    csv_path: Option<String>,
    ndjson_path: Option<String>,
    no_emoji: Option<bool>,
    force_color: Option<bool>,
    progress: Option<bool>,
    warnings_as_errors: Option<bool>,
    log_level: Option<LogLevel>,
    log_format: Option<LogFormat>,
    log_path: Option<String>,
}

fn apply_config(args: &mut Args, cfg: AppConfig) {
    if args.parser.is_none() && let Some(v) = cfg.parser { args.parser = Some(v); }
    if args.scan_path.is_none() && let Some(v) = cfg.scan_path { args.scan_path = Some(v); }
    if args.file_glob.is_none() && let Some(v) = cfg.file_glob { args.file_glob = Some(v); }
    if args.output.is_none() { args.output = cfg.output; }
    if args.text_format.is_none() { args.text_format = cfg.text_format; }
    if args.timeline_order.is_none() { args.timeline_order = cfg.timeline_order; }
    if args.timeline_limit.is_none() && let Some(v) = cfg.timeline_limit { args.timeline_limit = Some(v); }
    if args.json_path.is_none() && let Some(v) = cfg.json_path { args.json_path = Some(v); }
    if args.csv_path.is_none() && let Some(v) = cfg.csv_path { args.csv_path = Some(v); }
    if args.ndjson_path.is_none() && let Some(v) = cfg.ndjson_path { args.ndjson_path = Some(v); }
    if args.log_level.is_none() && let Some(v) = cfg.log_level { args.log_level = Some(v); }
    if args.log_format.is_none() && let Some(v) = cfg.log_format { args.log_format = Some(v); }
    if args.log_path.is_none() && let Some(v) = cfg.log_path { args.log_path = Some(v); }
    if let Some(v) = cfg.summary_only { args.summary_only |= v; }
    if let Some(v) = cfg.no_emoji { args.no_emoji |= v; }
    if let Some(v) = cfg.force_color { args.force_color |= v; }
    if let Some(v) = cfg.progress { args.progress |= v; }
    if let Some(v) = cfg.warnings_as_errors { args.warnings_as_errors |= v; }
}

// logging is not up yet, so problems go to stderr
fn load_config(path: Option<&str>) -> Option<AppConfig> {
    let (p, explicit) = match path { Some(p) => (p, true), None => (DEFAULT_CONFIG, false) };
    let s = match std::fs::read_to_string(p) {
        Ok(s) => s,
        Err(e) => { if explicit { eprintln!("Failed to read config {}: {}", p, e); } return None; }
    };
    match toml::from_str::<AppConfig>(&s) {
        Ok(cfg) => Some(cfg),
        Err(e) => { eprintln!("Failed to parse config {}: {}", p, e); None }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l { LogLevel::Error => Self::Error, LogLevel::Warn => Self::Warn, LogLevel::Info => Self::Info, LogLevel::Debug => Self::Debug, LogLevel::Trace => Self::Trace }
    }
}

// None leaves RUST_LOG in charge
fn level_filter(args: &Args) -> Option<log::LevelFilter> {
    if args.quiet { return Some(log::LevelFilter::Error); }
    if let Some(l) = args.log_level { return Some(l.into()); }
    match args.verbose { 0 => None, 1 => Some(log::LevelFilter::Info), 2 => Some(log::LevelFilter::Debug), _ => Some(log::LevelFilter::Trace) }
}

fn write_record(fmt: LogFormat, buf: &mut env_logger::fmt::Formatter, record: &log::Record) -> std::io::Result<()> {
    use std::io::Write;
    let now = chrono::Local::now();
    match fmt {
        LogFormat::Json => {
            let line = serde_json::json!({ "time": now.to_rfc3339(), "level": record.level().as_str(), "module": record.target(), "message": record.args().to_string() });
            writeln!(buf, "{}", line)
        }
        LogFormat::Text => writeln!(buf, "{} {:<5} {}: {}", now.format("%H:%M:%S%.3f"), record.level(), record.target(), record.args()),
    }
}

fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if let Some(f) = level_filter(args) { builder.filter_level(f); }
    if let Some(fmt) = args.log_format { builder.format(move |buf, record| write_record(fmt, buf, record)); }
    if let Some(path) = args.log_path.as_ref() {
        match std::fs::File::create(path) {
            Ok(f) => { builder.target(env_logger::Target::Pipe(Box::new(f))); }
            Err(e) => eprintln!("cannot open log file {}: {}", path, e),
        }
    }
    builder.init();
}

fn write_completions(shell: Shell, out_path: Option<&str>) -> std::io::Result<()> {
    let mut cmd = Args::command();
    match out_path {
        Some(p) => clap_complete::generate(shell, &mut cmd, "FrameDoctor", &mut std::fs::File::create(p)?),
        None => clap_complete::generate(shell, &mut cmd, "FrameDoctor", &mut std::io::stdout()),
    }
    Ok(())
}

fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s).context("reading stdin")?;
        return Ok(s);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path))
}

fn resolve_inputs(args: &Args) -> anyhow::Result<Vec<String>> {
    let mut inputs = args.inputs.clone();
    if let Some(root) = args.scan_path.as_ref() {
        let found = file_scan::collect_log_files(root, args.file_glob.as_deref()).with_context(|| format!("scanning {}", root))?;
        if found.is_empty() { log::warn!("no files matching {} under {}", args.file_glob.as_deref().unwrap_or(file_scan::DEFAULT_LOG_GLOB), root); }
        inputs.extend(found);
    }
    if inputs.is_empty() && args.scan_path.is_none() { inputs.push("-".to_string()); }
    Ok(inputs)
}

fn display_options(args: &Args) -> DisplayOptions {
    DisplayOptions {
        emoji: !args.no_emoji,
        table: args.text_format == Some(TextFormat::Table),
        order: match args.timeline_order.unwrap_or(Order::Line) { Order::Scan => TimelineOrder::Scan, Order::Line => TimelineOrder::Line },
        timeline_limit: args.timeline_limit.unwrap_or(DEFAULT_TIMELINE_LIMIT),
        summary_only: args.summary_only,
    }
}

fn analyze_inputs(parser: &dyn CrashParser, inputs: &[String], progress: bool) -> Vec<CrashReport> {
    let pb = if progress && inputs.len() > 1 { Some(indicatif::ProgressBar::new(inputs.len() as u64)) } else { None };
    let mut reports = vec![];
    for path in inputs {
        if let Some(pb) = pb.as_ref() { pb.set_message(path.clone()); }
        match read_input(path) {
            Ok(text) => {
                let rep = parser.analyze(&text).with_source(if path == "-" { "<stdin>" } else { path });
                log::info!("{}: severity {} ({} events)", path, rep.severity, rep.timeline.len());
                reports.push(rep);
            }
            Err(e) => log::error!("{:#}", e),
        }
        if let Some(pb) = pb.as_ref() { pb.inc(1); }
    }
    if let Some(pb) = pb { pb.finish_and_clear(); }
    reports
}

fn any_abnormal(reports: &[CrashReport]) -> bool {
    reports.iter().any(|r| r.severity != Severity::Normal || r.analysis.severity != Severity::Normal)
}

fn main() {
    let mut args = Args::parse();
    if let Some(sh) = args.completions {
        if let Err(e) = write_completions(sh, args.completions_out.as_deref()) {
            eprintln!("cannot write completions: {}", e);
            std::process::exit(2);
        }
        return;
    }
    if let Some(cfg) = load_config(args.config.as_deref()) { apply_config(&mut args, cfg); }
    init_logging(&args);
    let term = std::env::var("TERM").unwrap_or_default();
    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    let color_default = std::io::stdout().is_terminal() && !no_color_env && term != "dumb";
    report::set_color_enabled(if args.force_color { true } else { color_default && !args.no_color });

    let registry = ParserRegistry::builtin();
    if args.list_parsers {
        for info in registry.infos() { println!("{:<12} {} v{} - {} [{}]", info.id, info.name, info.version, info.description, info.target_crash_event); }
        return;
    }
    let parser = match registry.get(args.parser.as_deref().unwrap_or(DEFAULT_PARSER)) {
        Ok(p) => p,
        Err(e) => { log::error!("{}", e); eprintln!("{}", e); std::process::exit(2); }
    };
    let inputs = match resolve_inputs(&args) {
        Ok(i) => i,
        Err(e) => { log::error!("{:#}", e); eprintln!("{:#}", e); std::process::exit(2); }
    };
    let reports = analyze_inputs(parser, &inputs, args.progress);
    if reports.is_empty() {
        log::error!("no input could be analyzed");
        std::process::exit(2);
    }

    let output = args.output.unwrap_or(OutputFmt::Text);
    match output {
        OutputFmt::Text => {
            let opts = display_options(&args);
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for (i, rep) in reports.iter().enumerate() {
                let res = if i > 0 { std::io::Write::write_all(&mut out, b"\n") } else { Ok(()) };
                if let Err(e) = res.and_then(|_| parser.display_results(rep, &mut out, &opts)) { log::error!("writing report failed: {}", e); break; }
            }
        }
        OutputFmt::Json => {
            match export::reports_to_json(&reports) {
                Ok(json) => {
                    if let Some(p) = args.json_path.as_ref() {
                        match std::fs::write(p, json) {
                            Ok(_) => { if !args.quiet { println!("JSON written: {}", p); } }
                            Err(e) => log::error!("JSON write failed for {}: {}", p, e),
                        }
                    } else { println!("{}", json); }
                }
                Err(e) => log::error!("JSON serialization failed: {}", e),
            }
        }
    }
    if output == OutputFmt::Text && let Some(p) = args.json_path.as_ref() {
        match export::reports_to_json(&reports).map_err(std::io::Error::other).and_then(|j| std::fs::write(p, j)) {
            Ok(_) => { if !args.quiet { println!("JSON written: {}", p); } }
            Err(e) => log::error!("JSON write failed for {}: {}", p, e),
        }
    }
    if let Some(p) = args.csv_path.as_ref() {
        if let Err(e) = export::write_csv(p, &reports) { log::error!("CSV write failed for {}: {}", p, e); } else if !args.quiet { println!("CSV written: {}", p); }
    }
    if let Some(p) = args.ndjson_path.as_ref() {
        if let Err(e) = export::write_ndjson(p, &reports) { log::error!("NDJSON write failed for {}: {}", p, e); } else if !args.quiet { println!("NDJSON written: {}", p); }
    }
    if args.warnings_as_errors && any_abnormal(&reports) { std::process::exit(1); }
}
