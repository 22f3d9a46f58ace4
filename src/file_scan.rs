use globset::{GlobBuilder, GlobSetBuilder};
use walkdir::WalkDir;

pub const DEFAULT_LOG_GLOB: &str = "*.log";

pub fn collect_log_files(root: &str, file_glob: Option<&str>) -> Result<Vec<String>, globset::Error> {
    let mut gs = GlobSetBuilder::new();
    gs.add(GlobBuilder::new(file_glob.unwrap_or(DEFAULT_LOG_GLOB)).case_insensitive(true).literal_separator(false).build()?);
    let set = gs.build()?;
    let mut out: Vec<String> = vec![];
    for de in WalkDir::new(root).follow_links(false).into_iter().filter_map(Result::ok) {
        let p = de.path();
        if !p.is_file() { continue; }
        let matched = p.file_name().is_some_and(|n| set.is_match(n)) || set.is_match(p);
        if matched { out.push(p.to_string_lossy().to_string()); }
    }
    out.sort();
    log::debug!("{} log file(s) under {}", out.len(), root);
    Ok(out)
}
