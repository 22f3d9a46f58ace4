use std::io::Write;
use crate::report::CrashReport;

const TIMELINE_COLUMNS: [&str; 6] = ["source", "line", "timestamp", "kind", "details", "severity_flag"];

fn flag(e: &crate::events::Event) -> &'static str {
    if e.has_nan_dimension() { "nan" } else if e.has_zero_dimension() { "zero" } else { "" }
}

pub fn write_csv(path: &str, reports: &[CrashReport]) -> Result<(), std::io::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(TIMELINE_COLUMNS)?;
    for rep in reports {
        let src = rep.source.clone().unwrap_or_default();
        for e in rep.timeline.sorted_by_line() {
            wtr.write_record([src.clone(), e.line.to_string(), e.timestamp.clone(), e.kind().as_str().to_string(), e.describe(), flag(e).to_string()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_ndjson(path: &str, reports: &[CrashReport]) -> Result<(), std::io::Error> {
    let mut file = std::fs::File::create(path)?;
    for rep in reports {
        for e in rep.timeline.sorted_by_line() {
            let mut obj = serde_json::to_value(e).map_err(std::io::Error::other)?;
            if let Some(src) = rep.source.as_ref() && let Some(map) = obj.as_object_mut() {
                map.insert("source".to_string(), serde_json::Value::String(src.clone()));
            }
            writeln!(file, "{}", obj)?;
        }
    }
    Ok(())
}

/// A single report is written as an object, several as an array.
pub fn reports_to_json(reports: &[CrashReport]) -> serde_json::Result<String> {
    match reports {
        [one] => serde_json::to_string_pretty(one),
        many => serde_json::to_string_pretty(many),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{CrashParser, ExpandFrameParser};

    fn sample() -> CrashReport {
        ExpandFrameParser::default()
            .analyze("2 | t2 | renderSize={0, 0}\n1 | t1 | expandFrameWithSize: size={NaN, 3}\n")
            .with_source("crash.log")
    }

    #[test]
    fn csv_rows_are_line_sorted() {
        let p = std::env::temp_dir().join("framedoctor_export_test.csv");
        let ps = p.to_string_lossy().to_string();
        write_csv(&ps, &[sample()]).unwrap();
        let s = std::fs::read_to_string(&p).unwrap();
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines[0], "source,line,timestamp,kind,details,severity_flag");
        assert!(lines[1].starts_with("crash.log,1,t1,frame_change"));
        assert!(lines[1].ends_with(",nan"));
        assert!(lines[2].starts_with("crash.log,2,t2,render_size"));
        let _ = std::fs::remove_file(&p);
    }

    #[test]
    fn ndjson_writes_one_event_per_line() {
        let p = std::env::temp_dir().join("framedoctor_export_test.ndjson");
        let ps = p.to_string_lossy().to_string();
        write_ndjson(&ps, &[sample()]).unwrap();
        let s = std::fs::read_to_string(&p).unwrap();
        let rows: Vec<serde_json::Value> = s.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["kind"], "frame_change");
        assert!(rows[0]["width"].is_null());
        assert_eq!(rows[1]["source"], "crash.log");
        let _ = std::fs::remove_file(&p);
    }

    #[test]
    fn json_shape_depends_on_report_count() {
        let one = reports_to_json(&[sample()]).unwrap();
        assert!(one.trim_start().starts_with('{'));
        let v: serde_json::Value = serde_json::from_str(&one).unwrap();
        assert_eq!(v["analysis"]["severity"], "critical");
        assert_eq!(v["recommendations"][0]["priority"], "HIGH");
        let two = reports_to_json(&[sample(), sample()]).unwrap();
        assert!(two.trim_start().starts_with('['));
    }
}
