//! Export helpers for CSV and JSON artifacts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod phases {
    use std::io::{self, Write};

    use csv::WriterBuilder;
    use serde::Serialize;

    const HEADER: [&str; 10] = [
        "index",
        "name",
        "trigger_index",
        "trigger",
        "start_time_s",
        "end_time_s",
        "duration_s",
        "accepted_steps",
        "rejected_steps",
        "locator_iterations",
    ];

    /// CSV row describing one terminated phase, in header order.
    #[derive(Debug, Clone, Serialize)]
    pub struct Record<'a> {
        pub index: usize,
        pub name: &'a str,
        pub trigger_index: usize,
        pub trigger: &'a str,
        pub start_time_s: f64,
        pub end_time_s: f64,
        pub duration_s: f64,
        pub accepted_steps: u64,
        pub rejected_steps: u64,
        pub locator_iterations: usize,
    }

    /// Write the header followed by one row per record.
    pub fn write_table<'a, I>(writer: &mut dyn Write, records: I) -> io::Result<()>
    where
        I: IntoIterator<Item = Record<'a>>,
    {
        let mut table = WriterBuilder::new().has_headers(false).from_writer(writer);
        table.write_record(HEADER)?;
        for record in records {
            table.serialize(record)?;
        }
        table.flush()
    }
}

pub mod summary {
    use std::io::{self, Write};

    use serde::Serialize;
    use serde_json::to_writer_pretty;

    /// Value reported in its display unit.
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct NamedValue {
        pub name: String,
        pub value: f64,
        pub units: String,
    }

    /// One terminated phase.
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct PhaseSummary {
        pub name: String,
        pub trigger_index: usize,
        pub trigger: String,
        pub start_time_s: f64,
        pub end_time_s: f64,
        pub accepted_steps: u64,
        pub rejected_steps: u64,
        pub initial_state: Vec<NamedValue>,
        pub terminal_state: Vec<NamedValue>,
    }

    /// Envelope written for a completed mission.
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct MissionSummary {
        pub mission: String,
        pub end_time_s: f64,
        pub final_outputs: Vec<NamedValue>,
        pub phases: Vec<PhaseSummary>,
    }

    /// Write the summary as pretty-printed JSON followed by a newline.
    pub fn write_json(writer: &mut dyn Write, summary: &MissionSummary) -> io::Result<()> {
        to_writer_pretty(&mut *writer, summary)?;
        writeln!(writer)
    }
}
