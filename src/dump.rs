use crate::diagnostics::{Diagnostics, Severity};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct DiagnosticsDump {
    pub errors: usize,
    pub warnings: usize,
    pub entries: Vec<DiagnosticDump>,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticDump {
    pub severity: &'static str,
    pub message: String,
}

impl DiagnosticsDump {
    pub fn from_diagnostics(diagnostics: &Diagnostics) -> Self {
        let entries = diagnostics
            .iter()
            .map(|diagnostic| DiagnosticDump {
                severity: match diagnostic.severity() {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                },
                message: diagnostic.to_string(),
            })
            .collect();
        DiagnosticsDump {
            errors: diagnostics.errors().count(),
            warnings: diagnostics.warnings().count(),
            entries,
        }
    }
}

/// Writes `value` as pretty JSON to `path`, or to stdout when no path is given.
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

pub fn write_diagnostics_dump(diagnostics: &Diagnostics) -> anyhow::Result<()> {
    let dump = DiagnosticsDump::from_diagnostics(diagnostics);
    let stderr = io::stderr();
    let mut writer = stderr.lock();
    serde_json::to_writer_pretty(&mut writer, &dump)?;
    writeln!(writer)?;
    Ok(())
}
