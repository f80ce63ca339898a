//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};
use tenderfold_domain::{DocumentVersion, ExtractedRecord, FieldPath, ProjectId, ProvenanceRecord, Value};
use tenderfold_extractor::{IngestReport, RebuildReport};

/// Longest cell text shown in tables before truncation.
const MAX_CELL_CHARS: usize = 60;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the result of an ingestion.
    pub fn format_ingest_report(&self, report: &IngestReport) -> Result<String> {
        match self.format {
            OutputFormat::Quiet => Ok(report.version_id.to_string()),
            OutputFormat::Json => {
                let conflicts: Vec<String> = report
                    .conflicts
                    .iter()
                    .map(|c| format!("{}: {} vs {} (kept {})", c.path, c.existing, c.incoming, c.kept))
                    .collect();
                let warnings: Vec<String> = report.warnings.iter().map(|w| w.to_string()).collect();
                let json = serde_json::json!({
                    "version_id": report.version_id.to_string(),
                    "kind": report.kind.as_str(),
                    "content_hash": report.content_hash,
                    "created_at": report.created_at,
                    "chunks": report.chunks,
                    "degraded_chunks": report.degraded_chunks,
                    "used_fallback": report.used_fallback,
                    "reconcile": {
                        "initial": report.reconcile.initial,
                        "final": report.reconcile.final_count,
                        "duplicates_removed": report.reconcile.duplicates_removed,
                    },
                    "conflicts": conflicts,
                    "warnings": warnings,
                    "provenance_count": report.provenance_count,
                });
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Table => {
                let mut lines = vec![self.success(&format!(
                    "Committed {} version {}",
                    report.kind, report.version_id
                ))];
                lines.push(format!(
                    "  chunks: {} ({} degraded)",
                    report.chunks, report.degraded_chunks
                ));
                lines.push(format!(
                    "  products: {} kept, {} duplicates removed{}",
                    report.reconcile.final_count,
                    report.reconcile.duplicates_removed,
                    if report.used_fallback { " (fallback)" } else { "" }
                ));
                lines.push(format!("  facts recorded: {}", report.provenance_count));
                if report.degraded_chunks > 0 {
                    lines.push(self.warning(&format!(
                        "{} chunk(s) could not be extracted and were left empty",
                        report.degraded_chunks
                    )));
                }
                for conflict in &report.conflicts {
                    lines.push(self.warning(&format!(
                        "Type conflict at {}: kept {}",
                        conflict.path, conflict.kept
                    )));
                }
                for warning in &report.warnings {
                    lines.push(self.warning(&warning.to_string()));
                }
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format a record or one section of it.
    pub fn format_record(&self, record: &ExtractedRecord) -> Result<String> {
        match self.format {
            OutputFormat::Json | OutputFormat::Quiet => Ok(record.to_json_pretty()),
            OutputFormat::Table => {
                let mut rows = Vec::new();
                for (key, value) in record.as_map() {
                    flatten(value, FieldPath::root().child(key), &mut rows);
                }
                if rows.is_empty() {
                    return Ok(self.colorize("Record is empty.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                for (path, value) in rows {
                    builder.push_record([path.to_string(), truncate(&value)]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format a version list.
    pub fn format_versions(&self, versions: &[DocumentVersion]) -> Result<String> {
        match self.format {
            OutputFormat::Quiet => Ok(versions
                .iter()
                .map(|v| v.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Json => {
                let json: Vec<serde_json::Value> = versions
                    .iter()
                    .map(|v| {
                        serde_json::json!({
                            "id": v.id.to_string(),
                            "project_id": v.project_id.as_str(),
                            "kind": v.kind.as_str(),
                            "content_hash": v.content_hash,
                            "created_at": v.created_at,
                            "source_file": v.source_file,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Table => {
                if versions.is_empty() {
                    return Ok(self.colorize("No versions found.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["ID", "Kind", "Created", "Source", "Hash"]);
                for version in versions {
                    builder.push_record([
                        version.id.to_string(),
                        version.kind.to_string(),
                        version.created_at.to_string(),
                        version.source_file.clone(),
                        version.content_hash.chars().take(12).collect(),
                    ]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format provenance history.
    pub fn format_history(&self, records: &[ProvenanceRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Quiet => Ok(records
                .iter()
                .map(|r| r.content.clone())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Json => {
                let json: Vec<serde_json::Value> = records
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "section_path": r.section_path.to_string(),
                            "content": r.content,
                            "document_id": r.document_id.to_string(),
                            "source_kind": r.source_kind.as_str(),
                            "source_file": r.source_file,
                            "created_at": r.created_at,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Table => {
                if records.is_empty() {
                    return Ok(self.colorize("No history found.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["Created", "Section", "Content", "Kind", "Source"]);
                for record in records {
                    builder.push_record([
                        record.created_at.to_string(),
                        record.section_path.to_string(),
                        truncate(&record.content),
                        record.source_kind.to_string(),
                        record.source_file.clone(),
                    ]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format a baseline rebuild check.
    pub fn format_rebuild(&self, project: &ProjectId, report: &RebuildReport) -> Result<String> {
        match self.format {
            OutputFormat::Quiet => Ok(report.is_consistent().to_string()),
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "project_id": project.as_str(),
                    "versions": report.versions,
                    "consistent": report.is_consistent(),
                    "has_baseline": report.stored.is_some(),
                });
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Table => {
                if report.is_consistent() {
                    Ok(self.success(&format!(
                        "Baseline of '{}' matches the fold of {} version(s)",
                        project, report.versions
                    )))
                } else {
                    Ok(self.error(&format!(
                        "Baseline of '{}' differs from the fold of {} version(s)",
                        project, report.versions
                    )))
                }
            }
        }
    }

    /// Format the project list.
    pub fn format_projects(&self, projects: &[ProjectId]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let ids: Vec<&str> = projects.iter().map(|p| p.as_str()).collect();
                Ok(serde_json::to_string_pretty(&ids)?)
            }
            OutputFormat::Table | OutputFormat::Quiet => {
                if projects.is_empty() && matches!(self.format, OutputFormat::Table) {
                    return Ok(self.colorize("No projects found.", "yellow"));
                }
                Ok(projects
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn render(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Leaf fields of a value as (path, display text) rows
fn flatten(value: &Value, path: FieldPath, rows: &mut Vec<(FieldPath, String)>) {
    match value {
        Value::Map(map) => {
            for (key, child) in map {
                flatten(child, path.child(key), rows);
            }
        }
        Value::Array(items) if items.iter().all(Value::is_scalar) => {
            let joined: Vec<String> = items.iter().map(Value::to_display_string).collect();
            rows.push((path, joined.join("; ")));
        }
        Value::Array(items) => rows.push((path, format!("[{} items]", items.len()))),
        scalar => rows.push((path, scalar.to_display_string())),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(MAX_CELL_CHARS - 1).collect();
    format!("{}…", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenderfold_domain::{VersionId, VersionKind};

    fn create_test_record() -> ExtractedRecord {
        ExtractedRecord::from_json_str(
            r#"{
                "projectOverview": {"bidValue": "₹10,00,000", "tags": ["hvac", "metro"]},
                "productMapping": {"products": [{"name": "Split AC"}]}
            }"#,
        )
        .unwrap()
    }

    fn create_test_history() -> Vec<ProvenanceRecord> {
        vec![ProvenanceRecord::new(
            ProjectId::new("metro-hvac"),
            VersionId::new(),
            FieldPath::parse("legal.penalties").unwrap(),
            "0.5% per week",
            VersionKind::Amendment,
            "corrigendum-1.pdf",
            1_700_000_000_000,
        )]
    }

    #[test]
    fn test_record_table_flattens_sections() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_record(&create_test_record()).unwrap();
        assert!(output.contains("projectOverview.bidValue"));
        assert!(output.contains("hvac; metro"));
        assert!(output.contains("[1 items]"));
    }

    #[test]
    fn test_record_json() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_record(&create_test_record()).unwrap();
        let parsed = ExtractedRecord::from_json_str(&output).unwrap();
        assert_eq!(parsed, create_test_record());
    }

    #[test]
    fn test_history_formats() {
        let history = create_test_history();

        let table = Formatter::new(OutputFormat::Table, false)
            .format_history(&history)
            .unwrap();
        assert!(table.contains("Section"));
        assert!(table.contains("legal.penalties"));

        let json = Formatter::new(OutputFormat::Json, false)
            .format_history(&history)
            .unwrap();
        assert!(json.contains("\"source_kind\": \"AMENDMENT\""));

        let quiet = Formatter::new(OutputFormat::Quiet, false)
            .format_history(&history)
            .unwrap();
        assert_eq!(quiet, "0.5% per week");
    }

    #[test]
    fn test_empty_lists() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert!(formatter.format_versions(&[]).unwrap().contains("No versions found"));
        assert!(formatter.format_history(&[]).unwrap().contains("No history found"));
        assert!(formatter.format_projects(&[]).unwrap().contains("No projects found"));
        assert!(Formatter::new(OutputFormat::Quiet, false)
            .format_projects(&[])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_truncate_long_cells() {
        let long = "x".repeat(100);
        let cell = truncate(&long);
        assert_eq!(cell.chars().count(), MAX_CELL_CHARS);
        assert!(cell.ends_with('…'));
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let msg = formatter.success("test");
        assert_eq!(msg, "✓ test");
    }
}
