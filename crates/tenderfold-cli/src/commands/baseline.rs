//! Baseline command implementation.

use crate::cli::BaselineArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use tenderfold_domain::{ExtractedRecord, FieldPath, ProjectId, ProjectStore};
use tenderfold_store::StoreError;

/// Execute the baseline command.
pub fn execute_baseline<S>(args: BaselineArgs, store: &S, formatter: &Formatter) -> Result<()>
where
    S: ProjectStore<Error = StoreError>,
{
    let project = ProjectId::new(args.project);
    let baseline = store
        .get_baseline(&project)?
        .ok_or_else(|| CliError::NotFound(format!("Project '{}' has no baseline", project)))?;

    let record = match args.section {
        Some(section) => select_section(&baseline, &section)?,
        None => baseline,
    };

    println!("{}", formatter.format_record(&record)?);
    Ok(())
}

/// The part of `record` at `section`, kept under its full path
pub fn select_section(record: &ExtractedRecord, section: &str) -> Result<ExtractedRecord> {
    let path = FieldPath::parse(section).map_err(CliError::InvalidInput)?;
    if path.is_root() {
        return Ok(record.clone());
    }

    let value = record
        .get_path(&path)
        .ok_or_else(|| CliError::NotFound(format!("Section '{}' not in baseline", path)))?;
    let mut view = ExtractedRecord::new();
    view.set_path(&path, value.clone());
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenderfold_domain::Value;

    #[test]
    fn test_select_section_keeps_path() {
        let record = ExtractedRecord::from_json_str(
            r#"{"legal": {"penalties": "0.5%", "jurisdiction": "Delhi"}, "scm": {}}"#,
        )
        .unwrap();

        let view = select_section(&record, "legal.penalties").unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(
            view.get_path(&FieldPath::parse("legal.penalties").unwrap()),
            Some(&Value::string("0.5%"))
        );
        assert!(view
            .get_path(&FieldPath::parse("legal.jurisdiction").unwrap())
            .is_none());

        assert_eq!(select_section(&record, "").unwrap(), record);
    }

    #[test]
    fn test_select_missing_section() {
        let record = ExtractedRecord::new();
        assert!(matches!(
            select_section(&record, "legal"),
            Err(CliError::NotFound(_))
        ));
        assert!(matches!(
            select_section(&record, "a..b"),
            Err(CliError::InvalidInput(_))
        ));
    }
}
