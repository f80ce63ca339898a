//! History command implementation.

use crate::cli::HistoryArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use tenderfold_domain::{FieldPath, ProjectId, ProjectStore};
use tenderfold_store::StoreError;

/// Execute the history command.
pub fn execute_history<S>(args: HistoryArgs, store: &S, formatter: &Formatter) -> Result<()>
where
    S: ProjectStore<Error = StoreError>,
{
    let path = match &args.section {
        Some(section) => FieldPath::parse(section).map_err(CliError::InvalidInput)?,
        None => FieldPath::root(),
    };

    let mut records = store.section_history(&ProjectId::new(args.project), &path)?;
    if let Some(limit) = args.limit {
        // Oldest first, so the most recent are at the end
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
    }

    println!("{}", formatter.format_history(&records)?);
    Ok(())
}
