//! Versions command implementation.

use crate::cli::ProjectArgs;
use crate::error::Result;
use crate::output::Formatter;
use tenderfold_domain::{ProjectId, ProjectStore};
use tenderfold_store::StoreError;

/// Execute the versions command.
pub fn execute_versions<S>(args: ProjectArgs, store: &S, formatter: &Formatter) -> Result<()>
where
    S: ProjectStore<Error = StoreError>,
{
    let versions = store.list_versions(&ProjectId::new(args.project))?;
    println!("{}", formatter.format_versions(&versions)?);
    Ok(())
}
