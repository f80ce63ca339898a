//! Projects command implementation.

use crate::error::Result;
use crate::output::Formatter;
use tenderfold_domain::ProjectStore;
use tenderfold_store::StoreError;

/// Execute the projects command.
pub fn execute_projects<S>(store: &S, formatter: &Formatter) -> Result<()>
where
    S: ProjectStore<Error = StoreError>,
{
    let projects = store.list_projects()?;
    println!("{}", formatter.format_projects(&projects)?);
    Ok(())
}
