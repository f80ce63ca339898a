//! Delete command implementation.

use crate::cli::DeleteArgs;
use crate::error::Result;
use crate::output::Formatter;
use std::io::{self, Write};
use tenderfold_domain::{ProjectId, ProjectStore};
use tenderfold_store::StoreError;

/// Execute the delete command.
pub fn execute_delete<S>(args: DeleteArgs, store: &S, formatter: &Formatter) -> Result<()>
where
    S: ProjectStore<Error = StoreError>,
{
    let project = ProjectId::new(args.project);

    // Confirm deletion unless --yes is specified
    if !args.yes {
        let versions = store.list_versions(&project)?.len();
        print!(
            "Delete project '{}' with {} version(s) and all provenance? [y/N] ",
            project, versions
        );
        io::stdout().flush()?;

        let mut response = String::new();
        io::stdin().read_line(&mut response)?;

        if !response.trim().eq_ignore_ascii_case("y") {
            println!("{}", formatter.info("Operation cancelled"));
            return Ok(());
        }
    }

    let removed = store.delete_project(&project)?;
    if removed == 0 {
        println!("{}", formatter.warning(&format!("Project '{}' had no versions", project)));
    } else {
        println!(
            "{}",
            formatter.success(&format!("Deleted project '{}' ({} version(s))", project, removed))
        );
    }
    Ok(())
}
