//! Rebuild command implementation.

use crate::cli::ProjectArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use tenderfold_domain::{ProjectId, ProjectStore};
use tenderfold_extractor::RebuildReport;
use tenderfold_merge::VersionMerger;
use tenderfold_store::StoreError;

/// Execute the rebuild command.
///
/// Fails when the stored baseline differs from the fold of the versions.
pub fn execute_rebuild<S>(
    args: ProjectArgs,
    store: &S,
    config: &Config,
    formatter: &Formatter,
) -> Result<()>
where
    S: ProjectStore<Error = StoreError>,
{
    let project = ProjectId::new(args.project);
    let report = check_baseline(&project, store, config)?;
    println!("{}", formatter.format_rebuild(&project, &report)?);

    if report.is_consistent() {
        Ok(())
    } else {
        Err(CliError::Inconsistent(format!(
            "baseline of '{}' does not match its versions",
            project
        )))
    }
}

/// Fold the stored versions of `project` and pair the result with the stored baseline
pub fn check_baseline<S>(project: &ProjectId, store: &S, config: &Config) -> Result<RebuildReport>
where
    S: ProjectStore<Error = StoreError>,
{
    let versions = store.list_versions(project)?;
    let rebuilt = VersionMerger::new(config.merge.clone()).fold_versions(&versions)?;
    let stored = store.get_baseline(project)?;
    Ok(RebuildReport {
        versions: versions.len(),
        rebuilt,
        stored,
    })
}
