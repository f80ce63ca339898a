//! In-memory implementation of `ProjectStore`

use crate::StoreError;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tenderfold_domain::{
    BaselineHead, DocumentVersion, ExtractedRecord, FieldPath, ProjectId, ProjectStore,
    ProvenanceRecord, VersionCommit, VersionId,
};

#[derive(Debug, Default)]
struct ProjectState {
    versions: Vec<DocumentVersion>,
    baseline: Option<BaselineHead>,
    provenance: Vec<ProvenanceRecord>,
}

impl ProjectState {
    fn head(&self) -> Option<VersionId> {
        self.baseline.as_ref().map(|head| head.version_id)
    }

    fn latest_version_time(&self) -> Option<u64> {
        self.versions.last().map(|v| v.created_at)
    }

    fn latest_provenance_time(&self) -> Option<u64> {
        self.provenance.iter().map(|r| r.created_at).max()
    }

    fn is_empty(&self) -> bool {
        self.versions.is_empty() && self.provenance.is_empty()
    }
}

/// Process-local store with the same rules as [`SqliteStore`](crate::SqliteStore)
///
/// Nothing survives the process. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: Mutex<BTreeMap<ProjectId, ProjectState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn projects(&self) -> Result<MutexGuard<'_, BTreeMap<ProjectId, ProjectState>>, StoreError> {
        self.projects
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }
}

fn is_under(path: &FieldPath, prefix: &FieldPath) -> bool {
    path.segments().starts_with(prefix.segments())
}

impl ProjectStore for MemoryStore {
    type Error = StoreError;

    fn get_baseline(&self, project: &ProjectId) -> Result<Option<ExtractedRecord>, Self::Error> {
        Ok(self
            .projects()?
            .get(project)
            .and_then(|state| state.baseline.as_ref().map(|head| head.record.clone())))
    }

    fn get_head(&self, project: &ProjectId) -> Result<Option<BaselineHead>, Self::Error> {
        Ok(self
            .projects()?
            .get(project)
            .and_then(|state| state.baseline.clone()))
    }

    fn put_baseline(&self, commit: VersionCommit) -> Result<(), Self::Error> {
        let VersionCommit {
            version,
            baseline,
            provenance,
            expected_head,
        } = commit;
        let project = version.project_id.clone();

        if let Some(stray) = provenance.iter().find(|r| r.project_id != project) {
            return Err(StoreError::InvalidData(format!(
                "Provenance for project '{}' in a commit for '{}'",
                stray.project_id, project
            )));
        }

        let mut projects = self.projects()?;
        let state = projects.entry(project.clone()).or_default();

        if state.head() != expected_head {
            return Err(StoreError::conflict(&project, expected_head, state.head()));
        }
        if let Some(latest) = state.latest_version_time() {
            if version.created_at <= latest {
                return Err(StoreError::OutOfOrder {
                    project: project.to_string(),
                    created_at: version.created_at,
                    latest,
                });
            }
        }
        if state
            .versions
            .iter()
            .any(|v| v.content_hash == version.content_hash)
        {
            return Err(StoreError::Duplicate {
                project: project.to_string(),
                content_hash: version.content_hash,
            });
        }

        state.baseline = Some(BaselineHead {
            version_id: version.id,
            record: baseline,
        });
        state.versions.push(version);
        state.provenance.extend(provenance);
        Ok(())
    }

    fn append_provenance(&self, records: &[ProvenanceRecord]) -> Result<(), Self::Error> {
        let mut projects = self.projects()?;

        // Validate the whole batch first so a rejection writes nothing
        let mut latest: BTreeMap<&ProjectId, u64> = BTreeMap::new();
        for record in records {
            let current = match latest.get(&record.project_id) {
                Some(t) => Some(*t),
                None => projects
                    .get(&record.project_id)
                    .and_then(ProjectState::latest_provenance_time),
            };
            if let Some(current) = current {
                if record.created_at < current {
                    return Err(StoreError::OutOfOrder {
                        project: record.project_id.to_string(),
                        created_at: record.created_at,
                        latest: current,
                    });
                }
            }
            latest.insert(&record.project_id, record.created_at);
        }

        for record in records {
            projects
                .entry(record.project_id.clone())
                .or_default()
                .provenance
                .push(record.clone());
        }
        Ok(())
    }

    fn list_versions(&self, project: &ProjectId) -> Result<Vec<DocumentVersion>, Self::Error> {
        Ok(self
            .projects()?
            .get(project)
            .map(|state| state.versions.clone())
            .unwrap_or_default())
    }

    fn section_history(
        &self,
        project: &ProjectId,
        path: &FieldPath,
    ) -> Result<Vec<ProvenanceRecord>, Self::Error> {
        let projects = self.projects()?;
        let mut records: Vec<ProvenanceRecord> = projects
            .get(project)
            .map(|state| {
                state
                    .provenance
                    .iter()
                    .filter(|r| is_under(&r.section_path, path))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // Stable sort keeps insertion order among equal timestamps
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    fn find_version_by_hash(
        &self,
        project: &ProjectId,
        content_hash: &str,
    ) -> Result<Option<DocumentVersion>, Self::Error> {
        Ok(self.projects()?.get(project).and_then(|state| {
            state
                .versions
                .iter()
                .find(|v| v.content_hash == content_hash)
                .cloned()
        }))
    }

    fn list_projects(&self) -> Result<Vec<ProjectId>, Self::Error> {
        Ok(self
            .projects()?
            .iter()
            .filter(|(_, state)| !state.is_empty())
            .map(|(id, _)| id.clone())
            .collect())
    }

    fn delete_project(&self, project: &ProjectId) -> Result<usize, Self::Error> {
        Ok(self
            .projects()?
            .remove(project)
            .map(|state| state.versions.len())
            .unwrap_or(0))
    }
}
