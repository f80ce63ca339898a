//! SQLite implementation of `ProjectStore`

use crate::StoreError;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tenderfold_domain::{
    BaselineHead, DocumentVersion, ExtractedRecord, FieldPath, ProjectId, ProjectStore,
    ProvenanceRecord, VersionCommit, VersionId, VersionKind,
};
use tracing::{debug, info};

const VERSION_COLUMNS: &str = "id, project_id, content_hash, kind, created_at, source_file, record";

const PROVENANCE_COLUMNS: &str =
    "project_id, document_id, section_path, content, source_kind, source_file, created_at";

/// SQLite-based implementation of `ProjectStore`
///
/// The connection sits behind a mutex, so one store can be shared by
/// concurrent ingestions.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tenderfold_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("tenderfold.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Number of provenance records stored for a project
    pub fn provenance_count(&self, project: &ProjectId) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM provenance WHERE project_id = ?1",
            params![project.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn version_id_to_bytes(id: VersionId) -> Vec<u8> {
    id.value().to_be_bytes().to_vec()
}

fn bytes_to_version_id(bytes: &[u8]) -> Result<VersionId, StoreError> {
    let arr: [u8; 16] = bytes.try_into().map_err(|_| {
        StoreError::InvalidData(format!(
            "Expected 16 bytes for VersionId, got {}",
            bytes.len()
        ))
    })?;
    Ok(VersionId::from_value(u128::from_be_bytes(arr)))
}

fn conversion_error(column: usize, ty: Type, error: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, ty, Box::new(error))
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentVersion> {
    let id_bytes: Vec<u8> = row.get(0)?;
    let id = bytes_to_version_id(&id_bytes).map_err(|e| conversion_error(0, Type::Blob, e))?;

    let kind: String = row.get(3)?;
    let kind = kind
        .parse::<VersionKind>()
        .map_err(|e| conversion_error(3, Type::Text, StoreError::InvalidData(e)))?;

    let record: String = row.get(6)?;
    let record = ExtractedRecord::from_json_str(&record)
        .map_err(|e| conversion_error(6, Type::Text, StoreError::InvalidData(e)))?;

    Ok(DocumentVersion {
        id,
        project_id: ProjectId::new(row.get::<_, String>(1)?),
        content_hash: row.get(2)?,
        kind,
        created_at: row.get::<_, i64>(4)? as u64,
        source_file: row.get(5)?,
        record,
    })
}

fn provenance_from_row(row: &Row<'_>) -> rusqlite::Result<ProvenanceRecord> {
    let document_bytes: Vec<u8> = row.get(1)?;
    let document_id =
        bytes_to_version_id(&document_bytes).map_err(|e| conversion_error(1, Type::Blob, e))?;

    let section: String = row.get(2)?;
    let section_path = FieldPath::parse(&section)
        .map_err(|e| conversion_error(2, Type::Text, StoreError::InvalidData(e)))?;

    let kind: String = row.get(4)?;
    let source_kind = kind
        .parse::<VersionKind>()
        .map_err(|e| conversion_error(4, Type::Text, StoreError::InvalidData(e)))?;

    Ok(ProvenanceRecord {
        project_id: ProjectId::new(row.get::<_, String>(0)?),
        document_id,
        section_path,
        content: row.get(3)?,
        source_kind,
        source_file: row.get(5)?,
        created_at: row.get::<_, i64>(6)? as u64,
    })
}

fn insert_provenance(tx: &Transaction<'_>, records: &[ProvenanceRecord]) -> Result<(), StoreError> {
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO provenance ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        PROVENANCE_COLUMNS
    ))?;
    for record in records {
        stmt.execute(params![
            record.project_id.as_str(),
            version_id_to_bytes(record.document_id),
            record.section_path.to_string(),
            &record.content,
            record.source_kind.as_str(),
            &record.source_file,
            record.created_at as i64,
        ])?;
    }
    Ok(())
}

fn head_version(tx: &Transaction<'_>, project: &ProjectId) -> Result<Option<VersionId>, StoreError> {
    let head: Option<Vec<u8>> = tx
        .query_row(
            "SELECT version_id FROM baselines WHERE project_id = ?1",
            params![project.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    head.map(|bytes| bytes_to_version_id(&bytes)).transpose()
}

fn latest_version_time(tx: &Transaction<'_>, project: &ProjectId) -> Result<Option<u64>, StoreError> {
    let latest: Option<i64> = tx.query_row(
        "SELECT MAX(created_at) FROM versions WHERE project_id = ?1",
        params![project.as_str()],
        |row| row.get(0),
    )?;
    Ok(latest.map(|t| t as u64))
}

fn latest_provenance_time(
    tx: &Transaction<'_>,
    project: &ProjectId,
) -> Result<Option<u64>, StoreError> {
    let latest: Option<i64> = tx.query_row(
        "SELECT MAX(created_at) FROM provenance WHERE project_id = ?1",
        params![project.as_str()],
        |row| row.get(0),
    )?;
    Ok(latest.map(|t| t as u64))
}

/// Every record must belong to `project`
fn check_project(records: &[ProvenanceRecord], project: &ProjectId) -> Result<(), StoreError> {
    match records.iter().find(|r| r.project_id != *project) {
        Some(stray) => Err(StoreError::InvalidData(format!(
            "Provenance for project '{}' in a commit for '{}'",
            stray.project_id, project
        ))),
        None => Ok(()),
    }
}

impl ProjectStore for SqliteStore {
    type Error = StoreError;

    fn get_baseline(&self, project: &ProjectId) -> Result<Option<ExtractedRecord>, Self::Error> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT record FROM baselines WHERE project_id = ?1",
                params![project.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        json.map(|json| ExtractedRecord::from_json_str(&json).map_err(StoreError::InvalidData))
            .transpose()
    }

    fn get_head(&self, project: &ProjectId) -> Result<Option<BaselineHead>, Self::Error> {
        let conn = self.conn()?;
        let row: Option<(Vec<u8>, String)> = conn
            .query_row(
                "SELECT version_id, record FROM baselines WHERE project_id = ?1",
                params![project.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(id_bytes, json)| -> Result<BaselineHead, StoreError> {
            Ok(BaselineHead {
                version_id: bytes_to_version_id(&id_bytes)?,
                record: ExtractedRecord::from_json_str(&json).map_err(StoreError::InvalidData)?,
            })
        })
        .transpose()
    }

    fn put_baseline(&self, commit: VersionCommit) -> Result<(), Self::Error> {
        let VersionCommit {
            version,
            baseline,
            provenance,
            expected_head,
        } = commit;
        let project = &version.project_id;
        check_project(&provenance, project)?;

        let mut conn = self.conn()?;
        // Head check and write run under the database write lock
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let head = head_version(&tx, project)?;
        if head != expected_head {
            return Err(StoreError::conflict(project, expected_head, head));
        }

        if let Some(latest) = latest_version_time(&tx, project)? {
            if version.created_at <= latest {
                return Err(StoreError::OutOfOrder {
                    project: project.to_string(),
                    created_at: version.created_at,
                    latest,
                });
            }
        }

        let duplicate: bool = tx
            .query_row(
                "SELECT 1 FROM versions WHERE project_id = ?1 AND content_hash = ?2",
                params![project.as_str(), &version.content_hash],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if duplicate {
            return Err(StoreError::Duplicate {
                project: project.to_string(),
                content_hash: version.content_hash.clone(),
            });
        }

        let id_bytes = version_id_to_bytes(version.id);
        tx.execute(
            &format!(
                "INSERT INTO versions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                VERSION_COLUMNS
            ),
            params![
                &id_bytes,
                project.as_str(),
                &version.content_hash,
                version.kind.as_str(),
                version.created_at as i64,
                &version.source_file,
                version.record.to_json_string(),
            ],
        )?;

        tx.execute(
            "INSERT INTO baselines (project_id, version_id, record, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(project_id) DO UPDATE SET
             version_id = excluded.version_id, record = excluded.record, updated_at = excluded.updated_at",
            params![
                project.as_str(),
                &id_bytes,
                baseline.to_json_string(),
                version.created_at as i64,
            ],
        )?;

        insert_provenance(&tx, &provenance)?;
        tx.commit()?;

        info!(
            "Stored version {} of project '{}' with {} provenance records",
            version.id,
            project,
            provenance.len()
        );
        Ok(())
    }

    fn append_provenance(&self, records: &[ProvenanceRecord]) -> Result<(), Self::Error> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for record in records {
            if let Some(latest) = latest_provenance_time(&tx, &record.project_id)? {
                if record.created_at < latest {
                    return Err(StoreError::OutOfOrder {
                        project: record.project_id.to_string(),
                        created_at: record.created_at,
                        latest,
                    });
                }
            }
            insert_provenance(&tx, std::slice::from_ref(record))?;
        }

        tx.commit()?;
        debug!("Appended {} provenance records", records.len());
        Ok(())
    }

    fn list_versions(&self, project: &ProjectId) -> Result<Vec<DocumentVersion>, Self::Error> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM versions WHERE project_id = ?1 ORDER BY created_at, id",
            VERSION_COLUMNS
        ))?;
        let versions = stmt
            .query_map(params![project.as_str()], version_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(versions)
    }

    fn section_history(
        &self,
        project: &ProjectId,
        path: &FieldPath,
    ) -> Result<Vec<ProvenanceRecord>, Self::Error> {
        let conn = self.conn()?;
        let prefix = path.to_string();
        // Prefix compared with substr so '_' and '%' in keys stay literal
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM provenance
             WHERE project_id = ?1
               AND (?2 = '' OR section_path = ?2
                    OR substr(section_path, 1, length(?2) + 1) = ?2 || '.')
             ORDER BY created_at, seq",
            PROVENANCE_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![project.as_str(), prefix], provenance_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn find_version_by_hash(
        &self,
        project: &ProjectId,
        content_hash: &str,
    ) -> Result<Option<DocumentVersion>, Self::Error> {
        let conn = self.conn()?;
        let version = conn
            .query_row(
                &format!(
                    "SELECT {} FROM versions WHERE project_id = ?1 AND content_hash = ?2",
                    VERSION_COLUMNS
                ),
                params![project.as_str(), content_hash],
                version_from_row,
            )
            .optional()?;
        Ok(version)
    }

    fn list_projects(&self) -> Result<Vec<ProjectId>, Self::Error> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT project_id FROM versions
             UNION SELECT project_id FROM provenance
             ORDER BY project_id",
        )?;
        let projects = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|id| id.map(ProjectId::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    fn delete_project(&self, project: &ProjectId) -> Result<usize, Self::Error> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let facts = tx.execute(
            "DELETE FROM provenance WHERE project_id = ?1",
            params![project.as_str()],
        )?;
        tx.execute(
            "DELETE FROM baselines WHERE project_id = ?1",
            params![project.as_str()],
        )?;
        let versions = tx.execute(
            "DELETE FROM versions WHERE project_id = ?1",
            params![project.as_str()],
        )?;
        tx.commit()?;

        info!(
            "Deleted project '{}': {} versions, {} provenance records",
            project, versions, facts
        );
        Ok(versions)
    }
}
