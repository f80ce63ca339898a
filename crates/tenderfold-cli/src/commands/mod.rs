//! Command implementations.

pub mod baseline;
pub mod config;
pub mod delete;
pub mod history;
pub mod ingest;
pub mod projects;
pub mod rebuild;
pub mod versions;

pub use self::baseline::execute_baseline;
pub use self::config::execute_config;
pub use self::delete::execute_delete;
pub use self::history::execute_history;
pub use self::ingest::{execute_ingest, ingest_document};
pub use self::projects::execute_projects;
pub use self::rebuild::{check_baseline, execute_rebuild};
pub use self::versions::execute_versions;
