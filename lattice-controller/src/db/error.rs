use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Store error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("schemaVersion missing from Config table (init failure?)")]
    SchemaVersionMissing,

    #[error("Schema version mismatch: database has {found}, this build expects {expected}")]
    SchemaVersionMismatch { found: String, expected: u32 },
}
