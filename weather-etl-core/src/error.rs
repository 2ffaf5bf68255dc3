//! Error taxonomy for the ETL pipeline and the read path.
//!
//! Extraction failures are scoped to one source key and absorbed inside the
//! fan-out; malformed payloads are per-record; load failures are fatal to the
//! current run but never to the next one.

use thiserror::Error;

/// All retries for one source key were exhausted.
#[derive(Debug, Error)]
#[error("extraction for \"{source_key}\" failed after {attempts} attempts")]
pub struct ExtractError {
    pub source_key: String,
    pub attempts: u32,
    #[source]
    pub cause: anyhow::Error,
}

/// The transformer could not derive a required field from a raw payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("payload is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Storage collaborator failure, on either the read or the write path.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// A bulk upsert could not be completed.
#[derive(Debug, Error)]
#[error("failed to load {count} record(s) into storage")]
pub struct LoadError {
    pub count: usize,
    #[source]
    pub cause: StoreError,
}

/// A scheduled pipeline run was aborted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),
}
