use thiserror::Error;

/// Failures surfaced by the atlas pipeline stages.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("table '{table}', record {record}: field '{field}' has malformed value '{value}'")]
    MalformedField {
        table: String,
        record: u64,
        field: &'static str,
        value: String,
    },
    #[error("table '{table}', record {record}: missing required field '{field}'")]
    MissingField {
        table: &'static str,
        record: u64,
        field: &'static str,
    },
    #[error("spreadsheet source '{source_id}' is unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },
}

impl AtlasError {
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, AtlasError::SourceUnavailable { .. })
    }
}
