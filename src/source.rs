use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::AtlasError;

/// Read-only access to the registration worksheets, one CSV document per table.
#[allow(async_fn_in_trait)]
pub trait TableSource {
    /// Identifier used in logs and error messages.
    fn source_id(&self) -> String;

    async fn fetch_table(&self, table: &str) -> Result<String, AtlasError>;
}

/// Published Google spreadsheet read through its CSV export endpoint.
pub struct SheetSource {
    sheet_id: String,
    client: reqwest::Client,
}

impl SheetSource {
    pub fn new(sheet_id: impl Into<String>) -> Result<Self, AtlasError> {
        let sheet_id = sheet_id.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| AtlasError::SourceUnavailable {
                source_id: sheet_id.clone(),
                reason: format!("failed to build http client: {err}"),
            })?;
        Ok(Self { sheet_id, client })
    }

    pub fn export_url(&self, table: &str) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}/gviz/tq?tqx=out:csv&sheet={}",
            self.sheet_id,
            urlencoding::encode(table)
        )
    }
}

impl TableSource for SheetSource {
    fn source_id(&self) -> String {
        self.sheet_id.clone()
    }

    async fn fetch_table(&self, table: &str) -> Result<String, AtlasError> {
        let url = self.export_url(table);
        debug!(%url, "fetching worksheet");
        let unavailable = |reason: String| AtlasError::SourceUnavailable {
            source_id: self.sheet_id.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| unavailable(format!("request for '{table}' failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("worksheet '{table}' returned {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if !is_csv_content_type(content_type.as_deref()) {
            return Err(unavailable(format!(
                "worksheet '{table}' returned {} instead of csv; is the sheet published?",
                content_type.as_deref().unwrap_or("no content type")
            )));
        }

        response
            .text()
            .await
            .map_err(|err| unavailable(format!("worksheet '{table}' body unreadable: {err}")))
    }
}

/// The export endpoint answers `text/csv`; a private sheet answers 200 with an
/// HTML sign-in page instead.
pub fn is_csv_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("text/csv"))
        .unwrap_or(false)
}

/// Local CSV exports named `<table>.csv` inside one directory.
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TableSource for DirectorySource {
    fn source_id(&self) -> String {
        self.dir.display().to_string()
    }

    async fn fetch_table(&self, table: &str) -> Result<String, AtlasError> {
        let path = self.dir.join(format!("{table}.csv"));
        debug!(path = %path.display(), "reading worksheet export");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| AtlasError::SourceUnavailable {
                source_id: self.source_id(),
                reason: format!("{}: {err}", path.display()),
            })
    }
}

#[cfg(test)]
pub struct MemorySource {
    pub tables: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl MemorySource {
    pub fn new(volunteers: &str, requests: &str) -> Self {
        let mut tables = std::collections::HashMap::new();
        tables.insert("Volunteers".to_string(), volunteers.to_string());
        tables.insert("Requests".to_string(), requests.to_string());
        Self { tables }
    }
}

#[cfg(test)]
impl TableSource for MemorySource {
    fn source_id(&self) -> String {
        "memory".to_string()
    }

    async fn fetch_table(&self, table: &str) -> Result<String, AtlasError> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| AtlasError::SourceUnavailable {
                source_id: self.source_id(),
                reason: format!("no table '{table}'"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_url_encodes_sheet_title() {
        let source = SheetSource::new("abc123").unwrap();
        assert_eq!(
            source.export_url("Form Responses 1"),
            "https://docs.google.com/spreadsheets/d/abc123/gviz/tq?tqx=out:csv&sheet=Form%20Responses%201"
        );
    }

    #[test]
    fn only_csv_responses_are_accepted() {
        assert!(is_csv_content_type(Some("text/csv; charset=utf-8")));
        assert!(is_csv_content_type(Some("TEXT/CSV")));
        assert!(!is_csv_content_type(Some("text/html; charset=utf-8")));
        assert!(!is_csv_content_type(None));
    }

    #[tokio::test]
    async fn missing_export_file_is_source_unavailable() {
        let dir = std::env::temp_dir().join("volunteer-atlas-missing-dir");
        let source = DirectorySource::new(&dir);
        let err = source.fetch_table("Volunteers").await.unwrap_err();
        assert!(err.is_source_unavailable());
    }

    #[tokio::test]
    async fn reads_export_file_from_directory() {
        let dir = std::env::temp_dir().join(format!("volunteer-atlas-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Requests.csv"), "Given Name\nSam\n").unwrap();

        let source = DirectorySource::new(&dir);
        let body = source.fetch_table("Requests").await.unwrap();
        assert_eq!(body, "Given Name\nSam\n");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
