use async_trait::async_trait;

use crate::error::StoreError;

/// Row-oriented spreadsheet backend.
///
/// Ranges use A1 notation (`'Sheet'!A:K`); row numbers are 1-based like the sheet UI.
#[async_trait]
pub trait SpreadsheetStore: Send + Sync {
    async fn append_row(&self, container_id: &str, sheet: &str, row: &[String]) -> Result<(), StoreError>;

    async fn read_range(&self, container_id: &str, range: &str) -> Result<Vec<Vec<String>>, StoreError>;

    async fn list_sheet_names(&self, container_id: &str) -> Result<Vec<String>, StoreError>;

    /// Create the sheet if missing. Returns `true` when it had to be created.
    async fn ensure_sheet_exists(&self, container_id: &str, sheet: &str) -> Result<bool, StoreError>;

    /// Overwrite one row starting at column A
    async fn update_row(
        &self,
        container_id: &str,
        sheet: &str,
        row_number: usize,
        row: &[String],
    ) -> Result<(), StoreError>;
}
