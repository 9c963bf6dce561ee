use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::store::traits::SpreadsheetStore;

type SheetKey = (String, String);

/// Process-local spreadsheet used by tests and offline runs
#[derive(Default)]
pub struct InMemorySpreadsheet {
    sheets: Mutex<BTreeMap<SheetKey, Vec<Vec<String>>>>,
    failure: Mutex<Option<StoreError>>,
}

/// Parsed A1 range: sheet name, inclusive column bounds and first row (1-based)
#[derive(Debug, PartialEq)]
struct A1Range {
    sheet: String,
    columns: Option<(usize, usize)>,
    first_row: usize,
}

fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters
        .chars()
        .try_fold(0usize, |acc, c| {
            c.is_ascii_alphabetic()
                .then(|| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1))
        })
        .map(|n| n - 1)
}

fn split_cell(cell: &str) -> (&str, Option<usize>) {
    let split = cell.find(|c: char| c.is_ascii_digit()).unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    (letters, digits.parse().ok())
}

fn parse_range(range: &str) -> A1Range {
    let (sheet, cells) = match range.rsplit_once('!') {
        Some((sheet, cells)) => (sheet, Some(cells)),
        None => (range, None),
    };
    let sheet = sheet
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .map(|s| s.replace("''", "'"))
        .unwrap_or_else(|| sheet.to_string());

    let mut parsed = A1Range {
        sheet,
        columns: None,
        first_row: 1,
    };

    if let Some(cells) = cells {
        let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
        let (start_col, start_row) = split_cell(start);
        let (end_col, _) = split_cell(end);
        if let (Some(first), Some(last)) = (column_index(start_col), column_index(end_col)) {
            parsed.columns = Some((first, last));
        }
        parsed.first_row = start_row.unwrap_or(1).max(1);
    }
    parsed
}

impl InMemorySpreadsheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a sheet
    pub fn with_sheet(self, container_id: &str, sheet: &str, rows: Vec<Vec<String>>) -> Self {
        self.sheets()
            .insert((container_id.to_string(), sheet.to_string()), rows);
        self
    }

    /// Make every following call fail with `error` until [`clear_failure`](Self::clear_failure)
    pub fn fail_with(&self, error: StoreError) {
        *self.failure.lock().unwrap_or_else(|p| p.into_inner()) = Some(error);
    }

    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }

    /// Snapshot of a sheet's rows (empty if it doesn't exist)
    pub fn rows(&self, container_id: &str, sheet: &str) -> Vec<Vec<String>> {
        self.sheets()
            .get(&(container_id.to_string(), sheet.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn sheets(&self) -> MutexGuard<'_, BTreeMap<SheetKey, Vec<Vec<String>>>> {
        self.sheets.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        match self.failure.lock().unwrap_or_else(|p| p.into_inner()).as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SpreadsheetStore for InMemorySpreadsheet {
    async fn append_row(&self, container_id: &str, sheet: &str, row: &[String]) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut sheets = self.sheets();
        let rows = sheets
            .get_mut(&(container_id.to_string(), sheet.to_string()))
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        rows.push(row.to_vec());
        Ok(())
    }

    async fn read_range(&self, container_id: &str, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.check_failure()?;
        let parsed = parse_range(range);
        let sheets = self.sheets();
        let rows = sheets
            .get(&(container_id.to_string(), parsed.sheet.clone()))
            .ok_or_else(|| StoreError::SheetNotFound(parsed.sheet.clone()))?;

        Ok(rows
            .iter()
            .skip(parsed.first_row - 1)
            .map(|row| match parsed.columns {
                Some((first, last)) => row.iter().skip(first).take((last + 1).saturating_sub(first)).cloned().collect(),
                None => row.clone(),
            })
            .collect())
    }

    async fn list_sheet_names(&self, container_id: &str) -> Result<Vec<String>, StoreError> {
        self.check_failure()?;
        Ok(self
            .sheets()
            .keys()
            .filter(|(container, _)| container == container_id)
            .map(|(_, sheet)| sheet.clone())
            .collect())
    }

    async fn ensure_sheet_exists(&self, container_id: &str, sheet: &str) -> Result<bool, StoreError> {
        self.check_failure()?;
        let mut sheets = self.sheets();
        let key = (container_id.to_string(), sheet.to_string());
        if sheets.contains_key(&key) {
            return Ok(false);
        }
        sheets.insert(key, Vec::new());
        Ok(true)
    }

    async fn update_row(
        &self,
        container_id: &str,
        sheet: &str,
        row_number: usize,
        row: &[String],
    ) -> Result<(), StoreError> {
        self.check_failure()?;
        if row_number == 0 {
            return Err(StoreError::Backend("row numbers start at 1".to_string()));
        }
        let mut sheets = self.sheets();
        let rows = sheets
            .get_mut(&(container_id.to_string(), sheet.to_string()))
            .ok_or_else(|| StoreError::SheetNotFound(sheet.to_string()))?;
        if rows.len() < row_number {
            rows.resize(row_number, Vec::new());
        }
        rows[row_number - 1] = row.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn parses_a1_ranges() {
        assert_eq!(
            parse_range("'Bob''s'!B2:D"),
            A1Range {
                sheet: "Bob's".to_string(),
                columns: Some((1, 3)),
                first_row: 2,
            }
        );
        assert_eq!(parse_range("konecte").columns, None);
        assert_eq!(column_index("AA"), Some(26));
    }

    #[tokio::test]
    async fn append_requires_existing_sheet() {
        let store = InMemorySpreadsheet::new();
        let err = store.append_row("doc", "hoja", &row(&["a"])).await.unwrap_err();
        assert_eq!(err, StoreError::SheetNotFound("hoja".to_string()));

        assert!(store.ensure_sheet_exists("doc", "hoja").await.unwrap());
        assert!(!store.ensure_sheet_exists("doc", "hoja").await.unwrap());
        store.append_row("doc", "hoja", &row(&["a", "b", "c"])).await.unwrap();
        assert_eq!(store.list_sheet_names("doc").await.unwrap(), vec!["hoja"]);
    }

    #[tokio::test]
    async fn read_range_slices_rows_and_columns() {
        let store = InMemorySpreadsheet::new().with_sheet(
            "doc",
            "hoja",
            vec![row(&["h1", "h2", "h3"]), row(&["a", "b", "c"]), row(&["d"])],
        );
        let values = store.read_range("doc", "'hoja'!B2:C").await.unwrap();
        assert_eq!(values, vec![row(&["b", "c"]), row(&[])]);
    }

    #[tokio::test]
    async fn injected_failures_surface_on_every_call() {
        let store = InMemorySpreadsheet::new();
        store.fail_with(StoreError::Permission("403".into()));
        assert!(store.list_sheet_names("doc").await.unwrap_err().is_permission());
        store.clear_failure();
        assert!(store.list_sheet_names("doc").await.is_ok());
    }

    #[tokio::test]
    async fn update_row_overwrites_in_place() {
        let store = InMemorySpreadsheet::new().with_sheet("doc", "hoja", vec![row(&["x"]), row(&["y"])]);
        store.update_row("doc", "hoja", 2, &row(&["z"])).await.unwrap();
        assert_eq!(store.rows("doc", "hoja"), vec![row(&["x"]), row(&["z"])]);
    }
}
