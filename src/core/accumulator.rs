use crate::domain::model::{
    ResultTable, SavedTable, TableArtifact, PHONE_NUMBER_COLUMN, TABLE_MEDIA_TYPE,
};
use crate::domain::ports::Storage;
use crate::utils::error::{PhoneExtractError, Result};
use std::collections::HashSet;

/// 解析已儲存的單欄結果表
pub fn parse_table(path: &str, data: &[u8]) -> Result<ResultTable> {
    let corrupt = |reason: String| PhoneExtractError::CorruptExistingTable {
        path: path.to_string(),
        reason,
    };

    if data.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(ResultTable::default());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| corrupt(format!("unreadable header: {}", e)))?
        .clone();
    if headers.len() != 1 || headers.get(0).map(str::trim) != Some(PHONE_NUMBER_COLUMN) {
        return Err(corrupt(format!(
            "expected the single column '{}', found {:?}",
            PHONE_NUMBER_COLUMN,
            headers.iter().collect::<Vec<_>>()
        )));
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| corrupt(format!("row {}: {}", line + 1, e)))?;
        if record.len() != 1 {
            return Err(corrupt(format!(
                "row {} has {} fields, expected 1",
                line + 1,
                record.len()
            )));
        }
        rows.push(record[0].to_string());
    }

    Ok(ResultTable::new(rows))
}

fn encode_rows(rows: &[String]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record([row])?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// 將新擷取的號碼附加到結果表
pub struct Accumulator<S: Storage> {
    storage: S,
    deduplicate: bool,
}

impl<S: Storage> Accumulator<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            deduplicate: false,
        }
    }

    pub fn with_deduplication(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    async fn load_existing(&self, table_path: &str) -> Result<Option<(ResultTable, Vec<u8>)>> {
        if !self.storage.exists(table_path).await? {
            return Ok(None);
        }
        let data = self.storage.read_file(table_path).await?;
        let table = parse_table(&self.storage.display_path(table_path), &data)?;
        Ok(Some((table, data)))
    }

    /// 既有資料列之後接上 `new_records`。檔案已是有效表格時只附加新列，否則整份重寫
    pub async fn merge(&self, table_path: &str, new_records: &[String]) -> Result<SavedTable> {
        let existing = self.load_existing(table_path).await?;

        let (mut table, raw) = match existing {
            Some((table, raw)) => {
                tracing::debug!("Loaded {} existing rows from {}", table.len(), table_path);
                (table, Some(raw))
            }
            None => {
                tracing::info!("📄 No table at {}, starting a new one", table_path);
                (ResultTable::default(), None)
            }
        };

        let to_append: Vec<String> = if self.deduplicate {
            let mut seen: HashSet<&str> = table.rows.iter().map(String::as_str).collect();
            new_records
                .iter()
                .filter(|record| seen.insert(record.as_str()))
                .cloned()
                .collect()
        } else {
            new_records.to_vec()
        };

        let has_header = raw
            .as_ref()
            .map(|data| !data.iter().all(|b| b.is_ascii_whitespace()))
            .unwrap_or(false);

        if has_header && to_append.is_empty() {
            tracing::debug!("Nothing new to append to {}", table_path);
        } else if has_header {
            let mut chunk = Vec::new();
            // 舊檔最後一行沒有換行時先補上
            if raw.as_ref().and_then(|data| data.last()) != Some(&b'\n') {
                chunk.push(b'\n');
            }
            chunk.extend(encode_rows(&to_append)?);
            self.storage.append_file(table_path, &chunk).await?;
            table.rows.extend(to_append.iter().cloned());
        } else {
            table.rows.extend(to_append.iter().cloned());
            self.storage
                .write_file(table_path, &table.to_csv_bytes()?)
                .await?;
        }

        tracing::info!(
            "💾 Appended {} rows to {} ({} total)",
            to_append.len(),
            table_path,
            table.len()
        );

        let file_name = std::path::Path::new(table_path)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(table_path)
            .to_string();

        Ok(SavedTable {
            table,
            artifact: TableArtifact {
                path: self.storage.display_path(table_path),
                file_name,
                media_type: TABLE_MEDIA_TYPE,
            },
            appended: to_append.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put(&self, path: &str, data: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<String> {
            let files = self.files.lock().await;
            files
                .get(path)
                .map(|data| String::from_utf8(data.clone()).unwrap())
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                PhoneExtractError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn append_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files
                .entry(path.to_string())
                .or_default()
                .extend_from_slice(data);
            Ok(())
        }

        async fn exists(&self, path: &str) -> Result<bool> {
            Ok(self.files.lock().await.contains_key(path))
        }

        fn display_path(&self, path: &str) -> String {
            format!("mem://{}", path)
        }
    }

    fn records(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_merge_on_missing_table_creates_it() {
        let storage = MockStorage::new();
        let accumulator = Accumulator::new(storage.clone());

        let saved = accumulator
            .merge("phones.csv", &records(&["555-1234", "555-9876"]))
            .await
            .unwrap();

        assert_eq!(saved.table.rows, records(&["555-1234", "555-9876"]));
        assert_eq!(saved.appended, 2);
        assert_eq!(
            storage.get_file("phones.csv").await.unwrap(),
            "Phone Number\n555-1234\n555-9876\n"
        );
        assert_eq!(saved.artifact.path, "mem://phones.csv");
        assert_eq!(saved.artifact.file_name, "phones.csv");
        assert_eq!(saved.artifact.media_type, "text/csv");
    }

    #[tokio::test]
    async fn test_missing_table_equals_empty_table() {
        let missing = MockStorage::new();
        let empty = MockStorage::new();
        empty.put("phones.csv", "Phone Number\n").await;

        let new = records(&["1", "2"]);
        let from_missing = Accumulator::new(missing.clone())
            .merge("phones.csv", &new)
            .await
            .unwrap();
        let from_empty = Accumulator::new(empty.clone())
            .merge("phones.csv", &new)
            .await
            .unwrap();

        assert_eq!(from_missing.table, from_empty.table);
        assert_eq!(
            missing.get_file("phones.csv").await,
            empty.get_file("phones.csv").await
        );
    }

    #[tokio::test]
    async fn test_merge_law_is_append_only() {
        let storage = MockStorage::new();
        storage
            .put("phones.csv", "Phone Number\nold-1\nold-2\n")
            .await;
        let accumulator = Accumulator::new(storage.clone());

        let first = records(&["a", "b"]);
        let second = records(&["b", "c"]);
        accumulator.merge("phones.csv", &first).await.unwrap();
        let saved = accumulator.merge("phones.csv", &second).await.unwrap();

        let expected = records(&["old-1", "old-2", "a", "b", "b", "c"]);
        assert_eq!(saved.table.rows, expected);

        let reloaded = parse_table(
            "phones.csv",
            storage.get_file("phones.csv").await.unwrap().as_bytes(),
        )
        .unwrap();
        assert_eq!(reloaded.rows, expected);
    }

    #[tokio::test]
    async fn test_append_repairs_missing_trailing_newline() {
        let storage = MockStorage::new();
        storage.put("phones.csv", "Phone Number\nold").await;

        Accumulator::new(storage.clone())
            .merge("phones.csv", &records(&["new"]))
            .await
            .unwrap();

        assert_eq!(
            storage.get_file("phones.csv").await.unwrap(),
            "Phone Number\nold\nnew\n"
        );
    }

    #[tokio::test]
    async fn test_zero_byte_table_is_rewritten_with_header() {
        let storage = MockStorage::new();
        storage.put("phones.csv", "").await;

        Accumulator::new(storage.clone())
            .merge("phones.csv", &records(&["42"]))
            .await
            .unwrap();

        assert_eq!(
            storage.get_file("phones.csv").await.unwrap(),
            "Phone Number\n42\n"
        );
    }

    #[tokio::test]
    async fn test_corrupt_table_is_rejected_and_left_untouched() {
        let storage = MockStorage::new();
        storage.put("phones.csv", "Name,Email\nbob,b@x.org\n").await;

        let err = Accumulator::new(storage.clone())
            .merge("phones.csv", &records(&["1"]))
            .await
            .unwrap_err();

        assert!(matches!(err, PhoneExtractError::CorruptExistingTable { .. }));
        assert_eq!(
            storage.get_file("phones.csv").await.unwrap(),
            "Name,Email\nbob,b@x.org\n"
        );
    }

    #[test]
    fn test_parse_table_rejects_extra_fields() {
        let err = parse_table("t.csv", b"Phone Number\n555,extra\n").unwrap_err();
        assert!(matches!(err, PhoneExtractError::CorruptExistingTable { .. }));
    }

    #[test]
    fn test_parse_table_rejects_invalid_utf8() {
        let err = parse_table("t.csv", b"Phone Number\n\xff\xfe\n").unwrap_err();
        assert!(matches!(err, PhoneExtractError::CorruptExistingTable { .. }));
    }

    #[tokio::test]
    async fn test_deduplicate_skips_known_numbers() {
        let storage = MockStorage::new();
        storage.put("phones.csv", "Phone Number\n555-1234\n").await;

        let saved = Accumulator::new(storage.clone())
            .with_deduplication(true)
            .merge("phones.csv", &records(&["555-1234", "555-0000", "555-0000"]))
            .await
            .unwrap();

        assert_eq!(saved.appended, 1);
        assert_eq!(saved.table.rows, records(&["555-1234", "555-0000"]));
    }
}
