/// 結果表唯一的欄位名稱
pub const PHONE_NUMBER_COLUMN: &str = "Phone Number";

/// 試算表下載用的媒體類型
pub const TABLE_MEDIA_TYPE: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    /// 依副檔名（`png`、`jpg`、`jpeg`，不分大小寫）判斷宣告的格式
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }
}

/// 批次中的一張圖片，編碼後即丟棄
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub name: String,
    pub bytes: Vec<u8>,
    pub declared_format: Option<ImageFormat>,
    /// 讀取失敗的原因（例如壓縮檔內的損毀項目）
    pub read_error: Option<String>,
}

impl ImageInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let declared_format = std::path::Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageFormat::from_extension);
        Self {
            name,
            bytes,
            declared_format,
            read_error: None,
        }
    }

    /// 無法讀取的圖片，交由批次處理記錄為失敗
    pub fn unreadable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut input = Self::new(name, Vec::new());
        input.read_error = Some(reason.into());
        input
    }
}

/// 送給視覺模型的單輪請求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub model: String,
    pub instruction: String,
    pub image_data_uri: String,
}

#[derive(Debug)]
pub struct ImageFailure {
    pub image: String,
    pub error: crate::utils::error::PhoneExtractError,
}

/// 批次結果：依序排列的號碼與每張圖片的失敗紀錄
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<String>,
    pub failures: Vec<ImageFailure>,
    pub images_processed: usize,
}

impl BatchOutcome {
    pub fn has_records(&self) -> bool {
        !self.records.is_empty()
    }

    /// 每一張圖片都失敗
    pub fn all_failed(&self) -> bool {
        self.images_processed > 0 && self.failures.len() == self.images_processed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    pub rows: Vec<String>,
}

impl ResultTable {
    pub fn new(rows: Vec<String>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 以 CSV 格式（含標題列）輸出完整表格
    pub fn to_csv_bytes(&self) -> crate::utils::error::Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([PHONE_NUMBER_COLUMN])?;
        for row in &self.rows {
            writer.write_record([row])?;
        }
        writer.into_inner().map_err(|e| e.into_error().into())
    }
}

/// 提供使用者下載的結果檔
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableArtifact {
    pub path: String,
    pub file_name: String,
    pub media_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct SavedTable {
    pub table: ResultTable,
    pub artifact: TableArtifact,
    pub appended: usize,
}

#[derive(Debug)]
pub struct RunReport {
    pub outcome: BatchOutcome,
    pub saved: Option<SavedTable>,
    pub save_error: Option<crate::utils::error::PhoneExtractError>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failure_exit_code().is_none()
    }

    /// 儲存失敗或所有圖片皆失敗時的退出碼
    pub fn failure_exit_code(&self) -> Option<i32> {
        if let Some(e) = &self.save_error {
            return Some(e.exit_code().max(1));
        }
        if self.outcome.all_failed() {
            return self
                .outcome
                .failures
                .first()
                .map(|failure| failure.error.exit_code().max(1));
        }
        None
    }
}
