use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Malformed record: {reason}")]
    MalformedRecord { reason: String },

    #[error("Cannot parse publication timestamp '{value}'")]
    DateParseError { value: String },

    #[error("No exchange rate for currency {code} in {period}")]
    UnknownCurrency { code: String, period: String },

    #[error("Chunk '{chunk}' failed: {details}")]
    ChunkError { chunk: String, details: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Data,
    Currency,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::IoError(_) | EtlError::CsvError(_) => ErrorCategory::Io,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::ProcessingError { .. }
            | EtlError::ValidationError { .. }
            | EtlError::MalformedRecord { .. }
            | EtlError::DateParseError { .. }
            | EtlError::ChunkError { .. } => ErrorCategory::Data,
            EtlError::UnknownCurrency { .. } => ErrorCategory::Currency,
            EtlError::ZipError(_) | EtlError::SerializationError(_) => ErrorCategory::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::MalformedRecord { .. } => ErrorSeverity::Low,
            EtlError::ChunkError { .. } => ErrorSeverity::Medium,
            EtlError::IoError(_)
            | EtlError::ZipError(_)
            | EtlError::SerializationError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::IoError(_) => "檢查輸入/輸出路徑是否存在且具有讀寫權限".to_string(),
            EtlError::CsvError(_) => "確認 CSV 檔案為 UTF-8 編碼且第一列為欄位名稱".to_string(),
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "檢查命令列參數或 TOML 設定檔內容".to_string()
            }
            EtlError::DateParseError { .. } => {
                "published_at 必須符合 YYYY-MM-DDTHH:MM:SS±HHMM 格式".to_string()
            }
            EtlError::UnknownCurrency { code, .. } => {
                format!("在匯率表中加入 {} 的匯率，或改用按月份的匯率檔", code)
            }
            EtlError::ChunkError { .. } => "查看失敗的分塊檔案後重新執行".to_string(),
            EtlError::MalformedRecord { .. } | EtlError::ValidationError { .. } => {
                "檢查資料列的欄位數量與內容".to_string()
            }
            EtlError::ProcessingError { .. } => "以 --verbose 重新執行以取得更多細節".to_string(),
            EtlError::ZipError(_) | EtlError::SerializationError(_) => {
                "確認輸出目錄可寫入且磁碟空間充足".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("無法讀取資料: {}", self),
            ErrorCategory::Configuration => format!("設定錯誤: {}", self),
            ErrorCategory::Data => format!("資料處理失敗: {}", self),
            ErrorCategory::Currency => format!("貨幣換算失敗: {}", self),
            ErrorCategory::Output => format!("無法寫入報表: {}", self),
        }
    }
}

impl From<toml::de::Error> for EtlError {
    fn from(err: toml::de::Error) -> Self {
        EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", err),
        }
    }
}
