use thiserror::Error;

#[derive(Error, Debug)]
pub enum TarotError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

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

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Catalog error: {message}")]
    CatalogError { message: String },

    #[error("Unknown formation: {name}")]
    UnknownFormation { name: String },

    #[error("Unknown card pool: {scope}")]
    UnknownPool { scope: String },

    #[error("Card pool '{scope}' is empty")]
    EmptyPool { scope: String },

    #[error("Formation '{formation}' needs {required} cards but the pool only has {available}")]
    InsufficientPool {
        formation: String,
        required: usize,
        available: usize,
    },

    #[error("Card not found in catalog: {card_id}")]
    CardNotFound { card_id: String },

    #[error("Transient fetch failure: {message}")]
    FetchTransient { message: String },

    #[error("Image integrity check failed: {path}")]
    IntegrityError { path: String },

    #[error("Download failed after {attempts} attempts: {url}")]
    FetchExhausted { url: String, attempts: u32 },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 請求參數錯誤，不重試
    Validation,
    /// 網路或資料完整性問題
    Fetch,
    Configuration,
    System,
}

impl TarotError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TarotError::UnknownFormation { .. }
            | TarotError::UnknownPool { .. }
            | TarotError::EmptyPool { .. }
            | TarotError::InsufficientPool { .. }
            | TarotError::CardNotFound { .. } => ErrorCategory::Validation,
            TarotError::HttpError(_)
            | TarotError::FetchTransient { .. }
            | TarotError::IntegrityError { .. }
            | TarotError::FetchExhausted { .. } => ErrorCategory::Fetch,
            TarotError::ConfigError { .. }
            | TarotError::ConfigValidationError { .. }
            | TarotError::InvalidConfigValueError { .. }
            | TarotError::MissingConfigError { .. }
            | TarotError::CatalogError { .. } => ErrorCategory::Configuration,
            TarotError::IoError(_)
            | TarotError::SerializationError(_)
            | TarotError::ImageError(_)
            | TarotError::ProcessingError { .. } => ErrorCategory::System,
        }
    }

    /// 單次下載嘗試內可重試的錯誤
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TarotError::HttpError(_)
                | TarotError::FetchTransient { .. }
                | TarotError::IntegrityError { .. }
        )
    }

    /// 給終端使用者看的訊息，不洩漏內部路徑或網址
    pub fn user_friendly_message(&self) -> String {
        match self {
            TarotError::UnknownFormation { name } => {
                format!("There is no formation called '{}'", name)
            }
            TarotError::UnknownPool { scope } => {
                format!(
                    "There is no card pool called '{}' (use all, major or minor)",
                    scope
                )
            }
            TarotError::EmptyPool { .. } => "The selected card pool is empty".to_string(),
            TarotError::InsufficientPool {
                formation,
                required,
                available,
            } => format!(
                "The '{}' formation needs {} cards, but only {} are available in this pool",
                formation, required, available
            ),
            TarotError::CardNotFound { .. } => "The drawn card is not in the deck".to_string(),
            _ => match self.category() {
                ErrorCategory::Configuration => {
                    "Divination is not configured correctly".to_string()
                }
                _ => "Divination failed, please try again later".to_string(),
            },
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Validation => "Check the requested card pool and formation name",
            ErrorCategory::Fetch => "Check network access to the image source, then retry",
            ErrorCategory::Configuration => "Check the configuration file and catalog tables",
            ErrorCategory::System => "Check disk permissions and available space for the cache",
        }
    }
}

pub type Result<T> = std::result::Result<T, TarotError>;
