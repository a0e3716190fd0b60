use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Sheet '{sheet}' not found in workbook")]
    SheetNotFound { sheet: String },

    #[error("No header row found in sheet '{sheet}': expected a row containing an 'Item' cell")]
    HeaderNotFound { sheet: String },

    #[error("Sheet '{sheet}' is missing required column '{column}'")]
    MissingColumn { sheet: String, column: String },

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Commentary service error: {0}")]
    Commentary(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
