use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("row {row} is out of range (row count {row_count})")]
    RowOutOfRange { row: usize, row_count: usize },

    #[error("column {index} is out of range (column count {column_count})")]
    ColumnOutOfRange { index: usize, column_count: usize },

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("invalid range {start}..={end}")]
    InvalidRange { start: usize, end: usize },

    #[error("level value {value} already exists in column '{column}'")]
    DuplicateLevel { column: String, value: i32 },

    #[error("column '{column}' is {measure_type} and cannot carry levels")]
    LevelsNotSupported {
        column: String,
        measure_type: crate::value::MeasureType,
    },

    #[error("unknown data type '{0}'")]
    UnknownDataType(String),

    #[error("unknown measure type '{0}'")]
    UnknownMeasureType(String),

    #[error("unknown column type '{0}'")]
    UnknownColumnType(String),

    #[error("invalid missing value rule '{0}'")]
    InvalidMissingRule(String),

    #[error("write buffer capacity must be at least 1 (got {0})")]
    InvalidCapacity(usize),

    #[error("backing store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal encoding error: {0}")]
    Journal(#[from] serde_json::Error),

    #[error("store is closed")]
    Closed,

    #[error("unknown dataset handle {0}")]
    UnknownDataset(u64),

    #[error("unknown column id {0}")]
    UnknownColumn(i32),

    #[error("row {row} is out of range (row count {row_count})")]
    RowOutOfRange { row: usize, row_count: usize },

    #[error("column index {index} is out of range (column count {column_count})")]
    ColumnOutOfRange { index: usize, column_count: usize },

    #[error("corrupt journal at line {line}: {message}")]
    CorruptJournal { line: usize, message: String },
}
