//! Единый тип ошибок публичного API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Mt940Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("line {row}: row has too few columns ({found}, needed >= {needed})")]
    MalformedRow { row: usize, found: usize, needed: usize },

    #[error("line {row}: account number is empty")]
    MissingAccount { row: usize },

    #[error("line {row}: invalid account '{value}' (at most 35 letters, digits, spaces or /-?().,'+)")]
    InvalidAccount { row: usize, value: String },

    #[error("line {row}: unexpected date format in {column} (expected DD.MM.YYYY): '{value}'")]
    DateFormat {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("line {row}: neither amount (col 10) nor alternate amount (col 11) has a value")]
    MissingAmount { row: usize },

    #[error("line {row}: invalid amount '{value}'")]
    InvalidAmount { row: usize, value: String },

    #[error("line {row}: invalid currency '{value}' (expected 3 letters)")]
    InvalidCurrency { row: usize, value: String },

    #[error("line {row}: currency {found} differs from statement currency {expected}")]
    CurrencyMismatch {
        row: usize,
        expected: String,
        found: String,
    },

    #[error("line {row}: running balance overflows")]
    BalanceOverflow { row: usize },

    #[error("invalid statement account '{0}' (at most 35 permitted characters)")]
    InvalidStatementAccount(String),

    #[error("no transactions to write")]
    EmptyStatement,

    #[error("invalid profile: {0}")]
    InvalidProfile(String),
}

impl Mt940Error {
    /// Номер строки входа (1-based, с учётом заголовков) для ошибок уровня строки.
    pub fn row(&self) -> Option<usize> {
        match self {
            Mt940Error::MalformedRow { row, .. }
            | Mt940Error::MissingAccount { row }
            | Mt940Error::InvalidAccount { row, .. }
            | Mt940Error::DateFormat { row, .. }
            | Mt940Error::MissingAmount { row }
            | Mt940Error::InvalidAmount { row, .. }
            | Mt940Error::InvalidCurrency { row, .. }
            | Mt940Error::CurrencyMismatch { row, .. }
            | Mt940Error::BalanceOverflow { row } => Some(*row),
            _ => None,
        }
    }

    /// Можно ли пропустить строку с этой ошибкой в режиме `ErrorPolicy::Skip`.
    /// Расхождение валют и переполнение остатка ломают весь документ.
    pub fn is_row_scoped(&self) -> bool {
        self.row().is_some()
            && !matches!(
                self,
                Mt940Error::CurrencyMismatch { .. } | Mt940Error::BalanceOverflow { .. }
            )
    }
}

pub type Result<T> = std::result::Result<T, Mt940Error>;
