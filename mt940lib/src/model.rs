//! Доменные модели — нормализованный слой между строками CSV и тегами MT940.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum DebitCredit {
    Debit,
    Credit,
}

impl DebitCredit {
    /// Знак суммы: отрицательная — дебет, всё остальное (включая ноль) — кредит.
    pub fn of(amount: Decimal) -> Self {
        if amount.is_sign_negative() && !amount.is_zero() {
            DebitCredit::Debit
        } else {
            DebitCredit::Credit
        }
    }

    pub fn mark(self) -> char {
        match self {
            DebitCredit::Debit => 'D',
            DebitCredit::Credit => 'C',
        }
    }
}

/// Одна проводка, полученная из строки CSV. После создания не меняется.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Transaction {
    /// Номер строки во входном файле (1-based, с учётом заголовков).
    pub row: usize,
    pub account_number: String,
    pub value_date: NaiveDate,
    pub booking_date: NaiveDate,
    /// Сумма со знаком: дебет отрицательный.
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
    pub purpose: String,
    pub tags: Vec<String>,
}

impl Transaction {
    pub fn dc(&self) -> DebitCredit {
        DebitCredit::of(self.amount)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Balance {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
}

impl Balance {
    pub fn dc(&self) -> DebitCredit {
        DebitCredit::of(self.amount)
    }
}

/// Номер выписки для :28C: — `00001/001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementNumber {
    pub statement: u32,
    pub sequence: u32,
}

impl Default for StatementNumber {
    fn default() -> Self {
        Self {
            statement: 1,
            sequence: 1,
        }
    }
}

impl fmt::Display for StatementNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}/{:03}", self.statement, self.sequence)
    }
}
