//! Нормализация: одна строка CSV → [`Transaction`].
//!
//! Колонки адресуются через [`ColumnMap`], а не «магическими» индексами;
//! ширина строки проверяется один раз, до обращения к полям.

use crate::{
    error::{Mt940Error, Result},
    formats::mt940::is_valid_account,
    model::{DebitCredit, Transaction},
};
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

/// Позиции колонок в выгрузке TopCard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub account: usize,
    pub value_date: usize,
    pub purpose: usize,
    pub tags: usize,
    pub currency: usize,
    /// Основная колонка суммы (списания).
    pub amount: usize,
    /// Запасная колонка суммы (зачисления).
    pub amount_alt: usize,
    pub booking_date: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            account: 1,
            value_date: 3,
            purpose: 4,
            tags: 5,
            currency: 7,
            amount: 10,
            amount_alt: 11,
            booking_date: 12,
        }
    }
}

impl ColumnMap {
    /// Минимальное число полей в строке.
    pub fn width(&self) -> usize {
        [
            self.account,
            self.value_date,
            self.purpose,
            self.tags,
            self.currency,
            self.amount,
            self.amount_alt,
            self.booking_date,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    pub columns: ColumnMap,
    /// Валюта для строк с пустой колонкой валюты.
    pub default_currency: String,
    /// Сколько первых строк входа считаются заголовком.
    pub header_rows: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMap::default(),
            default_currency: "EUR".into(),
            header_rows: 2,
        }
    }
}

/// Результат разбора строки: либо проводка, либо строка, которую надо пропустить.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Transaction(Transaction),
    Header,
    Footer,
    Blank,
}

pub struct Normalizer {
    config: NormalizeConfig,
    re_date: Regex,
    re_footer: Regex,
}

impl Normalizer {
    pub fn new(config: NormalizeConfig) -> Result<Self> {
        // DD.MM.YYYY, допускается хвост со временем: "03.01.2024 14:05"
        let re_date = Regex::new(r"^(?P<d>\d{2})\.(?P<m>\d{2})\.(?P<y>\d{4})(?:\s.*)?$")?;
        let re_footer = Regex::new(r"^Total\b")?;
        Ok(Self {
            config,
            re_date,
            re_footer,
        })
    }

    /// Разбирает поля `raw` физической строки `row` (1-based, считая заголовки и пустые строки).
    pub fn normalize(&self, raw: &[String], row: usize) -> Result<RowOutcome> {
        if row <= self.config.header_rows {
            tracing::debug!(row, "skipping header row");
            return Ok(RowOutcome::Header);
        }
        let first = match raw.iter().map(|f| f.trim()).find(|f| !f.is_empty()) {
            Some(f) => f,
            None => return Ok(RowOutcome::Blank),
        };
        if self.re_footer.is_match(first) {
            tracing::debug!(row, "skipping footer row");
            return Ok(RowOutcome::Footer);
        }

        let cols = &self.config.columns;
        if raw.len() < cols.width() {
            return Err(Mt940Error::MalformedRow {
                row,
                found: raw.len(),
                needed: cols.width(),
            });
        }
        let field = move |idx: usize| raw[idx].trim();

        let account_number = field(cols.account);
        if account_number.is_empty() {
            return Err(Mt940Error::MissingAccount { row });
        }
        if !is_valid_account(account_number) {
            return Err(Mt940Error::InvalidAccount {
                row,
                value: account_number.to_string(),
            });
        }

        let value_date = self.parse_date(field(cols.value_date), row, "value date")?;
        let booking_date = match field(cols.booking_date) {
            "" => value_date,
            b => self.parse_date(b, row, "booking date")?,
        };

        let amount = resolve_amount(field(cols.amount), field(cols.amount_alt), row)?;
        let currency = self.parse_currency(field(cols.currency), row)?;

        let tags = field(cols.tags)
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        let tx = Transaction {
            row,
            account_number: account_number.to_string(),
            value_date,
            booking_date,
            amount,
            currency,
            purpose: field(cols.purpose).to_string(),
            tags,
        };
        tracing::debug!(row, amount = %tx.amount, currency = %tx.currency, "normalized row");
        Ok(RowOutcome::Transaction(tx))
    }

    fn parse_date(&self, s: &str, row: usize, column: &'static str) -> Result<NaiveDate> {
        let err = || Mt940Error::DateFormat {
            row,
            column,
            value: s.to_string(),
        };
        let caps = self.re_date.captures(s).ok_or_else(err)?;
        let num = |name: &str| -> Option<u32> { caps.name(name)?.as_str().parse().ok() };
        let (d, m, y) = (num("d"), num("m"), num("y"));
        match (d, m, y) {
            (Some(d), Some(m), Some(y)) => NaiveDate::from_ymd_opt(y as i32, m, d).ok_or_else(err),
            _ => Err(err()),
        }
    }

    fn parse_currency(&self, s: &str, row: usize) -> Result<String> {
        let raw = if s.is_empty() {
            self.config.default_currency.trim()
        } else {
            s
        };
        let ccy = raw.to_ascii_uppercase();
        if ccy.len() == 3 && ccy.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(ccy)
        } else {
            Err(Mt940Error::InvalidCurrency {
                row,
                value: raw.to_string(),
            })
        }
    }
}

const MAX_SCALE: u32 = 2;

/// Берёт сумму из основной колонки, а если она пуста — из запасной.
///
/// Явный знак главнее колонки; без знака основная колонка — дебет,
/// запасная — кредит. Нулевая сумма всегда кредит.
fn resolve_amount(primary: &str, alternate: &str, row: usize) -> Result<Decimal> {
    let (text, column_dc) = if !primary.is_empty() {
        (primary, DebitCredit::Debit)
    } else if !alternate.is_empty() {
        (alternate, DebitCredit::Credit)
    } else {
        return Err(Mt940Error::MissingAmount { row });
    };

    let (sign, magnitude) = parse_amount(text).ok_or_else(|| Mt940Error::InvalidAmount {
        row,
        value: text.to_string(),
    })?;

    let dc = sign.unwrap_or(column_dc);
    if dc == DebitCredit::Debit && !magnitude.is_zero() {
        Ok(-magnitude)
    } else {
        Ok(magnitude)
    }
}

/// Разбирает «1'234,50», "-12.50", "12,50-", "+3" и т.п.
///
/// Возвращает явный знак (если был) и модуль суммы. Значащих знаков после
/// запятой не больше двух: "12,500" проходит, "12,505" — нет.
pub fn parse_amount(raw: &str) -> Option<(Option<DebitCredit>, Decimal)> {
    let mut s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'' && *c != '’')
        .collect();

    let mut sign = None;
    if let Some(rest) = s.strip_prefix('-') {
        sign = Some(DebitCredit::Debit);
        s = rest.to_string();
    } else if let Some(rest) = s.strip_prefix('+') {
        sign = Some(DebitCredit::Credit);
        s = rest.to_string();
    } else if let Some(rest) = s.strip_suffix('-') {
        sign = Some(DebitCredit::Debit);
        s = rest.to_string();
    }

    // десятичный разделитель — самый правый из '.' и ','
    let normalized = match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (None, Some(_)) => s.replace(',', "."),
        _ => s,
    };

    let digits = normalized.chars().filter(|c| c.is_ascii_digit()).count();
    let dots = normalized.chars().filter(|c| *c == '.').count();
    if digits == 0 || dots > 1 || digits + dots != normalized.len() {
        return None;
    }
    let normalized = match normalized.strip_suffix('.') {
        Some(n) => n.to_string(),
        None => normalized,
    };
    let normalized = if normalized.starts_with('.') {
        format!("0{normalized}")
    } else {
        normalized
    };

    let mut d = Decimal::from_str_exact(&normalized).ok()?.normalize();
    if d.scale() > MAX_SCALE {
        return None;
    }
    d.rescale(MAX_SCALE);
    Some((sign, d))
}
