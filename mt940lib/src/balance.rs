//! Накопление остатка по счёту: левая свёртка в порядке строк входа.

use crate::{
    error::{Mt940Error, Result},
    model::{Balance, Transaction},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Текущий остаток. Меняется только через [`RunningBalance::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunningBalance {
    currency: String,
    amount: Decimal,
    as_of: NaiveDate,
}

impl RunningBalance {
    /// Остаток до первой проводки: валюта и дата берутся из неё.
    pub fn open(first: &Transaction, starting: Decimal) -> Self {
        Self {
            currency: first.currency.clone(),
            amount: starting,
            as_of: first.value_date,
        }
    }

    pub fn apply(&mut self, tx: &Transaction) -> Result<Decimal> {
        if tx.currency != self.currency {
            return Err(Mt940Error::CurrencyMismatch {
                row: tx.row,
                expected: self.currency.clone(),
                found: tx.currency.clone(),
            });
        }
        self.amount = self
            .amount
            .checked_add(tx.amount)
            .ok_or(Mt940Error::BalanceOverflow { row: tx.row })?;
        self.as_of = tx.value_date;
        Ok(self.amount)
    }

    pub fn snapshot(&self) -> Balance {
        Balance {
            date: self.as_of,
            amount: self.amount,
            currency: self.currency.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSummary {
    pub opening: Balance,
    pub closing: Balance,
    /// Остаток после каждой проводки, в том же порядке.
    pub running: Vec<Decimal>,
}

/// Сворачивает проводки в порядке входа, без пересортировки.
pub fn fold(txs: &[Transaction], starting: Decimal) -> Result<BalanceSummary> {
    let first = txs.first().ok_or(Mt940Error::EmptyStatement)?;
    let mut bal = RunningBalance::open(first, starting);
    let opening = bal.snapshot();

    let running = txs
        .iter()
        .map(|tx| bal.apply(tx))
        .collect::<Result<Vec<_>>>()?;

    Ok(BalanceSummary {
        opening,
        closing: bal.snapshot(),
        running,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn tx(row: usize, day: u32, amount: &str, ccy: &str) -> Transaction {
        let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        Transaction {
            row,
            account_number: "1001".into(),
            value_date: date,
            booking_date: date,
            amount: Decimal::from_str_exact(amount).unwrap(),
            currency: ccy.into(),
            purpose: String::new(),
            tags: vec![],
        }
    }

    #[test]
    fn credit_then_debit() {
        let txs = vec![tx(3, 1, "100.00", "EUR"), tx(4, 5, "-30.00", "EUR")];
        let s = fold(&txs, Decimal::ZERO).unwrap();
        assert_eq!(s.opening.amount, Decimal::ZERO);
        assert_eq!(s.opening.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(s.closing.amount, Decimal::new(7000, 2));
        assert_eq!(s.closing.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(s.closing.currency, "EUR");
        assert_eq!(s.running, vec![Decimal::new(10000, 2), Decimal::new(7000, 2)]);
    }

    #[test]
    fn starting_balance_override() {
        let txs = vec![tx(3, 1, "-0.10", "EUR"), tx(4, 2, "-0.20", "EUR")];
        let s = fold(&txs, Decimal::new(30, 2)).unwrap();
        assert_eq!(s.opening.amount, Decimal::new(30, 2));
        assert!(s.closing.amount.is_zero());
    }

    #[test]
    fn dates_follow_input_order_not_calendar() {
        let txs = vec![tx(3, 9, "1", "EUR"), tx(4, 2, "1", "EUR")];
        let s = fold(&txs, Decimal::ZERO).unwrap();
        assert_eq!(s.opening.date.day0(), 8);
        assert_eq!(s.closing.date.day0(), 1);
    }

    #[test]
    fn currency_mismatch_is_reported_with_row() {
        let txs = vec![tx(3, 1, "1", "EUR"), tx(4, 2, "1", "CHF")];
        let err = fold(&txs, Decimal::ZERO).unwrap_err();
        assert!(matches!(
            err,
            Mt940Error::CurrencyMismatch { row: 4, ref expected, ref found } if expected == "EUR" && found == "CHF"
        ));
        assert!(!err.is_row_scoped());
    }

    #[test]
    fn empty_sequence() {
        assert!(matches!(fold(&[], Decimal::ZERO), Err(Mt940Error::EmptyStatement)));
    }

    #[test]
    fn sum_is_exact() {
        let txs: Vec<_> = (0..10).map(|i| tx(3 + i, 1, "0.10", "EUR")).collect();
        let s = fold(&txs, Decimal::ZERO).unwrap();
        assert_eq!(s.closing.amount, Decimal::ONE);
    }

    #[test]
    fn overflow_fails_the_whole_statement() {
        let mut big = tx(3, 1, "0", "EUR");
        big.amount = Decimal::MAX;
        let txs = vec![big, tx(4, 2, "1.00", "EUR")];
        let err = fold(&txs, Decimal::ZERO).unwrap_err();
        assert!(matches!(err, Mt940Error::BalanceOverflow { row: 4 }));
        assert!(!err.is_row_scoped());
        assert!(err.to_string().starts_with("line 4:"));
    }
}
