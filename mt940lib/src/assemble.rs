//! Сборка выписки: заголовок, остатки и пары :61:/:86: в порядке строк входа.

use crate::{
    balance::{fold, BalanceSummary},
    error::{Mt940Error, Result},
    formats::mt940::{is_valid_account, render, render_balance, Tag, TagLine},
    model::{StatementNumber, Transaction},
    normalize::{Normalizer, RowOutcome},
    profile::{ErrorPolicy, Profile},
    traits::RawRow,
};

const DEFAULT_REFERENCE_PREFIX: &str = "CSV2MT940";

/// Готовая выписка — упорядоченные логические строки тегов.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatementDocument {
    tag_lines: Vec<TagLine>,
}

impl StatementDocument {
    /// Физические строки с учётом переноса длинных тегов.
    pub fn lines(&self) -> Vec<String> {
        self.tag_lines.iter().flat_map(TagLine::lines).collect()
    }

    /// Число проводок (строк :61:).
    pub fn transaction_count(&self) -> usize {
        self.tag_lines
            .iter()
            .filter(|l| l.tag == Tag::StatementLine)
            .count()
    }
}

/// Собирает документ из уже нормализованных проводок.
///
/// `profile.limit()` обрезает последовательность по префиксу. Остатки
/// считаются всегда (ради проверки валюты), но при `suppress_balances`
/// в документ не попадают.
pub fn assemble(
    txs: &[Transaction],
    profile: &Profile,
    account_number: &str,
    statement_number: StatementNumber,
) -> Result<StatementDocument> {
    assemble_with_balances(txs, profile, account_number, statement_number).map(|(doc, _)| doc)
}

fn assemble_with_balances(
    txs: &[Transaction],
    profile: &Profile,
    account_number: &str,
    statement_number: StatementNumber,
) -> Result<(StatementDocument, BalanceSummary)> {
    let account_number = account_number.trim();
    if !is_valid_account(account_number) {
        return Err(Mt940Error::InvalidStatementAccount(account_number.to_string()));
    }
    let included = match profile.limit() {
        Some(n) => &txs[..n.min(txs.len())],
        None => txs,
    };
    let balances = fold(included, profile.opening_balance())?;
    let first = &included[0];

    let reference = match profile.reference() {
        Some(r) => r.to_string(),
        None => format!(
            "{DEFAULT_REFERENCE_PREFIX}{}",
            first.value_date.format("%y%m%d")
        ),
    };

    let mut lines = vec![
        TagLine::new(Tag::Reference, reference),
        TagLine::new(Tag::Account, account_number),
        TagLine::new(Tag::StatementNumber, statement_number.to_string()),
    ];
    if !profile.suppress_balances() {
        lines.push(render_balance(Tag::OpeningBalance, &balances.opening));
    }
    for tx in included {
        let pair = render(tx, profile);
        lines.push(pair.line61);
        lines.push(pair.line86);
    }
    if !profile.suppress_balances() {
        lines.push(render_balance(Tag::ClosingBalance, &balances.closing));
    }

    tracing::info!(
        transactions = included.len(),
        opening = %balances.opening.amount,
        closing = %balances.closing.amount,
        currency = %balances.closing.currency,
        "assembled statement"
    );

    Ok((StatementDocument { tag_lines: lines }, balances))
}

/// Итог разбора всех строк входа.
#[derive(Debug, Default)]
pub struct NormalizedRows {
    pub transactions: Vec<Transaction>,
    /// Строки, пропущенные в режиме `ErrorPolicy::Skip`.
    pub skipped: Vec<Mt940Error>,
}

/// Нормализует строки по порядку и останавливается, набрав `limit` проводок.
/// Номер строки для нормализатора — физическая строка входа.
pub fn normalize_rows(
    rows: &[RawRow],
    normalizer: &Normalizer,
    policy: ErrorPolicy,
    limit: Option<usize>,
) -> Result<NormalizedRows> {
    let mut out = NormalizedRows::default();
    for raw in rows {
        if limit.is_some_and(|n| out.transactions.len() >= n) {
            break;
        }
        let row = raw.line;
        match normalizer.normalize(&raw.fields, row) {
            Ok(RowOutcome::Transaction(tx)) => out.transactions.push(tx),
            Ok(_) => {}
            Err(e) if policy == ErrorPolicy::Skip && e.is_row_scoped() => {
                tracing::warn!(row, error = %e, "skipping invalid row");
                out.skipped.push(e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

/// Результат полной конвертации.
#[derive(Debug)]
pub struct Conversion {
    pub document: StatementDocument,
    pub transactions: Vec<Transaction>,
    pub balances: BalanceSummary,
    pub skipped: Vec<Mt940Error>,
}

/// Строки CSV → документ MT940. Счёт берётся из первой проводки.
pub fn convert_rows(
    rows: &[RawRow],
    normalizer: &Normalizer,
    profile: &Profile,
) -> Result<Conversion> {
    let NormalizedRows {
        transactions,
        skipped,
    } = normalize_rows(rows, normalizer, profile.error_policy(), profile.limit())?;

    let first = transactions.first().ok_or(Mt940Error::EmptyStatement)?;
    let account = first.account_number.clone();
    if let Some(other) = transactions.iter().find(|t| t.account_number != account) {
        tracing::warn!(
            row = other.row,
            account = %other.account_number,
            statement_account = %account,
            "row belongs to a different account; using the first one"
        );
    }

    let (document, balances) =
        assemble_with_balances(&transactions, profile, &account, profile.statement_number())?;

    Ok(Conversion {
        document,
        transactions,
        balances,
        skipped,
    })
}
