//! Профиль вывода: всё, чем `plain` и `starmoney` отличаются друг от друга.
//!
//! Профиль собирается один раз из [`ProfileOptions`] и дальше передаётся
//! по ссылке во все стадии — глобальных настроек нет.

use crate::{
    error::{Mt940Error, Result},
    formats::mt940::is_permitted,
    model::StatementNumber,
};
use rust_decimal::Decimal;

/// Код операции :61: для профиля `plain` (и когда профиль не задан).
pub const GENERIC_TRANSACTION_TYPE: &str = "FCHG";
pub const DEFAULT_TRANSACTION_TYPE: &str = "NTRF";
pub const DEFAULT_EREF: &str = "NONREF";

const MAX_EREF_LEN: usize = 35;
const MAX_REFERENCE_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileName {
    #[default]
    Plain,
    Starmoney,
}

/// Что делать со строкой, которую не удалось разобрать.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Первая же ошибка прерывает конвертацию.
    #[default]
    Strict,
    /// Строка пропускается, ошибка попадает в отчёт и в лог.
    Skip,
}

/// Сырые значения настроек — как они пришли из CLI.
#[derive(Debug, Clone)]
pub struct ProfileOptions {
    pub name: ProfileName,
    pub transaction_type: String,
    pub eref: String,
    pub purp: String,
    pub suppress_balances: bool,
    /// 0 — без ограничения.
    pub limit: usize,
    pub opening_balance: Decimal,
    pub reference: Option<String>,
    pub statement_number: u32,
    pub emit_tags: bool,
    pub error_policy: ErrorPolicy,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            name: ProfileName::Plain,
            transaction_type: DEFAULT_TRANSACTION_TYPE.into(),
            eref: DEFAULT_EREF.into(),
            purp: String::new(),
            suppress_balances: false,
            limit: 0,
            opening_balance: Decimal::ZERO,
            reference: None,
            statement_number: 1,
            emit_tags: false,
            error_policy: ErrorPolicy::Strict,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    name: ProfileName,
    transaction_type_code: String,
    eref: Option<String>,
    purp: Option<String>,
    suppress_balances: bool,
    limit: Option<usize>,
    opening_balance: Decimal,
    reference: Option<String>,
    statement_number: StatementNumber,
    emit_tags: bool,
    error_policy: ErrorPolicy,
}

impl Profile {
    /// Проверяет опции и фиксирует профиль.
    ///
    /// Под `plain` значения `--ttype`, `--eref` и `--purp` игнорируются без ошибки.
    pub fn resolve(opts: ProfileOptions) -> Result<Self> {
        let starmoney = opts.name == ProfileName::Starmoney;

        let (transaction_type_code, eref, purp) = if starmoney {
            (
                validate_transaction_type(&opts.transaction_type)?,
                Some(validate_eref(&opts.eref)?),
                validate_purp(&opts.purp)?,
            )
        } else {
            (GENERIC_TRANSACTION_TYPE.to_string(), None, None)
        };

        let reference = opts
            .reference
            .as_deref()
            .map(validate_reference)
            .transpose()?;

        if opts.statement_number == 0 || opts.statement_number > 99_999 {
            return Err(Mt940Error::InvalidProfile(format!(
                "statement number {} out of range 1..=99999",
                opts.statement_number
            )));
        }

        Ok(Self {
            name: opts.name,
            transaction_type_code,
            eref,
            purp,
            suppress_balances: opts.suppress_balances,
            limit: (opts.limit > 0).then_some(opts.limit),
            opening_balance: opts.opening_balance,
            reference,
            statement_number: StatementNumber {
                statement: opts.statement_number,
                sequence: 1,
            },
            emit_tags: opts.emit_tags && !starmoney,
            error_policy: opts.error_policy,
        })
    }

    /// Профиль `plain` со значениями по умолчанию.
    pub fn plain() -> Self {
        Self {
            name: ProfileName::Plain,
            transaction_type_code: GENERIC_TRANSACTION_TYPE.into(),
            eref: None,
            purp: None,
            suppress_balances: false,
            limit: None,
            opening_balance: Decimal::ZERO,
            reference: None,
            statement_number: StatementNumber::default(),
            emit_tags: false,
            error_policy: ErrorPolicy::Strict,
        }
    }

    /// Профиль `starmoney` со значениями по умолчанию.
    pub fn starmoney() -> Self {
        Self {
            name: ProfileName::Starmoney,
            transaction_type_code: DEFAULT_TRANSACTION_TYPE.into(),
            eref: Some(DEFAULT_EREF.into()),
            ..Self::plain()
        }
    }

    pub fn transaction_type_code(&self) -> &str {
        &self.transaction_type_code
    }

    /// Выводить ли SEPA-ключи (EREF+/SVWZ+/PURP+) в :86:.
    pub fn sepa_keys(&self) -> bool {
        self.name == ProfileName::Starmoney
    }

    pub fn eref(&self) -> Option<&str> {
        self.eref.as_deref()
    }

    pub fn purp(&self) -> Option<&str> {
        self.purp.as_deref()
    }

    pub fn suppress_balances(&self) -> bool {
        self.suppress_balances
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn opening_balance(&self) -> Decimal {
        self.opening_balance
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn statement_number(&self) -> StatementNumber {
        self.statement_number
    }

    pub fn emit_tags(&self) -> bool {
        self.emit_tags
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }
}

fn validate_transaction_type(raw: &str) -> Result<String> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() == 4 && code.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(code)
    } else {
        Err(Mt940Error::InvalidProfile(format!(
            "transaction type '{raw}' must be 4 letters or digits"
        )))
    }
}

fn validate_eref(raw: &str) -> Result<String> {
    let eref = raw.trim();
    if eref.is_empty() {
        return Ok(DEFAULT_EREF.into());
    }
    if eref.chars().count() > MAX_EREF_LEN || !eref.chars().all(is_permitted) {
        return Err(Mt940Error::InvalidProfile(format!(
            "EREF '{raw}' must be at most {MAX_EREF_LEN} permitted characters"
        )));
    }
    Ok(eref.to_string())
}

fn validate_purp(raw: &str) -> Result<Option<String>> {
    let purp = raw.trim().to_ascii_uppercase();
    if purp.is_empty() {
        return Ok(None);
    }
    if purp.len() == 4 && purp.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(Some(purp))
    } else {
        Err(Mt940Error::InvalidProfile(format!(
            "purpose code '{raw}' must be 4 letters or digits"
        )))
    }
}

fn validate_reference(raw: &str) -> Result<String> {
    let r = raw.trim();
    let ok = !r.is_empty()
        && r.len() <= MAX_REFERENCE_LEN
        && r.chars().all(|c| c.is_ascii_alphanumeric() || "/-?().,'+".contains(c))
        && !r.starts_with('/')
        && !r.ends_with('/')
        && !r.contains("//");
    if ok {
        Ok(r.to_string())
    } else {
        Err(Mt940Error::InvalidProfile(format!(
            "reference '{raw}' is not a valid :20: value"
        )))
    }
}
