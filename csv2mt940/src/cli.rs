use clap::{Parser, ValueEnum};
use mt940lib::{
    model::DebitCredit,
    normalize::{parse_amount, NormalizeConfig},
    profile::{ErrorPolicy, ProfileName, ProfileOptions},
    traits::{Encoding, ReadOptions, WriteOptions},
};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum InputEncoding {
    #[value(name = "iso-8859-1", alias = "latin1", alias = "latin-1")]
    Latin1,
    #[value(name = "utf-8", alias = "utf8")]
    Utf8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    Starmoney,
    Plain,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DebugFormat {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "csv2mt940",
    version,
    about = "Конвертация ';'-CSV выгрузки TopCard в MT940 .sta (для StarMoney: -p starmoney)"
)]
pub struct Cli {
    /// Входной CSV
    #[arg(value_name = "INPUT_CSV")]
    pub input: PathBuf,

    /// Выходной файл MT940 (.sta)
    #[arg(value_name = "OUTPUT_STA")]
    pub output: PathBuf,

    /// Кодировка CSV
    #[arg(long, value_enum, default_value = "iso-8859-1")]
    pub encoding: InputEncoding,

    /// Разделитель CSV (один символ, `tab` — табуляция)
    #[arg(long, default_value = ";", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// Обработать только первые N проводок (0 — все)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,

    /// Показать разобранные строки вместо записи выписки
    #[arg(short = 'd', long, conflicts_with = "profile")]
    pub debug: bool,

    /// Формат отладочного вывода
    #[arg(long, value_enum, default_value = "table")]
    pub debug_format: DebugFormat,

    /// Профиль вывода
    #[arg(short = 'p', long, value_enum)]
    pub profile: Option<ProfileArg>,

    /// Код операции в :61: (только starmoney)
    #[arg(long, default_value = "NTRF")]
    pub ttype: String,

    /// Значение EREF+ в :86: (только starmoney)
    #[arg(long, default_value = "NONREF")]
    pub eref: String,

    /// SEPA-код PURP+ в :86: (только starmoney)
    #[arg(long, default_value = "")]
    pub purp: String,

    /// Не писать остатки :60F:/:62F:
    #[arg(long)]
    pub suppress_balances: bool,

    /// Начальный остаток, например 1250,00 или -80.10
    #[arg(long, default_value = "0", value_parser = parse_opening_balance, allow_hyphen_values = true)]
    pub opening_balance: Decimal,

    /// Референс :20: (по умолчанию CSV2MT940 + дата первой проводки)
    #[arg(long)]
    pub reference: Option<String>,

    /// Номер выписки в :28C:
    #[arg(long, default_value_t = 1)]
    pub statement_number: u32,

    /// Валюта для строк с пустой колонкой валюты
    #[arg(long, default_value = "EUR")]
    pub default_currency: String,

    /// Добавлять теги строки в :86: (только plain)
    #[arg(long)]
    pub tags: bool,

    /// Пропускать некорректные строки вместо остановки
    #[arg(long)]
    pub skip_invalid: bool,

    /// Не писать UTF-8 BOM
    #[arg(long)]
    pub no_bom: bool,

    /// Подробный лог
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    pub fn profile_options(&self) -> ProfileOptions {
        ProfileOptions {
            name: match self.profile {
                Some(ProfileArg::Starmoney) => ProfileName::Starmoney,
                Some(ProfileArg::Plain) | None => ProfileName::Plain,
            },
            transaction_type: self.ttype.clone(),
            eref: self.eref.clone(),
            purp: self.purp.clone(),
            suppress_balances: self.suppress_balances,
            limit: self.limit,
            opening_balance: self.opening_balance,
            reference: self.reference.clone(),
            statement_number: self.statement_number,
            emit_tags: self.tags,
            error_policy: if self.skip_invalid {
                ErrorPolicy::Skip
            } else {
                ErrorPolicy::Strict
            },
        }
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            delimiter: self.delimiter,
            encoding: match self.encoding {
                InputEncoding::Latin1 => Encoding::Latin1,
                InputEncoding::Utf8 => Encoding::Utf8,
            },
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions { bom: !self.no_bom }
    }

    pub fn normalize_config(&self) -> NormalizeConfig {
        NormalizeConfig {
            default_currency: self.default_currency.clone(),
            ..NormalizeConfig::default()
        }
    }
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(format!("delimiter must be a single ASCII character, got '{s}'")),
    }
}

fn parse_opening_balance(s: &str) -> Result<Decimal, String> {
    match parse_amount(s) {
        Some((Some(DebitCredit::Debit), d)) if !d.is_zero() => Ok(-d),
        Some((_, d)) => Ok(d),
        None => Err(format!("invalid amount '{s}'")),
    }
}
