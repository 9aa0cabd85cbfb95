use crate::{
    assemble::StatementDocument,
    error::Result,
    model::{Balance, Transaction},
    profile::Profile,
    traits::{WriteDocument, WriteOptions},
};
use rust_decimal::Decimal;
use std::io::Write;

/// Ширина строки MT940 (без префикса тега).
pub const LINE_WIDTH: usize = 65;
/// :86: — не больше 6 строк по 65 символов.
pub const MAX_86_LINES: usize = 6;
pub const MAX_86_LEN: usize = LINE_WIDTH * MAX_86_LINES;
/// :25: — не больше 35 символов.
pub const MAX_ACCOUNT_LEN: usize = 35;

const PERMITTED_PUNCT: &str = "/-?().,'+ ";
const SEPA_SEPARATOR: &str = " ";
const REFERENCE_PLACEHOLDER: &str = "NONREF//NONREF";
const END_OF_STATEMENT: &str = "-";
const BOM: &str = "\u{feff}";

/// Теги, которые мы пишем: :20:, :25:, :28C:, :60F:, :61:, :86:, :62F:
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Reference,
    Account,
    StatementNumber,
    OpeningBalance,
    StatementLine,
    Information,
    ClosingBalance,
}

impl Tag {
    pub fn code(self) -> &'static str {
        match self {
            Tag::Reference => "20",
            Tag::Account => "25",
            Tag::StatementNumber => "28C",
            Tag::OpeningBalance => "60F",
            Tag::StatementLine => "61",
            Tag::Information => "86",
            Tag::ClosingBalance => "62F",
        }
    }
}

/// Логическая строка тега. Физически может занимать несколько строк.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLine {
    pub tag: Tag,
    pub content: String,
}

impl TagLine {
    pub fn new(tag: Tag, content: impl Into<String>) -> Self {
        Self {
            tag,
            content: content.into(),
        }
    }

    /// Физические строки: `:TAG:` + первые 65 символов, дальше — строки продолжения.
    /// Для :86: лишние строки сверх шести отбрасываются.
    pub fn lines(&self) -> Vec<String> {
        let mut chunks = wrap(&self.content, LINE_WIDTH);
        if self.tag == Tag::Information {
            chunks.truncate(MAX_86_LINES);
        }
        chunks[0] = format!(":{}:{}", self.tag.code(), chunks[0]);
        chunks
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLinePair {
    pub line61: TagLine,
    pub line86: TagLine,
}

/// Строит пару :61:/:86: для одной проводки.
pub fn render(tx: &Transaction, profile: &Profile) -> TagLinePair {
    // :61: YYMMDD MMDD D/C amount TYPE NONREF//NONREF — сумма без валюты
    let line61 = TagLine::new(
        Tag::StatementLine,
        format!(
            "{}{}{}{}{}{}",
            tx.value_date.format("%y%m%d"),
            tx.booking_date.format("%m%d"),
            tx.dc().mark(),
            format_amount(tx.amount),
            profile.transaction_type_code(),
            REFERENCE_PLACEHOLDER
        ),
    );

    let info = if profile.sepa_keys() {
        sepa_information(tx, profile)
    } else {
        plain_information(tx, profile)
    };

    TagLinePair {
        line61,
        line86: TagLine::new(Tag::Information, info),
    }
}

/// EREF+…, SVWZ+…, [PURP+…]. Режется только текст SVWZ, ключи остаются.
fn sepa_information(tx: &Transaction, profile: &Profile) -> String {
    let eref = format!("EREF+{}", profile.eref().unwrap_or(crate::profile::DEFAULT_EREF));
    let purp = profile.purp().map(|p| format!("PURP+{p}"));

    let fixed = eref.chars().count()
        + SEPA_SEPARATOR.len()
        + "SVWZ+".len()
        + purp
            .as_ref()
            .map_or(0, |p| SEPA_SEPARATOR.len() + p.chars().count());
    let svwz = truncate_chars(&sanitize(&tx.purpose), MAX_86_LEN.saturating_sub(fixed));

    let mut parts = vec![eref, format!("SVWZ+{svwz}")];
    parts.extend(purp);
    parts.join(SEPA_SEPARATOR)
}

fn plain_information(tx: &Transaction, profile: &Profile) -> String {
    let mut text = sanitize(&tx.purpose);
    if profile.emit_tags() && !tx.tags.is_empty() {
        let tags = sanitize(&tx.tags.join(", "));
        if !tags.is_empty() {
            if !text.is_empty() {
                text.push_str(SEPA_SEPARATOR);
            }
            text.push_str(&tags);
        }
    }
    truncate_chars(&text, MAX_86_LEN)
}

/// :60F: / :62F: — D/C + YYMMDD + CCY + amount
pub fn render_balance(tag: Tag, b: &Balance) -> TagLine {
    TagLine::new(
        tag,
        format!(
            "{}{}{}{}",
            b.dc().mark(),
            b.date.format("%y%m%d"),
            b.currency,
            format_amount(b.amount)
        ),
    )
}

/// Допустимые символы: буквы, цифры, пробел и `/ - ? ( ) . , ' +`.
pub fn is_permitted(c: char) -> bool {
    c.is_alphanumeric() || PERMITTED_PUNCT.contains(c)
}

/// Схлопывает пробельные последовательности и выбрасывает недопустимые символы.
pub fn sanitize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.chars().filter(|c| is_permitted(*c)).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}

/// Номер счёта для :25: — непустой, до 35 символов, только допустимые символы.
pub fn is_valid_account(account: &str) -> bool {
    !account.is_empty()
        && account.chars().count() <= MAX_ACCOUNT_LEN
        && account.chars().all(is_permitted)
}

/// Модуль суммы, запятая вместо точки, ровно два знака после запятой.
pub fn format_amount(a: Decimal) -> String {
    let mut abs = a.abs();
    abs.rescale(2);
    abs.to_string().replace('.', ",")
}

fn starts_tag_or_end(c: char) -> bool {
    c == ':' || c == '-'
}

/// Режет текст на куски по `width` символов. Строка продолжения не может
/// начинаться с ':' или '-': такой кусок получает ведущий пробел и на
/// символ меньше текста.
fn wrap(content: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let mut lines: Vec<String> = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let guarded = !lines.is_empty() && starts_tag_or_end(chars[start]);
        let take = if guarded { width - 1 } else { width };
        let end = (start + take).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        lines.push(if guarded { format!(" {chunk}") } else { chunk });
        start = end;
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Файл `.sta`: BOM (по желанию), CRLF, в конце маркер `-`.
pub struct Sta;

impl WriteDocument for Sta {
    fn write<W: Write>(mut w: W, doc: &StatementDocument, opts: &WriteOptions) -> Result<()> {
        use std::fmt::Write as FmtWrite;
        let mut s = String::new();
        if opts.bom {
            s.push_str(BOM);
        }
        for line in doc.lines() {
            let _ = write!(s, "{line}\r\n");
        }
        let _ = write!(s, "{END_OF_STATEMENT}\r\n");
        w.write_all(s.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ProfileName, ProfileOptions};
    use chrono::NaiveDate;
    use rstest::rstest;

    fn coffee() -> Transaction {
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        Transaction {
            row: 3,
            account_number: "1001".into(),
            value_date: date,
            booking_date: date,
            amount: Decimal::new(-1250, 2),
            currency: "EUR".into(),
            purpose: "Coffee shop".into(),
            tags: vec!["food".into(), "misc".into()],
        }
    }

    #[test]
    fn starmoney_coffee() {
        let pair = render(&coffee(), &Profile::starmoney());
        assert_eq!(pair.line61.content, "2401030103D12,50NTRFNONREF//NONREF");
        assert_eq!(pair.line86.content, "EREF+NONREF SVWZ+Coffee shop");
        assert_eq!(pair.line61.lines(), vec![":61:2401030103D12,50NTRFNONREF//NONREF"]);
    }

    #[test]
    fn starmoney_with_purpose_code() {
        let profile = Profile::resolve(ProfileOptions {
            name: ProfileName::Starmoney,
            eref: "E2E-42".into(),
            purp: "CBFF".into(),
            ..ProfileOptions::default()
        })
        .unwrap();
        let pair = render(&coffee(), &profile);
        assert_eq!(pair.line86.content, "EREF+E2E-42 SVWZ+Coffee shop PURP+CBFF");
    }

    #[test]
    fn plain_has_no_sepa_keys() {
        let pair = render(&coffee(), &Profile::plain());
        assert_eq!(pair.line86.content, "Coffee shop");
        assert!(pair.line61.content.contains("FCHG"));
    }

    #[test]
    fn plain_with_tags() {
        let profile = Profile::resolve(ProfileOptions {
            emit_tags: true,
            ..ProfileOptions::default()
        })
        .unwrap();
        assert_eq!(render(&coffee(), &profile).line86.content, "Coffee shop food, misc");
    }

    #[test]
    fn empty_plain_purpose_keeps_the_line() {
        let mut tx = coffee();
        tx.purpose = "   ".into();
        let pair = render(&tx, &Profile::plain());
        assert_eq!(pair.line86.lines(), vec![":86:"]);
    }

    #[test]
    fn credit_and_booking_date() {
        let mut tx = coffee();
        tx.amount = Decimal::new(100, 0);
        tx.booking_date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let pair = render(&tx, &Profile::plain());
        assert_eq!(pair.line61.content, "2401030105C100,00FCHGNONREF//NONREF");
    }

    #[test]
    fn zero_amount_is_credit() {
        let mut tx = coffee();
        tx.amount = Decimal::ZERO;
        assert!(render(&tx, &Profile::plain()).line61.content.starts_with("2401030103C0,00"));
    }

    #[rstest]
    #[case::tabs_and_newlines("Coffee\t shop\r\n Zürich", "Coffee shop Zürich")]
    #[case::forbidden_chars("Pay: 50% @ store_1 {x}", "Pay 50 store1 x")]
    #[case::only_forbidden("*** ;;", "")]
    #[case::kept_punctuation("Ref/1-2?(a).b,c'd+e", "Ref/1-2?(a).b,c'd+e")]
    fn sanitizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize(input), expected);
    }

    #[test]
    fn long_purpose_is_truncated_not_dropped() {
        let mut tx = coffee();
        tx.purpose = "A".repeat(1000);
        let plain = render(&tx, &Profile::plain());
        assert_eq!(plain.line86.content.chars().count(), MAX_86_LEN);
        assert_eq!(plain.line86.lines().len(), MAX_86_LINES);

        let profile = Profile::resolve(ProfileOptions {
            name: ProfileName::Starmoney,
            purp: "SALA".into(),
            ..ProfileOptions::default()
        })
        .unwrap();
        let sm = render(&tx, &profile);
        assert_eq!(sm.line86.content.chars().count(), MAX_86_LEN);
        assert!(sm.line86.content.starts_with("EREF+NONREF SVWZ+AAA"));
        assert!(sm.line86.content.ends_with(" PURP+SALA"));
        assert!(sm.line86.lines().iter().all(|l| l.trim_start_matches(":86:").chars().count() <= LINE_WIDTH));
    }

    #[test]
    fn wraps_at_line_width() {
        let line = TagLine::new(Tag::Information, "x".repeat(140));
        let lines = line.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], format!(":86:{}", "x".repeat(65)));
        assert_eq!(lines[1], "x".repeat(65));
        assert_eq!(lines[2], "x".repeat(10));
    }

    #[test]
    fn continuation_never_starts_with_dash() {
        let content = format!("{}-{}", "a".repeat(65), "b".repeat(10));
        let lines = TagLine::new(Tag::Information, content).lines();
        assert_eq!(lines[0], format!(":86:{}", "a".repeat(65)));
        assert_eq!(lines[1], format!(" -{}", "b".repeat(10)));
    }

    fn assert_safe_86(lines: &[String]) {
        assert!(lines.len() <= MAX_86_LINES, "{} lines", lines.len());
        assert!(lines[0].starts_with(":86:"));
        for l in &lines[1..] {
            assert!(!l.starts_with('-') && !l.starts_with(':'), "bad continuation {l:?}");
            assert!(l.chars().count() <= LINE_WIDTH);
        }
    }

    #[test]
    fn dash_runs_do_not_split_into_end_markers() {
        let mut tx = coffee();
        tx.purpose = format!("Order {}", "-".repeat(100));
        let lines = render(&tx, &Profile::plain()).line86.lines();
        assert_safe_86(&lines);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], format!(" {}", "-".repeat(41)));

        tx.purpose = "-".repeat(1000);
        assert_safe_86(&render(&tx, &Profile::plain()).line86.lines());
        assert_safe_86(&render(&tx, &Profile::starmoney()).line86.lines());
    }

    #[test]
    fn dash_at_every_split_keeps_six_lines() {
        let mut chars = vec!['a'; MAX_86_LEN];
        for k in 0..MAX_86_LINES {
            chars[65 + 64 * k] = '-';
        }
        let mut tx = coffee();
        tx.purpose = chars.into_iter().collect();
        let pair = render(&tx, &Profile::plain());
        assert_eq!(pair.line86.content.chars().count(), MAX_86_LEN);
        assert_safe_86(&pair.line86.lines());
    }

    #[rstest]
    #[case("DE89370400440532013000", true)]
    #[case("CH93 0076 2011 6238 5295 7", true)]
    #[case("", false)]
    #[case("1001:2002", false)]
    #[case("123456789012345678901234567890123456", false)]
    fn account_numbers(#[case] account: &str, #[case] valid: bool) {
        assert_eq!(is_valid_account(account), valid);
    }

    #[rstest]
    #[case("12.5", "12,50")]
    #[case("-12.50", "12,50")]
    #[case("0", "0,00")]
    #[case("1234567.8", "1234567,80")]
    #[case("12.500", "12,50")]
    fn amounts(#[case] value: &str, #[case] expected: &str) {
        assert_eq!(format_amount(Decimal::from_str_exact(value).unwrap()), expected);
    }

    #[test]
    fn balance_lines() {
        let b = Balance {
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            amount: Decimal::new(-7000, 2),
            currency: "EUR".into(),
        };
        assert_eq!(render_balance(Tag::ClosingBalance, &b).lines(), vec![":62F:D240105EUR70,00"]);
    }
}
