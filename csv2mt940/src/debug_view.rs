//! Отладочный вывод (-d): разобранные строки таблицей или JSON, без сборки выписки.

use mt940lib::{formats::mt940::format_amount, model::Transaction};

const HEADERS: [&str; 7] = [
    "Line#",
    "Value date",
    "Booking date",
    "D/C",
    "Amount",
    "CCY",
    "Comment",
];
const COMMENT_WIDTH: usize = 32;

pub fn table(txs: &[Transaction]) -> String {
    let rows: Vec<Vec<String>> = txs
        .iter()
        .map(|t| {
            vec![
                t.row.to_string(),
                t.value_date.format("%d.%m.%Y").to_string(),
                t.booking_date.format("%d.%m.%Y").to_string(),
                t.dc().mark().to_string(),
                format_amount(t.amount),
                t.currency.clone(),
                short_comment(&t.purpose),
            ]
        })
        .collect();

    let mut out = render_table(&HEADERS, &rows);
    out.push_str(&format!("\nTotal bookings processed: {}\n", txs.len()));
    out
}

pub fn json(txs: &[Transaction]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(txs)
}

fn short_comment(s: &str) -> String {
    if s.chars().count() > COMMENT_WIDTH + 1 {
        let head: String = s.chars().take(COMMENT_WIDTH).collect();
        format!("{head}…")
    } else {
        s.to_string()
    }
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let fmt_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<width$}", width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&fmt_row(headers.to_vec()));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in rows {
        out.push_str(&fmt_row(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}
