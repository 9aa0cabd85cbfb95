//! Выгрузка TopCard: `;`-CSV без строки заголовков в смысле csv-крейта.
//! Заголовок и «итоговые» строки отсекает нормализатор, здесь только токенизация.

use crate::{
    error::{Mt940Error, Result},
    traits::{Encoding, RawRow, ReadOptions, ReadRows},
};
use csv::{Position, ReaderBuilder};
use std::io::{self, Read};

pub struct Csv;

impl ReadRows for Csv {
    fn read<R: Read>(mut r: R, opts: &ReadOptions) -> Result<Vec<RawRow>> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        let text = decode(bytes, opts.encoding)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

        let mut rdr = ReaderBuilder::new()
            .delimiter(opts.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for rec in rdr.records() {
            let rec = rec?;
            let line = rec
                .position()
                .map_or(rows.len() + 1, |p| record_line(text.as_bytes(), p));
            rows.push(RawRow::new(line, rec.iter().map(String::from).collect()));
        }
        tracing::debug!(rows = rows.len(), "read CSV rows");
        Ok(rows)
    }
}

/// Физическая строка начала записи. Позиция csv стоит перед пустыми строками,
/// которые он пропускает, поэтому их переводы строк досчитываем сами.
fn record_line(text: &[u8], pos: &Position) -> usize {
    let skipped = text
        .get(pos.byte() as usize..)
        .unwrap_or_default()
        .iter()
        .take_while(|b| matches!(b, b'\r' | b'\n'))
        .filter(|b| **b == b'\n')
        .count();
    pos.line() as usize + skipped
}

fn decode(bytes: Vec<u8>, encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Utf8 => String::from_utf8(bytes)
            .map_err(|e| Mt940Error::from(io::Error::new(io::ErrorKind::InvalidData, e))),
        // ISO-8859-1: каждый байт — ровно кодовая точка U+0000..U+00FF
        Encoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
    }
}
