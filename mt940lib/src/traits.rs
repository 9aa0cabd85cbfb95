//! Трэйты чтения строк CSV и записи готовой выписки на основе std::io::{Read, Write}.

use crate::{assemble::StatementDocument, error::Result};
use std::io::{Read, Write};

/// Одна запись CSV как есть: упорядоченные поля без какой-либо проверки.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRow {
    /// Номер физической строки входа (с 1), пустые строки тоже считаются.
    pub line: usize,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(line: usize, fields: Vec<String>) -> Self {
        Self { line, fields }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    Utf8,
    #[default]
    Latin1,
}

#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub delimiter: u8,
    pub encoding: Encoding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            encoding: Encoding::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Писать UTF-8 BOM в начало файла.
    pub bom: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { bom: true }
    }
}

pub trait ReadRows {
    fn read<R: Read>(r: R, opts: &ReadOptions) -> Result<Vec<RawRow>>;
}

pub trait WriteDocument {
    fn write<W: Write>(w: W, doc: &StatementDocument, opts: &WriteOptions) -> Result<()>;
}
