use mt940lib::{
    assemble::convert_rows,
    formats::{csv::Csv, mt940::Sta},
    normalize::{NormalizeConfig, Normalizer},
    profile::Profile,
    traits::{ReadOptions, ReadRows, WriteDocument, WriteOptions},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Пример: CSV (ISO-8859-1, ';') -> MT940 для StarMoney (stdin -> stdout)
    let rows = Csv::read(std::io::stdin(), &ReadOptions::default())?;
    let normalizer = Normalizer::new(NormalizeConfig::default())?;
    let conv = convert_rows(&rows, &normalizer, &Profile::starmoney())?;
    Sta::write(std::io::stdout(), &conv.document, &WriteOptions::default())?;
    Ok(())
}
