mod cli;
mod debug_view;

use clap::Parser;
use cli::{Cli, DebugFormat};
use mt940lib::{
    assemble::{convert_rows, normalize_rows},
    error::{Mt940Error, Result},
    formats::{csv::Csv, mt940::Sta},
    normalize::Normalizer,
    profile::Profile,
    traits::{ReadRows, WriteDocument},
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli, &mut io::stdout()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Весь конвейер: проверка путей → CSV → нормализация → MT940 (или отладочный вывод в `out`).
fn run<O: Write>(cli: &Cli, out: &mut O) -> Result<()> {
    check_paths(cli)?;
    let profile = Profile::resolve(cli.profile_options())?;
    let normalizer = Normalizer::new(cli.normalize_config())?;

    let input = File::open(&cli.input).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!(
                "failed to open input CSV {} ({}): {e}",
                cli.input.display(),
                absolute(&cli.input).display()
            ),
        )
    })?;

    tracing::info!(input = %cli.input.display(), "start processing");
    let rows = Csv::read(BufReader::new(input), &cli.read_options())?;

    if cli.debug {
        let normalized =
            normalize_rows(&rows, &normalizer, profile.error_policy(), profile.limit())?;
        report_skipped(&normalized.skipped);
        let text = match cli.debug_format {
            DebugFormat::Table => debug_view::table(&normalized.transactions),
            DebugFormat::Json => debug_view::json(&normalized.transactions).map_err(io::Error::from)?,
        };
        writeln!(out, "{text}")?;
        return Ok(());
    }

    let conv = convert_rows(&rows, &normalizer, &profile)?;
    report_skipped(&conv.skipped);

    let file = File::create(&cli.output).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!(
                "failed to create output file {} ({}): {e}",
                cli.output.display(),
                absolute(&cli.output).display()
            ),
        )
    })?;
    let mut w = BufWriter::new(file);
    Sta::write(&mut w, &conv.document, &cli.write_options())?;
    w.flush()?;

    tracing::info!(
        transactions = conv.document.transaction_count(),
        output = %cli.output.display(),
        "end conversion"
    );
    Ok(())
}

fn check_paths(cli: &Cli) -> Result<()> {
    if !cli.input.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!(
                "input CSV not found: {} (absolute: {}, cwd: {})",
                cli.input.display(),
                absolute(&cli.input).display(),
                std::env::current_dir()?.display()
            ),
        )
        .into());
    }
    if cli.debug {
        return Ok(());
    }
    let out_dir = match absolute(&cli.output).parent() {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from("."),
    };
    if !out_dir.is_dir() {
        return Err(Mt940Error::from(io::Error::new(
            io::ErrorKind::NotFound,
            format!(
                "output directory does not exist: {} (given: {})",
                out_dir.display(),
                cli.output.display()
            ),
        )));
    }
    Ok(())
}

fn report_skipped(skipped: &[Mt940Error]) {
    if !skipped.is_empty() {
        eprintln!("Skipped {} invalid row(s):", skipped.len());
        for e in skipped {
            eprintln!("  {e}");
        }
    }
}

fn absolute(p: &Path) -> PathBuf {
    std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const INPUT: &str = "\
header
header
;1001;;03.01.2024;Coffee shop;food,misc;;EUR;;;-12,50;;03.01.2024
;1001;;04.01.2024;Salary;;;EUR;;;;100,00;
;;;;Total;;;;;;12,50;100,00;
";

    fn setup(input: &str) -> (TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let input_path = dir.path().join("in.csv");
        fs::write(&input_path, input).expect("write input");
        let output_path = dir.path().join("out.sta");
        (dir, input_path, output_path)
    }

    fn cli(input: &Path, output: &Path, extra: &[&str]) -> Cli {
        let mut args = vec!["csv2mt940".to_string()];
        args.extend(extra.iter().map(|s| s.to_string()));
        args.push(input.display().to_string());
        args.push(output.display().to_string());
        Cli::try_parse_from(args).expect("cli")
    }

    #[test]
    fn writes_starmoney_statement() {
        let (_dir, input, output) = setup(INPUT);
        let mut stdout: Vec<u8> = Vec::new();
        run(&cli(&input, &output, &["-p", "starmoney", "--no-bom"]), &mut stdout).unwrap();

        let sta = fs::read_to_string(&output).unwrap();
        let expected = [
            ":20:CSV2MT940240103",
            ":25:1001",
            ":28C:00001/001",
            ":60F:C240103EUR0,00",
            ":61:2401030103D12,50NTRFNONREF//NONREF",
            ":86:EREF+NONREF SVWZ+Coffee shop",
            ":61:2401040104C100,00NTRFNONREF//NONREF",
            ":86:EREF+NONREF SVWZ+Salary",
            ":62F:C240104EUR87,50",
            "-",
            "",
        ]
        .join("\r\n");
        assert_eq!(sta, expected);
        assert!(stdout.is_empty());
    }

    #[test]
    fn debug_mode_prints_rows_and_writes_nothing() {
        let (_dir, input, output) = setup(INPUT);
        let mut stdout: Vec<u8> = Vec::new();
        run(&cli(&input, &output, &["-d"]), &mut stdout).unwrap();

        let text = String::from_utf8(stdout).unwrap();
        assert!(text.contains("Coffee shop"));
        assert!(text.contains("Total bookings processed: 2"));
        assert!(!output.exists());
    }

    #[test]
    fn debug_json() {
        let (_dir, input, output) = setup(INPUT);
        let mut stdout: Vec<u8> = Vec::new();
        run(&cli(&input, &output, &["-d", "--debug-format", "json", "--limit", "1"]), &mut stdout)
            .unwrap();
        let v: serde_json::Value = serde_json::from_slice(&stdout).unwrap();
        assert_eq!(v.as_array().map(Vec::len), Some(1));
        assert_eq!(v[0]["purpose"], "Coffee shop");
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.csv");
        let err = run(&cli(&missing, &dir.path().join("o.sta"), &[]), &mut Vec::<u8>::new()).unwrap_err();
        assert!(err.to_string().contains("input CSV not found"));
    }

    #[test]
    fn missing_output_dir_is_reported() {
        let (dir, input, _) = setup(INPUT);
        let output = dir.path().join("no/such/dir/out.sta");
        let err = run(&cli(&input, &output, &[]), &mut Vec::<u8>::new()).unwrap_err();
        assert!(err.to_string().contains("output directory does not exist"));
    }

    #[test]
    fn strict_mode_stops_on_bad_row() {
        let bad = INPUT.replace("04.01.2024", "2024-01-04");
        let (_dir, input, output) = setup(&bad);
        let err = run(&cli(&input, &output, &[]), &mut Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, Mt940Error::DateFormat { row: 4, .. }));
        assert!(!output.exists());
    }

    #[test]
    fn skip_mode_writes_remaining_rows() {
        let bad = INPUT.replace("04.01.2024", "2024-01-04");
        let (_dir, input, output) = setup(&bad);
        run(&cli(&input, &output, &["--skip-invalid", "--no-bom"]), &mut Vec::<u8>::new()).unwrap();
        let sta = fs::read_to_string(&output).unwrap();
        assert_eq!(sta.matches(":61:").count(), 1);
        assert!(sta.contains(":62F:D240103EUR12,50"));
    }
}
