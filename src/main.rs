use std::io::Write;
use std::path::Path;
use std::process;

use anyhow::Context;
use clap::Parser;
use polars::prelude::DataFrame;
use tracing::{error, info};

use specprep::cli::{apply_process_flags, Cli, Commands};
use specprep::config::Config;
use specprep::fits::{Hdu, HduList};
use specprep::io::{preprocess_folder, write_csv, write_csv_to};
use specprep::logging::init_logging;
use specprep::{extract_spectrum_from_fits, extract_spectrum_from_txt};

const EXIT_FILE_FAILURES: i32 = 2;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.verbosity()) {
        eprintln!("{e}");
    }
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            1
        }
    };
    process::exit(code);
}

fn emit(df: DataFrame, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            write_csv(&df, path)?;
            info!(output = %path.display(), rows = df.height(), "written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            write_csv_to(&df, &mut stdout)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let hdul = HduList::from_path(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    for (i, hdu) in hdul.iter().enumerate() {
        let name = hdu.name().unwrap_or("");
        match hdu {
            Hdu::BinTable(t) => {
                println!("{i:>3}  {:<9} {:<16} {} rows", hdu.kind(), name, t.nrows());
                for f in t.fields() {
                    println!("       {:<24} {}", f.name, f.format);
                }
            }
            _ => println!("{i:>3}  {:<9} {}", hdu.kind(), name),
        }
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config_flag = cli.config;
    let load = || Config::resolve(config_flag.as_deref());
    match cli.command {
        Commands::Process {
            input_dir,
            overwrite,
            no_offset_correction,
            join1,
            join2,
            suffix,
            jobs,
        } => {
            let mut config = load()?;
            apply_process_flags(
                &mut config,
                overwrite,
                no_offset_correction,
                join1,
                join2,
                suffix,
                jobs,
            );
            let report = preprocess_folder(&input_dir, &config.process_options())?;
            if report.has_failures() {
                return Ok(EXIT_FILE_FAILURES);
            }
        }
        Commands::Fits { file, output } => {
            let config = load()?;
            let df = extract_spectrum_from_fits(&file, &config.fits)?;
            emit(df, output.as_deref())?;
        }
        Commands::Txt {
            file,
            correct,
            join1,
            join2,
            output,
        } => {
            let mut config = load()?;
            if let Some(j) = join1 {
                config.offsets.join1 = j;
            }
            if let Some(j) = join2 {
                config.offsets.join2 = j;
            }
            let correction = correct.then_some(&config.offsets);
            let df = extract_spectrum_from_txt(&file, correction)?;
            emit(df, output.as_deref())?;
        }
        Commands::Inspect { file } => inspect(&file)?,
        Commands::InitConfig { path, force } => {
            let written = Config::init_file(config_flag.as_deref(), path, force)?;
            info!(path = %written.display(), "wrote config");
        }
    }
    Ok(0)
}
