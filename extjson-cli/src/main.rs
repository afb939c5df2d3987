use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
    process,
};

use clap::Parser;
use extjson::{CanonicalValue, ParseOptions};
use eyre::{Result, WrapErr};

#[derive(Parser, Debug)]
#[clap(name = "extjson", about, version)]
struct Args {
    /// Increase output logging verbosity.
    #[clap(short, long)]
    verbose: bool,

    /// Print everything on a single line.
    #[clap(short, long)]
    compact: bool,

    /// Print canonical JSON with `$oid`/`$date`-style wrappers instead.
    #[clap(long)]
    json: bool,

    /// How deeply values may nest.
    #[clap(long, default_value_t = extjson::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// File to read. Reads standard input when omitted.
    file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    simple_logger::init_with_level(if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    })?;

    let text = read_input(args.file.as_ref())?;
    let opts = ParseOptions::default().with_max_depth(args.max_depth);
    let value = match extjson::parse_with(&text, &opts) {
        Ok(value) => value,
        Err(e) => {
            for diagnostic in e.diagnostics() {
                log::error!("{}", diagnostic);
            }
            log::error!("Failed: {}", e);
            process::exit(1);
        }
    };
    println!("{}", render(&value, &args)?);
    Ok(())
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => {
            log::debug!("Reading {}", path.display());
            fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .wrap_err("failed to read standard input")?;
            Ok(text)
        }
    }
}

fn render(value: &CanonicalValue, args: &Args) -> Result<String> {
    if !args.json {
        return Ok(extjson::serialize(value, !args.compact));
    }
    let json = value.to_json();
    Ok(if args.compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    })
}
