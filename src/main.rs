use std::{io::Read, path::PathBuf};

use anyhow::{bail, Context};
use log::debug;
use vulcan::{EvaluationContext, Outcome};

const USAGE: &str = "\
Usage: vulcan [options] [<input file>]

Reads a program from <input file>, or from stdin when none is given.

Options:
  -h, --help: Print this help message
  -e <source>: Evaluate <source> instead of reading a file
  --json: Print the outcome as {\"ok\": ..., \"output\" | \"type\", \"message\"}
  --stats: Print machine statistics to stderr after evaluating";

struct Options {
    json: bool,
    stats: bool,
    source: Option<String>,
    filename: Option<PathBuf>,
}

fn parse_options() -> anyhow::Result<Options> {
    let mut args = pico_args::Arguments::from_env();

    if args.contains(["-h", "--help"]) {
        println!("{}", USAGE);
        std::process::exit(0);
    }

    let options = Options {
        json: args.contains("--json"),
        stats: args.contains("--stats"),
        source: args.opt_value_from_str("-e")?,
        filename: args.opt_free_from_str()?,
    };

    let remaining = args.finish();
    if !remaining.is_empty() {
        bail!("unexpected arguments: {:?}", remaining);
    }
    if options.source.is_some() && options.filename.is_some() {
        bail!("`-e` and an input file cannot be combined");
    }

    Ok(options)
}

fn read_program(options: &Options) -> anyhow::Result<String> {
    if let Some(source) = &options.source {
        return Ok(source.clone());
    }

    match &options.filename {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source).context("failed to read stdin")?;
            Ok(source)
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let options = parse_options()?;
    let program = read_program(&options)?;
    debug!("read {} bytes of source", program.len());

    let mut context = EvaluationContext::new();
    let result = context.evaluate_str(&program);

    if options.stats {
        eprintln!("{}", serde_json::to_string(&context.last_run())?);
    }

    if options.json {
        let failed = result.is_err();
        println!("{}", serde_json::to_string(&Outcome::from(result))?);
        if failed { std::process::exit(1); }
        return Ok(());
    }

    println!("{}", result?);
    Ok(())
}
