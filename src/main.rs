use std::fs;
use std::io::{self, BufRead, Write};
use std::process;

use anyhow::{anyhow, Context, Result};
use bigcalc::calc_config::{check_prec, Config, Settings};
use bigcalc::calc_session::Session;
use bigcalc::calc_types::CalcError;
use clap::Parser as ClapParser;
use tracing::Level;

#[derive(ClapParser)]
#[command(author, version, about = "bigcalc - an arbitrary-precision calculator")]
struct Args {
    /// Files of statements to run, in order, as if by )get
    files: Vec<String>,

    /// Evaluate this text and exit
    #[arg(short, long)]
    expr: Option<String>,

    /// Floating-point precision in bits
    #[arg(long)]
    prec: Option<i64>,

    /// JSON file with initial settings (ibase, obase, origin, prec, format, prompt, seed, debug)
    #[arg(long)]
    config: Option<String>,

    /// Log directive and file handling to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_writer(io::stderr)
            .init();
    }

    if let Err(e) = run(&args) {
        eprintln!("{:#}", e);
        // A CalcError reaching this far is a defect, not a user mistake
        if e.downcast_ref::<CalcError>().is_some() {
            process::exit(2);
        }
        process::exit(1);
    }
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = Config::default();
    if let Some(path) = &args.config {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path))?;
        let settings = Settings::from_json(&text)
            .with_context(|| format!("parsing settings file {}", path))?;
        config
            .apply_settings(&settings)
            .map_err(|m| anyhow!("{}: {}", path, m))?;
    }
    if let Some(prec) = args.prec {
        let prec = check_prec(prec).map_err(|m| anyhow!("--prec: {}", m))?;
        config.set_float_prec(prec);
    }
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    let mut session = Session::stdio(config);

    for file in &args.files {
        session.run_file(file)?;
    }
    if let Some(expr) = &args.expr {
        session.run_source("<expr>", expr)?;
    }
    if args.files.is_empty() && args.expr.is_none() {
        repl(&mut session)?;
    }
    Ok(())
}

fn repl(session: &mut Session) -> Result<()> {
    let stdin = io::stdin();
    let mut line_number = 0;
    loop {
        let prompt = session.config.prompt().to_string();
        if !prompt.is_empty() {
            print!("{}", prompt);
            io::stdout().flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        line_number += 1;
        session.run_source_from("<stdin>", line_number, &line)?;
    }
    Ok(())
}
