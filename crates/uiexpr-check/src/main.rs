use std::{fs, path::PathBuf};

use clap::Parser;
use miette::{IntoDiagnostic, miette};
use tracing_subscriber::EnvFilter;
use uiexpr_check::Session;
use uiexpr_lang::Options;

/// Check binding expressions against a JSON type catalog
#[derive(Parser, Debug)]
#[command(
    name = "uiexpr-check",
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = "Check binding expressions against a JSON type catalog"
)]
struct Cli {
    /// Path to the JSON catalog description
    #[arg(short, long)]
    catalog: PathBuf,

    /// Context type the expressions are compiled against
    #[arg(short = 't', long)]
    context: String,

    /// Namespace imports, tried in order
    #[arg(short, long = "namespace")]
    namespaces: Vec<String>,

    /// JSON context instance to evaluate the expressions against
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Disable constant folding
    #[arg(long, default_value_t = false)]
    no_constant_folding: bool,

    /// Expressions to check
    #[arg(required = true)]
    exprs: Vec<String>,
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("uiexpr_check=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let catalog = fs::read_to_string(&cli.catalog).into_diagnostic()?;
    let session = Session::load(
        &catalog,
        &cli.context,
        &cli.namespaces,
        Options {
            constant_folding: !cli.no_constant_folding,
            ..Options::default()
        },
    )?;
    let instance = cli
        .data
        .as_ref()
        .map(|path| fs::read_to_string(path).into_diagnostic())
        .transpose()?
        .map(|data| session.instance(&data))
        .transpose()?;

    let mut failed = 0;
    for expr in &cli.exprs {
        match session.check(expr, instance.as_ref()) {
            Ok(outcome) => println!("{}", outcome),
            Err(err) => {
                eprintln!("{:?}", miette::Report::new(err));
                failed += 1;
            }
        }
    }

    if failed > 0 {
        Err(miette!("{} of {} expressions failed to compile", failed, cli.exprs.len()))
    } else {
        Ok(())
    }
}
