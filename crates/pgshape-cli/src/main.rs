mod config;

use clap::{Parser, Subcommand};
use config::{ConnectionArgs, DestinationArgs, QualifiedName};
use owo_colors::OwoColorize;
use pgshape::{Channel, Psql, Reporter, Table, introspect, reporter_for};
use std::io::{self, Write};
use std::process::ExitCode;
use thiserror::Error;

/// Exit code of `compare` when the tables differ.
const EXIT_DIFFERENT: u8 = 3;

/// Compare Postgres table shapes and render column clauses.
#[derive(Parser, Debug)]
#[command(name = "pgshape", version)]
struct Cli {
    /// Print every statement and progress line, prefixed by inf/src/dst
    #[arg(short, long, global = true)]
    verbose: bool,

    /// psql binary to run
    #[arg(long, global = true, env = "PGSHAPE_PSQL", default_value = "psql")]
    psql: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the column list of a table
    Columns {
        #[command(flatten)]
        conn: ConnectionArgs,
        /// Table as [schema.]table
        table: QualifiedName,
    },
    /// Print the column list with oversized text and json truncated
    Casts {
        #[command(flatten)]
        conn: ConnectionArgs,
        /// Table as [schema.]table
        table: QualifiedName,
    },
    /// Print `<column> <type>` definitions for CREATE TABLE
    Definitions {
        #[command(flatten)]
        conn: ConnectionArgs,
        /// Table as [schema.]table
        table: QualifiedName,
    },
    /// Compare the shape of two tables
    Compare {
        #[command(flatten)]
        conn: ConnectionArgs,
        #[command(flatten)]
        dst: DestinationArgs,
        /// Source table as [schema.]table
        src_table: QualifiedName,
        /// Destination table as [schema.]table
        dst_table: QualifiedName,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Pgshape(#[from] pgshape::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Result of comparing a source table against a destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Equivalent,
    Subset,
    Different,
}

impl Verdict {
    fn of(src: &Table, dst: &Table) -> Self {
        if src.is_equivalent_to(dst) {
            Verdict::Equivalent
        } else if src.is_subset_of(dst) {
            Verdict::Subset
        } else {
            Verdict::Different
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Verdict::Equivalent => "equivalent",
            Verdict::Subset => "subset",
            Verdict::Different => "different",
        }
    }

    fn exit_code(&self) -> ExitCode {
        match self {
            Verdict::Equivalent | Verdict::Subset => ExitCode::SUCCESS,
            Verdict::Different => ExitCode::from(EXIT_DIFFERENT),
        }
    }
}

fn main() -> ExitCode {
    let dotenv = config::load_dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let verbose = cli.verbose;
    let diagnostics = || reporter_for(verbose, io::stderr());
    match run(cli, &mut io::stdout().lock(), &diagnostics) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout only carries rendered SQL.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "pgshape=debug"
    } else {
        "pgshape=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();
}

/// Run one command. Rendered SQL goes to `out`; diagnostics go to the
/// reporters built by `diagnostics`.
fn run(
    cli: Cli,
    out: &mut dyn Write,
    diagnostics: &dyn Fn() -> Box<dyn Reporter>,
) -> Result<ExitCode, CliError> {
    let program = cli.psql;
    let fetch = |conn: &ConnectionArgs, name: &QualifiedName, channel: Channel| {
        let psql = Psql::new(config::endpoint(conn, name, channel), diagnostics())
            .with_program(&program);
        introspect(&psql)?.require(&name.schema, &name.table)
    };

    match cli.command {
        Commands::Columns { conn, table } => {
            let table = fetch(&conn, &table, Channel::Source)?;
            writeln!(out, "{}", table.render_column_list())?;
        }
        Commands::Casts { conn, table } => {
            let table = fetch(&conn, &table, Channel::Source)?;
            writeln!(out, "{}", table.render_cast_column_list())?;
        }
        Commands::Definitions { conn, table } => {
            let table = fetch(&conn, &table, Channel::Source)?;
            writeln!(out, "{}", table.render_column_definitions())?;
        }
        Commands::Compare {
            conn,
            dst,
            src_table,
            dst_table,
        } => {
            let src = fetch(&conn, &src_table, Channel::Source)?;
            let dst = fetch(&dst.apply(&conn), &dst_table, Channel::Destination)?;

            let verdict = Verdict::of(&src, &dst);
            tracing::info!(src = %src_table, dst = %dst_table, verdict = verdict.as_str(), "compared");
            if verdict == Verdict::Different {
                report_difference(&src, &dst);
            }
            writeln!(out, "{}", verdict.as_str())?;
            return Ok(verdict.exit_code());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Describe the first mismatching position on stderr.
fn report_difference(src: &Table, dst: &Table) {
    let Some(pos) = src.first_difference(dst) else {
        return;
    };
    let describe = |table: &Table| match table.columns.get(pos) {
        Some(col) => format!("{} {}", col.name, col.canonical_type()),
        None => "(missing)".to_string(),
    };
    eprintln!(
        "{} column {}: {} {} {}",
        "mismatch".yellow().bold(),
        pos + 1,
        describe(src).red(),
        "vs".dimmed(),
        describe(dst).green()
    );
}
