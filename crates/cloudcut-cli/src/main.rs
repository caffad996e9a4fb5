use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use cloudcut_model::{Record, parse_audit_csv};
use cloudcut_search::query;
use cloudcut_sigma::analyse_records;
use tracing_subscriber::EnvFilter;

mod export;
mod format;

#[derive(Parser)]
#[command(name = "cloudcut")]
#[command(about = "Search and rule-match cloud audit-log exports")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Write matched events to this CSV file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter events with a query expression
    Search {
        /// Path to the audit CSV export
        #[arg(short, long)]
        file: PathBuf,

        /// Query expression.
        ///
        /// Operators: ==, !=, >, <, >=, <=, LIKE, AND, OR.
        /// Paths name typed fields, raw columns, or nested audit keys:
        ///   -q "Operation == 'MailItemsAccessed'"
        ///   -q "Subject LIKE 'payroll' AND ClientIP != '10.0.0.1'"
        ///   -q "AppAccessContext.UniqueTokenId == 'abc123'"
        #[arg(short, long)]
        query: Option<String>,

        /// Leftover words are appended to the query (for shells that strip
        /// quotes and split it)
        rest: Vec<String>,

        /// List the exportable columns and exit
        #[arg(long)]
        list: bool,

        /// Output format (log, json)
        #[arg(long, default_value = "log")]
        format: String,

        /// Limit the number of events printed (0 = no limit)
        #[arg(short, long, default_value_t = 0)]
        limit: usize,

        /// Print only the number of matching events
        #[arg(short, long)]
        count: bool,
    },

    /// Match events against a directory of detection rules
    Analyse {
        /// Path to the audit CSV export
        #[arg(short, long)]
        file: PathBuf,

        /// Path to the rule file or directory (searched recursively)
        #[arg(short, long)]
        rules: PathBuf,

        /// Output format (log, json)
        #[arg(long, default_value = "log")]
        format: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.log_file.as_deref());

    match cli.command {
        Commands::Search {
            file,
            query,
            rest,
            list,
            format,
            limit,
            count,
        } => cmd_search(
            cli.output.as_deref(),
            &file,
            query,
            rest,
            list,
            &format,
            limit,
            count,
        ),
        Commands::Analyse {
            file,
            rules,
            format,
        } => cmd_analyse(cli.output.as_deref(), &file, &rules, &format),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn cmd_search(
    output: Option<&Path>,
    file: &Path,
    expression: Option<String>,
    rest: Vec<String>,
    list: bool,
    format: &str,
    limit: usize,
    count: bool,
) {
    let records = load_records(file);

    if list {
        println!("Available columns:");
        println!("-----------------------");
        for column in export::columns(false) {
            println!(" - {column}");
        }
        return;
    }

    let Some(mut expression) = expression else {
        eprintln!("Error: no query given (use --query, or --list for columns)");
        process::exit(1);
    };
    for word in rest {
        expression.push(' ');
        expression.push_str(&word);
    }

    let matched = query(records, &expression);
    if matched.is_empty() {
        println!("No matches found...");
        return;
    }

    if let Some(path) = output {
        match export::export_csv(&matched, path, false) {
            Ok(()) => println!("Exported {} events to {}", matched.len(), path.display()),
            Err(e) => {
                eprintln!("Error exporting to CSV: {e}");
                process::exit(1);
            }
        }
    }

    let shown = if limit > 0 {
        matched.len().min(limit)
    } else {
        matched.len()
    };

    if count {
        println!("{shown}");
    } else if output.is_none() {
        for event in matched.iter().take(shown) {
            println!("{}", format::render(event, format));
        }
    }
}

fn cmd_analyse(output: Option<&Path>, file: &Path, rules: &Path, format: &str) {
    let records = load_records(file);

    let matched = analyse_records(&records, rules);
    if matched.is_empty() {
        println!("No matches found...");
        return;
    }

    if let Some(path) = output {
        match export::export_csv(&matched, path, true) {
            Ok(()) => println!("Exported {} events to {}", matched.len(), path.display()),
            Err(e) => {
                eprintln!("Error exporting to CSV: {e}");
                process::exit(1);
            }
        }
        return;
    }

    for event in &matched {
        println!("{}", format::render(event, format));
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_records(path: &Path) -> Vec<Record> {
    match parse_audit_csv(path) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            process::exit(1);
        }
    }
}

fn init_tracing(debug: bool, log_file: Option<&Path>) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(path);
            match file {
                Ok(file) => tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false)
                    .init(),
                Err(e) => {
                    eprintln!("Error opening log file {}: {e}", path.display());
                    process::exit(1);
                }
            }
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}
