//! laketx CLI
//!
//! Commit to, inspect and verify a table directory.

use clap::{Parser, Subcommand};
use laketx::schema::{DataType, Field, Schema};
use laketx::{Config, LogEntry, Operation, Table};
use tracing_subscriber::{fmt, EnvFilter};

/// laketx CLI
#[derive(Parser, Debug)]
#[command(name = "laketx")]
#[command(about = "Transactional metadata log for table formats")]
#[command(version)]
struct Args {
    /// Table directory
    #[arg(short, long, default_value = "./laketx_table")]
    table: String,

    /// Maximum number of commit retries on version conflicts
    #[arg(long, default_value = "10")]
    max_retries: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Commit a change to the table
    Commit {
        /// Data file to add (repeatable)
        #[arg(long = "add")]
        added: Vec<String>,

        /// Data file to remove (repeatable)
        #[arg(long = "remove")]
        removed: Vec<String>,

        /// Schema field as name:type[:nullable][:from=<old name>] (repeatable).
        /// When given, the fields form the new table schema.
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<Field>,

        /// Commit info as key=value (repeatable)
        #[arg(long = "info", value_parser = parse_info)]
        info: Vec<(String, String)>,
    },

    /// Show a snapshot (latest by default)
    Show {
        /// Version to show
        #[arg(short, long)]
        version: Option<u64>,
    },

    /// List every log entry
    History,

    /// Check the log for gaps and corruption
    Verify,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,laketx=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> laketx::Result<()> {
    let config = Config::builder()
        .table_dir(&args.table)
        .max_commit_retries(args.max_retries)
        .build()?;
    let table = Table::open(config)?;

    match args.command {
        Commands::Commit {
            added,
            removed,
            fields,
            info,
        } => {
            let mut op = Operation::new();
            for path in added {
                op = op.add_file(path);
            }
            for path in removed {
                op = op.remove_file(path);
            }
            if !fields.is_empty() {
                op = op.with_schema(Schema::new(fields));
            }
            for (key, value) in info {
                op = op.with_info(key, value);
            }

            let mut txn = table.begin()?;
            let snapshot = txn.commit(op)?;
            println!("committed version {}", snapshot.snapshot_id());
        }
        Commands::Show { version } => {
            let snapshot = match version {
                Some(v) => table.snapshot(v)?,
                None => table.current()?,
            };

            println!("snapshot:  {}", snapshot.snapshot_id());
            println!("visible:   {}", snapshot.is_visible());
            match snapshot.schema() {
                Some(schema) => {
                    println!("schema:    #{}", schema.schema_id);
                    for field in &schema.fields {
                        let null = if field.nullable { "nullable" } else { "required" };
                        println!("  {:<24} {:<10} {}", field.name, field.data_type, null);
                    }
                }
                None => println!("schema:    (none)"),
            }
            println!("files:     {}", snapshot.live_files().len());
            for path in snapshot.live_files() {
                println!("  {}", path);
            }
        }
        Commands::History => {
            for entry in table.history()? {
                print_entry(&entry);
            }
        }
        Commands::Verify => {
            let Some(report) = table.verify_report() else {
                return Ok(());
            };
            println!("entries verified: {}", report.entries_verified);
            println!("last version:     {}", report.last_version);
            println!("gaps:             {:?}", report.gaps);
            println!("corrupted:        {:?}", report.corrupted);
            println!("stray files:      {:?}", report.stray_files);
            if !report.is_clean() {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}

fn print_entry(entry: &LogEntry) {
    let schema = entry
        .schema_id
        .map(|id| format!("schema #{}", id))
        .unwrap_or_else(|| "no schema".to_string());
    println!(
        "v{:<6} ts={} +{} -{} {}{}",
        entry.version,
        entry.timestamp,
        entry.operation.added.len(),
        entry.operation.removed.len(),
        schema,
        if entry.operation.schema.is_some() { " (changed)" } else { "" }
    );
    for (key, value) in &entry.operation.commit_info {
        println!("        {}={}", key, value);
    }
}

/// "name:type[:nullable][:from=old]"
fn parse_field(s: &str) -> Result<Field, String> {
    let mut parts = s.split(':');
    let name = parts.next().filter(|n| !n.is_empty()).ok_or("missing field name")?;
    let data_type: DataType = parts
        .next()
        .ok_or_else(|| format!("missing type for field `{}`", name))?
        .parse()
        .map_err(|e: laketx::LakeTxError| e.to_string())?;

    let mut field = Field::required(name, data_type);
    for flag in parts {
        match flag {
            "nullable" | "optional" => field.nullable = true,
            "required" => field.nullable = false,
            _ => match flag.strip_prefix("from=") {
                Some(previous) => field = field.renamed_from(previous),
                None => return Err(format!("unknown field flag `{}`", flag)),
            },
        }
    }

    Ok(field)
}

/// "key=value"
fn parse_info(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", s))?;
    Ok((key.to_string(), value.to_string()))
}
