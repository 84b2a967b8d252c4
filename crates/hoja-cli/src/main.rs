//! Hoja CLI - edit and recompute sheet documents

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hoja::prelude::*;
use hoja::{scan_references, validate_expression};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hoja")]
#[command(author, version, about = "Spreadsheet formula engine over JSON sheet documents")]
struct Cli {
    /// Log calculation details to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Which reference cycles are reported
    #[arg(long, value_enum, default_value = "full", global = true)]
    cycles: Cycles,

    /// How a recompute orders its cells
    #[arg(long, value_enum, default_value = "dependency", global = true)]
    order: Order,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Cycles {
    /// Only formulas that read their own cell
    SelfReference,
    /// Any formula on a reference cycle
    Full,
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    /// Every cell reads the previous values
    Snapshot,
    /// Formulas run after the cells they read
    Dependency,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an empty document
    New {
        /// Output document file
        file: PathBuf,

        /// Document name
        #[arg(short, long, default_value = "New sheet")]
        name: String,

        /// Number of rows
        #[arg(long, default_value_t = hoja::DEFAULT_ROWS)]
        rows: u32,

        /// Number of columns
        #[arg(long, default_value_t = hoja::DEFAULT_COLS)]
        cols: u32,
    },

    /// Set cells and recompute (`A1 5 B1 =A1*2 ...`)
    Set {
        /// Document file
        file: PathBuf,

        /// Alternating cell ids and values; an empty value clears the cell
        #[arg(required = true, num_args = 2.., allow_hyphen_values = true)]
        assignments: Vec<String>,
    },

    /// Print the display value of a cell
    Get {
        /// Document file
        file: PathBuf,

        /// Cell id
        id: String,
    },

    /// Recompute every cell
    Recompute {
        /// Document file
        file: PathBuf,

        /// Output file (default: overwrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print every stored cell
    Show {
        /// Document file
        file: PathBuf,
    },

    /// Print the references of a formula with their offsets
    Refs {
        /// Formula text, leading `=` included
        formula: String,
    },

    /// Validate a formula
    Check {
        /// Formula text, leading `=` included
        formula: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let engine = CalculationEngine::new(options(&cli));

    match cli.command {
        Commands::New {
            file,
            name,
            rows,
            cols,
        } => new_document(&file, &name, rows, cols),
        Commands::Set { file, assignments } => set_cells(&engine, &file, &assignments),
        Commands::Get { file, id } => get_value(&file, &id),
        Commands::Recompute { file, output } => recompute(&engine, &file, output.as_deref()),
        Commands::Show { file } => show(&file),
        Commands::Refs { formula } => refs(&formula),
        Commands::Check { formula } => check(&formula),
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn options(cli: &Cli) -> CalculationOptions {
    CalculationOptions::default()
        .cycles(match cli.cycles {
            Cycles::SelfReference => CycleDetection::SelfReference,
            Cycles::Full => CycleDetection::Full,
        })
        .order(match cli.order {
            Order::Snapshot => RecomputeOrder::Snapshot,
            Order::Dependency => RecomputeOrder::Dependency,
        })
}

fn open(path: &Path) -> Result<SheetDocument> {
    let doc = SheetDocument::open(path)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;
    tracing::debug!("loaded '{}': {} cells", doc.name, doc.sheet.len());
    Ok(doc)
}

fn save(doc: &SheetDocument, path: &Path) -> Result<()> {
    doc.save(path)
        .with_context(|| format!("Failed to write '{}'", path.display()))
}

fn new_document(file: &Path, name: &str, rows: u32, cols: u32) -> Result<()> {
    let doc = SheetDocument::with_size(name, rows, cols);
    save(&doc, file)?;
    eprintln!("Created '{}' ({} rows x {} columns)", file.display(), rows, cols);
    Ok(())
}

fn set_cells(engine: &CalculationEngine, file: &Path, assignments: &[String]) -> Result<()> {
    if assignments.len() % 2 != 0 {
        bail!("Expected pairs of cell id and value, got {} arguments", assignments.len());
    }

    let mut doc = open(file)?;
    let updates = assignments
        .chunks(2)
        .map(|pair| {
            CellUpdate::parse(&pair[0], pair[1].clone())
                .with_context(|| format!("Invalid cell id '{}'", pair[0]))
        })
        .collect::<Result<Vec<_>>>()?;

    for update in &updates {
        if !doc.sheet.contains(update.coord) {
            bail!(
                "Cell {} is outside the sheet ({} rows x {} columns)",
                update.coord,
                doc.sheet.rows(),
                doc.sheet.cols()
            );
        }
    }

    let sheet = engine.update_cells(&doc.sheet, &updates, true);
    doc.sheet = engine.recompute_sheet(&sheet);
    save(&doc, file)?;

    for update in &updates {
        println!("{}\t{}", update.coord, get_cell(update.coord, &doc.sheet).display_value());
    }
    Ok(())
}

fn get_value(file: &Path, id: &str) -> Result<()> {
    let doc = open(file)?;
    let coord = id_to_coord(id).with_context(|| format!("Invalid cell id '{}'", id))?;
    println!("{}", get_cell(coord, &doc.sheet).display_value());
    Ok(())
}

fn recompute(engine: &CalculationEngine, file: &Path, output: Option<&Path>) -> Result<()> {
    let mut doc = open(file)?;
    let (sheet, stats) = engine.recompute_sheet_with_stats(&doc.sheet);
    doc.sheet = sheet;

    let target = output.unwrap_or(file);
    save(&doc, target)?;

    eprintln!(
        "Calculated {} formulas ({} errors, {} circular)",
        stats.formula_count, stats.errors, stats.circular_references
    );
    Ok(())
}

fn show(file: &Path) -> Result<()> {
    let doc = open(file)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for cell in doc.sheet.iter() {
        writeln!(
            out,
            "{}\t{}\t{}",
            cell.coord(),
            cell.value,
            cell.display_value()
        )
        .context("Failed to write to stdout")?;
    }
    Ok(())
}

fn refs(formula: &str) -> Result<()> {
    for reference in scan_references(formula) {
        println!("{}\t{}\t{}", reference.start, reference.end, reference.text);
    }
    Ok(())
}

fn check(formula: &str) -> Result<()> {
    match validate_expression(formula) {
        Ok(()) => println!("ok"),
        Err(e) => println!("{}", e.to_display()),
    }
    Ok(())
}
