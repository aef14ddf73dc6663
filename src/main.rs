//! Satisfactory Production Calculator
//!
//! Exact production chain solver for Satisfactory recipe catalogs.

mod catalog;
mod db;
mod equations;
mod extract;
mod graph;
mod matrix;
mod models;
mod rational;
mod report;
mod resolver;
mod sample;
mod selection;
mod solver;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use crate::catalog::Catalog;
use crate::rational::{DEFAULT_PRECISION, Rational};

#[derive(Parser)]
#[command(name = "satisfactory-calculator")]
#[command(about = "Exact production chain solver for Satisfactory")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, global = true, default_value = "satisfactory_data.db")]
    database: PathBuf,

    /// Tolerance used when converting decimal amounts to fractions
    #[arg(long, global = true, default_value_t = DEFAULT_PRECISION)]
    precision: f64,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    /// Every recipe with its feeds
    #[default]
    Text,
    /// Totals per building, raw inputs and byproducts
    Summary,
    /// Graphviz diagram
    Dot,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Load the built-in sample catalog
    LoadSample,

    /// Import generated item, building and recipe data modules
    Extract {
        /// Directory containing the data modules
        data_dir: PathBuf,

        /// Clear existing data before importing
        #[arg(long)]
        clear: bool,
    },

    /// Solve the production chain for an item
    Solve {
        /// Item id or name (e.g. "modular-frame")
        item: String,

        /// Target rate in units per minute, decimal or fraction ("10", "7.5", "40/3")
        #[arg(short, long, default_value = "1")]
        rate: String,

        /// Log every row reduction step
        #[arg(long)]
        debug: bool,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// List all items in the catalog
    ListItems {
        /// Only raw inputs
        #[arg(long)]
        raw: bool,
    },

    /// List recipes in catalog order
    ListRecipes {
        /// Only recipes producing this item
        #[arg(long)]
        produces: Option<String>,
    },

    /// Show details for a specific item
    Item {
        /// Item ID
        id: String,
    },

    /// Show details for a specific recipe
    Recipe {
        /// Recipe ID
        id: String,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "satisfactory_calculator=debug"
    } else {
        "satisfactory_calculator=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse "n/d" exactly, anything else as a decimal
fn parse_rate(rate: &str, precision: f64) -> Result<Rational> {
    if rate.contains('/') {
        return rate.parse::<Rational>().with_context(|| format!("invalid rate \"{rate}\""));
    }
    let value: f64 = rate.trim().parse().with_context(|| format!("invalid rate \"{rate}\""))?;
    Ok(Rational::from_decimal_with_precision(value, precision)?)
}

/// Accept an item id or, failing that, a case-insensitive item name
fn find_item_id<'c>(catalog: &'c Catalog, query: &str) -> Option<&'c str> {
    if let Some(item) = catalog.find_item(query) {
        return Some(&item.id);
    }
    catalog
        .items()
        .into_iter()
        .find(|item| item.name.eq_ignore_ascii_case(query))
        .map(|item| item.id.as_str())
}

fn load_catalog(conn: &Connection, precision: f64) -> Result<Catalog> {
    let catalog = Catalog::load(conn, precision)?;
    if catalog.recipes().is_empty() {
        bail!("No recipes in database. Run 'extract' or 'load-sample' first.");
    }
    Ok(catalog)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let solve_debug = matches!(cli.command, Commands::Solve { debug: true, .. });
    init_logging(cli.verbose || solve_debug);

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            let (items, buildings, recipes) = db::catalog_counts(&conn)?;
            println!("Database initialized at: {}", cli.database.display());
            println!("  {} items, {} buildings, {} recipes", items, buildings, recipes);
        }

        Commands::LoadSample => {
            let (items, buildings, recipes) = sample::load_sample_data(&conn)?;
            println!("Sample data loaded successfully!");
            println!("  {} items, {} buildings, {} recipes", items, buildings, recipes);
        }

        Commands::Extract { data_dir, clear } => {
            if clear {
                println!("Clearing existing data...");
                db::clear_catalog(&conn)?;
            }

            let stats = extract::extract_to_database(&conn, &data_dir)?;
            println!("\n{}", stats);
        }

        Commands::Solve {
            item,
            rate,
            debug,
            format,
        } => {
            let catalog = load_catalog(&conn, cli.precision)?;
            let rate = parse_rate(&rate, cli.precision)?;
            let item_id = find_item_id(&catalog, &item).unwrap_or(item.as_str());

            let graph = solver::solve(&catalog, item_id, rate, debug)?;
            match format {
                OutputFormat::Text => println!("{}", report::format_solved_graph(&catalog, &graph)),
                OutputFormat::Summary => {
                    print!("{}", report::summarize(&catalog, &graph, item_id, rate)?);
                }
                OutputFormat::Dot => print!("{}", report::to_dot(&catalog, &graph)),
            }
        }

        Commands::ListItems { raw } => {
            let catalog = Catalog::load(&conn, cli.precision)?;
            let items: Vec<_> = catalog
                .items()
                .into_iter()
                .filter(|item| !raw || item.is_raw_input)
                .collect();
            if items.is_empty() {
                println!("No items in database. Run 'extract' or 'load-sample' first.");
            } else {
                println!("{:<32} {:<32} {:>6} {:>6}", "ID", "Item", "Raw", "Fluid");
                println!("{}", "-".repeat(79));
                for item in items {
                    println!(
                        "{:<32} {:<32} {:>6} {:>6}",
                        item.id,
                        item.name,
                        if item.is_raw_input { "yes" } else { "" },
                        if item.is_fluid { "yes" } else { "" }
                    );
                }
            }
        }

        Commands::ListRecipes { produces } => {
            let catalog = Catalog::load(&conn, cli.precision)?;
            let recipes: Vec<_> = match &produces {
                Some(item) => catalog.recipes_producing(item).collect(),
                None => catalog.recipes().iter().collect(),
            };
            if recipes.is_empty() {
                println!("No matching recipes.");
            } else {
                println!("{:<36} {:<16} {}", "Recipe", "Building", "Kind");
                println!("{}", "-".repeat(64));
                for recipe in recipes {
                    let kind = if recipe.is_manual {
                        "manual"
                    } else if recipe.is_alternate {
                        "alternate"
                    } else {
                        ""
                    };
                    println!(
                        "{:<36} {:<16} {}",
                        recipe.id,
                        catalog.building_name(&recipe.building_id),
                        kind
                    );
                }
            }
        }

        Commands::Item { id } => {
            let catalog = Catalog::load(&conn, cli.precision)?;
            match catalog.find_item(&id) {
                Some(item) => {
                    println!("Item: {}", item.name);
                    println!("  ID: {}", item.id);
                    println!("  Raw input: {}", item.is_raw_input);
                    match item.stack_size {
                        Some(size) => println!("  Stack size: {}", size),
                        None => println!("  Fluid"),
                    }
                    if !item.wiki_url.is_empty() {
                        println!("  Wiki: {}", item.wiki_url);
                    }

                    let producers: Vec<_> = catalog.recipes_producing(&id).collect();
                    if !producers.is_empty() {
                        println!("  Produced by:");
                        for recipe in producers {
                            let alt = if recipe.is_alternate { " (alternate)" } else { "" };
                            println!("    {}{}", recipe.id, alt);
                        }
                    }
                    let consumers: Vec<_> = catalog
                        .recipes()
                        .iter()
                        .filter(|r| r.inputs.iter().any(|io| io.item_id == id))
                        .collect();
                    if !consumers.is_empty() {
                        println!("  Used by:");
                        for recipe in consumers {
                            println!("    {}", recipe.id);
                        }
                    }
                }
                None => println!("Item '{}' not found", id),
            }
        }

        Commands::Recipe { id } => {
            let catalog = Catalog::load(&conn, cli.precision)?;
            match catalog.find_recipe(&id) {
                Some(recipe) => {
                    println!("Recipe: {}", recipe.name);
                    println!("  ID: {}", recipe.id);
                    println!("  Building: {}", catalog.building_name(&recipe.building_id));
                    println!("  Alternate: {}", recipe.is_alternate);
                    println!("  Manual: {}", recipe.is_manual);
                    println!("  Inputs:");
                    for io in &recipe.inputs {
                        println!(
                            "    {} x{} @ {}/min",
                            catalog.item_name(&io.item_id),
                            io.amount,
                            io.throughput
                        );
                    }
                    println!("  Outputs:");
                    for io in &recipe.outputs {
                        println!(
                            "    {} x{} @ {}/min",
                            catalog.item_name(&io.item_id),
                            io.amount,
                            io.throughput
                        );
                    }
                }
                None => println!("Recipe '{}' not found", id),
            }
        }
    }

    Ok(())
}
