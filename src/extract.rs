//! Import of generated catalog data modules
//!
//! The offline scraper writes the catalog as TypeScript modules
//! (`export const ITEMS: readonly Item[] = [...]`) or plain JSON. This module
//! walks a directory for such files, deserializes the exported literal,
//! classifies every record as an item, building or recipe by the fields it
//! carries and stores them in the database.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::Value;
use walkdir::WalkDir;

use crate::db;
use crate::models::{Building, Item, RecipeRecord};

const EXTENSIONS: [&str; 3] = ["ts", "js", "json"];

const EXPORT_PATTERN: &str = r"export\s+(?:default\s+)?(?:const\s+\w+[^=]*=)?";

/// Parse the literal of a data module.
///
/// Module sources have their `export` prefix and trailing `;` stripped and
/// are read as JSON5, since the formatter leaves bare keys and trailing
/// commas. Anything without an export is plain JSON.
pub fn parse_module(content: &str) -> Result<Value> {
    let export_re = Regex::new(EXPORT_PATTERN)?;
    match export_re.find(content) {
        Some(m) => {
            let body = content[m.end()..].trim_end();
            let body = body.strip_suffix(';').unwrap_or(body);
            json5::from_str(body).context("invalid data module literal")
        }
        None => serde_json::from_str(content).context("invalid JSON"),
    }
}

/// One catalog record found in a data module
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Item(Item),
    Building(Building),
    Recipe(RecipeRecord),
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T> {
    Ok(serde_json::from_value(value.clone())?)
}

/// Classify a record by its fields; `Ok(None)` for objects that are none of
/// the known kinds.
pub fn classify(value: &Value) -> Result<Option<Record>> {
    let has = |field: &str| value.get(field).is_some();

    if has("buildingId") {
        return Ok(Some(Record::Recipe(decode(value)?)));
    }
    if has("isRawInput") {
        return Ok(Some(Record::Item(decode(value)?)));
    }
    if has("id") && has("name") && has("wikiUrl") {
        return Ok(Some(Record::Building(decode(value)?)));
    }
    Ok(None)
}

/// Top-level records of a literal: array elements, the values of an
/// id-keyed map, or a single record.
fn records(root: Value) -> Vec<Value> {
    match root {
        Value::Array(values) => values,
        Value::Object(fields) if !fields.contains_key("id") => {
            fields.into_iter().map(|(_, v)| v).collect()
        }
        single => vec![single],
    }
}

/// Find all data modules below `data_dir`, in path order
pub fn find_data_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        bail!("{} is not a directory", data_dir.display());
    }

    let files = WalkDir::new(data_dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext))
        })
        .collect();
    Ok(files)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractStats {
    pub files: usize,
    pub items: usize,
    pub buildings: usize,
    pub recipes: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} items, {} buildings and {} recipes from {} files. Skipped: {}, Errors: {}",
            self.items, self.buildings, self.recipes, self.files, self.skipped, self.errors
        )
    }
}

/// Store every record of one module's source text
pub fn import_source(conn: &Connection, content: &str, stats: &mut ExtractStats) -> Result<()> {
    let root = parse_module(content)?;
    for value in records(root) {
        match classify(&value) {
            Ok(Some(Record::Item(item))) => {
                db::upsert_item(conn, &item)?;
                stats.items += 1;
            }
            Ok(Some(Record::Building(building))) => {
                db::upsert_building(conn, &building)?;
                stats.buildings += 1;
            }
            Ok(Some(Record::Recipe(recipe))) => {
                db::upsert_recipe(conn, &recipe)?;
                stats.recipes += 1;
            }
            Ok(None) => stats.skipped += 1,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed record");
                stats.errors += 1;
            }
        }
    }
    Ok(())
}

/// Import all data modules below `data_dir` into the database
pub fn extract_to_database(conn: &Connection, data_dir: &Path) -> Result<ExtractStats> {
    let mut stats = ExtractStats::default();

    println!("Scanning {} for data modules...", data_dir.display());
    let files = find_data_files(data_dir)?;
    println!("Found {} candidate files", files.len());

    for path in &files {
        let result = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .and_then(|content| import_source(conn, &content, &mut stats));
        match result {
            Ok(()) => {
                stats.files += 1;
                tracing::debug!(file = %path.display(), "imported data module");
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "failed to import data module");
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}
