//! Built-in sample catalog covering the early iron, oil and aluminum chains
//!
//! Lets the calculator run without an imported data set and backs the tests.

use anyhow::Result;
use rusqlite::Connection;

use crate::db;
use crate::models::{Building, Item, RecipeIoRecord, RecipeRecord};

const WIKI: &str = "https://satisfactory.fandom.com/wiki";

fn item(id: &str, name: &str, is_raw_input: bool, stack_size: Option<u32>) -> Item {
    let page = name.replace(' ', "_");
    Item {
        id: id.to_string(),
        name: name.to_string(),
        is_raw_input,
        is_fluid: stack_size.is_none(),
        stack_size,
        img_url: format!("assets/images/{id}.png"),
        wiki_url: format!("{WIKI}/{page}"),
        wiki_img_url: String::new(),
    }
}

fn building(id: &str, name: &str) -> Building {
    Building {
        id: id.to_string(),
        name: name.to_string(),
        img_url: format!("assets/images/{id}.png"),
        wiki_url: format!("{WIKI}/{name}"),
        wiki_img_url: String::new(),
    }
}

/// `(item, amount per cycle, throughput per minute)`
type Io<'a> = (&'a str, f64, f64);

fn recipe(
    id: &str,
    name: &str,
    building_id: &str,
    inputs: &[Io<'_>],
    outputs: &[Io<'_>],
) -> RecipeRecord {
    let ios = |list: &[Io<'_>]| {
        list.iter()
            .map(|&(item_id, amount, throughput)| RecipeIoRecord::new(item_id, amount, throughput))
            .collect::<Vec<_>>()
    };
    RecipeRecord {
        id: id.to_string(),
        name: name.to_string(),
        building_id: building_id.to_string(),
        is_alternate: false,
        is_manual: false,
        inputs: ios(inputs),
        outputs: ios(outputs),
        wiki_url: format!("{WIKI}/{}", name.replace(' ', "_")),
    }
}

fn alternate(mut recipe: RecipeRecord) -> RecipeRecord {
    recipe.is_alternate = true;
    recipe
}

pub fn items() -> Vec<Item> {
    vec![
        item("iron-ore", "Iron Ore", true, Some(100)),
        item("copper-ore", "Copper Ore", true, Some(100)),
        item("limestone", "Limestone", true, Some(100)),
        item("coal", "Coal", true, Some(100)),
        item("bauxite", "Bauxite", true, Some(100)),
        item("raw-quartz", "Raw Quartz", true, Some(100)),
        item("crude-oil", "Crude Oil", true, None),
        item("water", "Water", true, None),
        item("iron-ingot", "Iron Ingot", false, Some(100)),
        item("copper-ingot", "Copper Ingot", false, Some(100)),
        item("iron-plate", "Iron Plate", false, Some(200)),
        item("iron-rod", "Iron Rod", false, Some(200)),
        item("screw", "Screw", false, Some(500)),
        item("reinforced-iron-plate", "Reinforced Iron Plate", false, Some(100)),
        item("modular-frame", "Modular Frame", false, Some(50)),
        item("wire", "Wire", false, Some(500)),
        item("cable", "Cable", false, Some(200)),
        item("concrete", "Concrete", false, Some(500)),
        item("plastic", "Plastic", false, Some(200)),
        item("rubber", "Rubber", false, Some(200)),
        item("heavy-oil-residue", "Heavy Oil Residue", false, None),
        item("polymer-resin", "Polymer Resin", false, Some(200)),
        item("alumina-solution", "Alumina Solution", false, None),
        item("aluminum-scrap", "Aluminum Scrap", false, Some(500)),
        item("aluminum-ingot", "Aluminum Ingot", false, Some(100)),
        item("silica", "Silica", false, Some(100)),
        item("alclad-aluminum-sheet", "Alclad Aluminum Sheet", false, Some(200)),
    ]
}

pub fn buildings() -> Vec<Building> {
    vec![
        building("smelter", "Smelter"),
        building("foundry", "Foundry"),
        building("constructor", "Constructor"),
        building("assembler", "Assembler"),
        building("manufacturer", "Manufacturer"),
        building("refinery", "Refinery"),
    ]
}

/// Recipes in catalog order.
pub fn recipes() -> Vec<RecipeRecord> {
    vec![
        recipe(
            "iron-ingot",
            "Iron Ingot",
            "smelter",
            &[("iron-ore", 1.0, 30.0)],
            &[("iron-ingot", 1.0, 30.0)],
        ),
        recipe(
            "copper-ingot",
            "Copper Ingot",
            "smelter",
            &[("copper-ore", 1.0, 30.0)],
            &[("copper-ingot", 1.0, 30.0)],
        ),
        recipe(
            "iron-plate",
            "Iron Plate",
            "constructor",
            &[("iron-ingot", 3.0, 30.0)],
            &[("iron-plate", 2.0, 20.0)],
        ),
        alternate(recipe(
            "coated-iron-plate",
            "Coated Iron Plate",
            "assembler",
            &[("iron-ingot", 10.0, 37.5), ("plastic", 2.0, 7.5)],
            &[("iron-plate", 15.0, 75.0)],
        )),
        recipe(
            "iron-rod",
            "Iron Rod",
            "constructor",
            &[("iron-ingot", 1.0, 15.0)],
            &[("iron-rod", 1.0, 15.0)],
        ),
        recipe(
            "screw",
            "Screw",
            "constructor",
            &[("iron-rod", 1.0, 10.0)],
            &[("screw", 4.0, 40.0)],
        ),
        alternate(recipe(
            "cast-screw",
            "Cast Screw",
            "constructor",
            &[("iron-ingot", 5.0, 12.5)],
            &[("screw", 20.0, 50.0)],
        )),
        recipe(
            "reinforced-iron-plate",
            "Reinforced Iron Plate",
            "assembler",
            &[("iron-plate", 6.0, 30.0), ("screw", 12.0, 60.0)],
            &[("reinforced-iron-plate", 1.0, 5.0)],
        ),
        recipe(
            "modular-frame",
            "Modular Frame",
            "assembler",
            &[("reinforced-iron-plate", 3.0, 3.0), ("iron-rod", 12.0, 12.0)],
            &[("modular-frame", 2.0, 2.0)],
        ),
        recipe(
            "wire",
            "Wire",
            "constructor",
            &[("copper-ingot", 1.0, 15.0)],
            &[("wire", 2.0, 30.0)],
        ),
        recipe(
            "cable",
            "Cable",
            "constructor",
            &[("wire", 2.0, 60.0)],
            &[("cable", 1.0, 30.0)],
        ),
        recipe(
            "concrete",
            "Concrete",
            "constructor",
            &[("limestone", 3.0, 45.0)],
            &[("concrete", 1.0, 15.0)],
        ),
        recipe(
            "plastic",
            "Plastic",
            "refinery",
            &[("crude-oil", 3.0, 30.0)],
            &[("plastic", 2.0, 20.0), ("heavy-oil-residue", 1.0, 10.0)],
        ),
        recipe(
            "rubber",
            "Rubber",
            "refinery",
            &[("crude-oil", 3.0, 30.0)],
            &[("rubber", 2.0, 20.0), ("heavy-oil-residue", 2.0, 20.0)],
        ),
        recipe(
            "residual-plastic",
            "Residual Plastic",
            "refinery",
            &[("polymer-resin", 6.0, 60.0), ("water", 2.0, 20.0)],
            &[("plastic", 2.0, 20.0)],
        ),
        alternate(recipe(
            "heavy-oil-residue",
            "Heavy Oil Residue",
            "refinery",
            &[("crude-oil", 3.0, 30.0)],
            &[("heavy-oil-residue", 4.0, 40.0), ("polymer-resin", 2.0, 20.0)],
        )),
        recipe(
            "alumina-solution",
            "Alumina Solution",
            "refinery",
            &[("bauxite", 12.0, 120.0), ("water", 18.0, 180.0)],
            &[("alumina-solution", 12.0, 120.0), ("silica", 5.0, 50.0)],
        ),
        recipe(
            "aluminum-scrap",
            "Aluminum Scrap",
            "refinery",
            &[("alumina-solution", 4.0, 240.0), ("coal", 2.0, 120.0)],
            &[("aluminum-scrap", 6.0, 360.0), ("water", 2.0, 120.0)],
        ),
        recipe(
            "aluminum-ingot",
            "Aluminum Ingot",
            "foundry",
            &[("aluminum-scrap", 6.0, 90.0), ("silica", 5.0, 75.0)],
            &[("aluminum-ingot", 4.0, 60.0)],
        ),
        recipe(
            "silica",
            "Silica",
            "constructor",
            &[("raw-quartz", 3.0, 22.5)],
            &[("silica", 5.0, 37.5)],
        ),
        recipe(
            "alclad-aluminum-sheet",
            "Alclad Aluminum Sheet",
            "assembler",
            &[("aluminum-ingot", 3.0, 30.0), ("copper-ingot", 1.0, 10.0)],
            &[("alclad-aluminum-sheet", 3.0, 30.0)],
        ),
    ]
}

/// Replace the catalog with the sample data set, returning the number of
/// items, buildings and recipes stored.
pub fn load_sample_data(conn: &Connection) -> Result<(usize, usize, usize)> {
    db::clear_catalog(conn)?;

    let items = items();
    for item in &items {
        db::upsert_item(conn, item)?;
    }
    let buildings = buildings();
    for building in &buildings {
        db::upsert_building(conn, building)?;
    }
    let recipes = recipes();
    for recipe in &recipes {
        db::upsert_recipe(conn, recipe)?;
    }

    Ok((items.len(), buildings.len(), recipes.len()))
}

/// An in-memory database holding the sample catalog.
#[cfg(test)]
pub fn connection() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory database");
    db::init_schema(&conn).expect("schema");
    load_sample_data(&conn).expect("sample data");
    conn
}

#[cfg(test)]
pub fn catalog() -> crate::catalog::Catalog {
    crate::catalog::Catalog::load(&connection(), crate::rational::DEFAULT_PRECISION)
        .expect("sample catalog")
}
