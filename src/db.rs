//! Database schema and operations

use anyhow::Result;
use rusqlite::{Connection, Row};

use crate::models::{Building, Item, RecipeIoRecord, RecipeRecord};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            is_raw_input INTEGER NOT NULL,
            is_fluid INTEGER NOT NULL,
            stack_size INTEGER,
            img_url TEXT NOT NULL DEFAULT '',
            wiki_url TEXT NOT NULL DEFAULT '',
            wiki_img_url TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS buildings (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            img_url TEXT NOT NULL DEFAULT '',
            wiki_url TEXT NOT NULL DEFAULT '',
            wiki_img_url TEXT NOT NULL DEFAULT ''
        );

        -- rowid order is the catalog order used to break recipe ties
        CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            building_id TEXT NOT NULL,
            is_alternate INTEGER NOT NULL,
            is_manual INTEGER NOT NULL,
            wiki_url TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS recipe_inputs (
            recipe_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            amount REAL NOT NULL,
            throughput REAL NOT NULL,
            PRIMARY KEY (recipe_id, position)
        );

        CREATE TABLE IF NOT EXISTS recipe_outputs (
            recipe_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            amount REAL NOT NULL,
            throughput REAL NOT NULL,
            PRIMARY KEY (recipe_id, position)
        );

        CREATE INDEX IF NOT EXISTS idx_recipe_outputs_item ON recipe_outputs(item_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_inputs_item ON recipe_inputs(item_id);
        "#,
    )?;
    Ok(())
}

/// Insert or replace an item
pub fn upsert_item(conn: &Connection, item: &Item) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO items
             (id, name, is_raw_input, is_fluid, stack_size, img_url, wiki_url, wiki_img_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            &item.id,
            &item.name,
            item.is_raw_input,
            item.is_fluid,
            item.stack_size,
            &item.img_url,
            &item.wiki_url,
            &item.wiki_img_url,
        ),
    )?;
    Ok(())
}

/// Insert or replace a building
pub fn upsert_building(conn: &Connection, building: &Building) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO buildings (id, name, img_url, wiki_url, wiki_img_url)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            &building.id,
            &building.name,
            &building.img_url,
            &building.wiki_url,
            &building.wiki_img_url,
        ),
    )?;
    Ok(())
}

/// Insert or update a recipe together with its inputs and outputs.
/// Updating keeps the recipe's original position in catalog order.
pub fn upsert_recipe(conn: &Connection, recipe: &RecipeRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO recipes (id, name, building_id, is_alternate, is_manual, wiki_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            building_id = excluded.building_id,
            is_alternate = excluded.is_alternate,
            is_manual = excluded.is_manual,
            wiki_url = excluded.wiki_url",
        (
            &recipe.id,
            &recipe.name,
            &recipe.building_id,
            recipe.is_alternate,
            recipe.is_manual,
            &recipe.wiki_url,
        ),
    )?;

    for (table, ios) in [
        ("recipe_inputs", &recipe.inputs),
        ("recipe_outputs", &recipe.outputs),
    ] {
        conn.execute(&format!("DELETE FROM {table} WHERE recipe_id = ?1"), [&recipe.id])?;
        for (position, io) in ios.iter().enumerate() {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (recipe_id, position, item_id, amount, throughput)
                     VALUES (?1, ?2, ?3, ?4, ?5)"
                ),
                (&recipe.id, position as i64, &io.item_id, io.amount, io.throughput),
            )?;
        }
    }
    Ok(())
}

/// Clear the whole catalog (for re-extraction)
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM recipe_outputs;
        DELETE FROM recipe_inputs;
        DELETE FROM recipes;
        DELETE FROM buildings;
        DELETE FROM items;
        "#,
    )?;
    Ok(())
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        is_raw_input: row.get(2)?,
        is_fluid: row.get(3)?,
        stack_size: row.get(4)?,
        img_url: row.get(5)?,
        wiki_url: row.get(6)?,
        wiki_img_url: row.get(7)?,
    })
}

/// List all items ordered by name
pub fn list_items(conn: &Connection) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, is_raw_input, is_fluid, stack_size, img_url, wiki_url, wiki_img_url
         FROM items ORDER BY name",
    )?;

    let rows = stmt.query_map([], item_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List all buildings ordered by name
pub fn list_buildings(conn: &Connection) -> Result<Vec<Building>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, img_url, wiki_url, wiki_img_url FROM buildings ORDER BY name",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(Building {
            id: row.get(0)?,
            name: row.get(1)?,
            img_url: row.get(2)?,
            wiki_url: row.get(3)?,
            wiki_img_url: row.get(4)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn recipe_ios(conn: &Connection, table: &str, recipe_id: &str) -> Result<Vec<RecipeIoRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT item_id, amount, throughput FROM {table} WHERE recipe_id = ?1 ORDER BY position"
    ))?;

    let rows = stmt.query_map([recipe_id], |row| {
        Ok(RecipeIoRecord {
            item_id: row.get(0)?,
            amount: row.get(1)?,
            throughput: row.get(2)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List all recipes in catalog (insertion) order
pub fn list_recipes(conn: &Connection) -> Result<Vec<RecipeRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, building_id, is_alternate, is_manual, wiki_url
         FROM recipes ORDER BY rowid",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(RecipeRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            building_id: row.get(2)?,
            is_alternate: row.get(3)?,
            is_manual: row.get(4)?,
            inputs: Vec::new(),
            outputs: Vec::new(),
            wiki_url: row.get(5)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        let mut recipe = row?;
        recipe.inputs = recipe_ios(conn, "recipe_inputs", &recipe.id)?;
        recipe.outputs = recipe_ios(conn, "recipe_outputs", &recipe.id)?;
        results.push(recipe);
    }
    Ok(results)
}

/// Row counts per catalog table, in the order items, buildings, recipes
pub fn catalog_counts(conn: &Connection) -> Result<(usize, usize, usize)> {
    let count = |table: &str| -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(n as usize)
    };
    Ok((count("items")?, count("buildings")?, count("recipes")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn recipe(id: &str, output: &str) -> RecipeRecord {
        RecipeRecord {
            id: id.to_string(),
            name: id.to_string(),
            building_id: "constructor".to_string(),
            is_alternate: false,
            is_manual: false,
            inputs: vec![RecipeIoRecord::new("iron-ingot", 3.0, 30.0)],
            outputs: vec![RecipeIoRecord::new(output, 2.0, 20.0)],
            wiki_url: String::new(),
        }
    }

    #[test]
    fn recipes_keep_insertion_order_and_positions() {
        let conn = open();
        upsert_recipe(&conn, &recipe("zeta", "iron-plate")).unwrap();
        upsert_recipe(&conn, &recipe("alpha", "iron-plate")).unwrap();

        let mut multi = recipe("multi", "plastic");
        multi.outputs.push(RecipeIoRecord::new("heavy-oil-residue", 1.0, 10.0));
        upsert_recipe(&conn, &multi).unwrap();

        let recipes = list_recipes(&conn).unwrap();
        let ids: Vec<_> = recipes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["zeta", "alpha", "multi"]);
        assert_eq!(recipes[2].outputs, multi.outputs);
    }

    #[test]
    fn upsert_replaces_recipe_ios() {
        let conn = open();
        let mut plate = recipe("iron-plate", "iron-plate");
        upsert_recipe(&conn, &plate).unwrap();
        upsert_recipe(&conn, &recipe("screw", "screw")).unwrap();
        plate.inputs = vec![RecipeIoRecord::new("steel-ingot", 2.0, 20.0)];
        upsert_recipe(&conn, &plate).unwrap();

        let recipes = list_recipes(&conn).unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].id, "iron-plate");
        assert_eq!(recipes[0].inputs, plate.inputs);
    }

    #[test]
    fn clear_empties_every_table() {
        let conn = open();
        upsert_recipe(&conn, &recipe("iron-plate", "iron-plate")).unwrap();
        clear_catalog(&conn).unwrap();
        assert_eq!(catalog_counts(&conn).unwrap(), (0, 0, 0));
    }
}
