//! Read-only catalog of items, buildings and recipes
//!
//! A `Catalog` is an immutable snapshot. Its lookup indexes are built once
//! when the value is constructed; picking up changes means loading a new
//! catalog.

use std::collections::HashMap;

use anyhow::{Context, Result};
use rusqlite::Connection;
use thiserror::Error;

use crate::db;
use crate::models::{Building, Item, Recipe, RecipeRecord};
use crate::rational::RationalError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    #[error("unable to find item with id \"{0}\"")]
    ItemNotFound(String),

    #[error("unable to find recipe with id \"{0}\"")]
    RecipeNotFound(String),

    #[error("unable to find building with id \"{0}\"")]
    BuildingNotFound(String),

    #[error("recipe \"{recipe}\" has an invalid amount: {source}")]
    InvalidAmount {
        recipe: String,
        source: RationalError,
    },
}

#[derive(Debug, Default)]
pub struct Catalog {
    items: HashMap<String, Item>,
    buildings: HashMap<String, Building>,
    recipes: Vec<Recipe>,
    recipe_index: HashMap<String, usize>,
    producers: HashMap<String, Vec<usize>>,
}

impl Catalog {
    /// Build a catalog; recipe order is kept as the catalog order.
    pub fn new(items: Vec<Item>, buildings: Vec<Building>, recipes: Vec<Recipe>) -> Catalog {
        let mut recipe_index = HashMap::new();
        let mut producers: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, recipe) in recipes.iter().enumerate() {
            recipe_index.insert(recipe.id.clone(), idx);
            for output in &recipe.outputs {
                let entry = producers.entry(output.item_id.clone()).or_default();
                if entry.last() != Some(&idx) {
                    entry.push(idx);
                }
            }
        }

        Catalog {
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
            buildings: buildings.into_iter().map(|b| (b.id.clone(), b)).collect(),
            recipes,
            recipe_index,
            producers,
        }
    }

    /// Build a catalog from stored records, converting decimals with `precision`.
    pub fn from_records(
        items: Vec<Item>,
        buildings: Vec<Building>,
        recipes: &[RecipeRecord],
        precision: f64,
    ) -> Result<Catalog, CatalogError> {
        let recipes = recipes
            .iter()
            .map(|record| {
                record
                    .to_recipe(precision)
                    .map_err(|source| CatalogError::InvalidAmount {
                        recipe: record.id.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Catalog::new(items, buildings, recipes))
    }

    /// Load the full catalog from the database
    pub fn load(conn: &Connection, precision: f64) -> Result<Catalog> {
        let items = db::list_items(conn).context("failed to load items")?;
        let buildings = db::list_buildings(conn).context("failed to load buildings")?;
        let recipes = db::list_recipes(conn).context("failed to load recipes")?;

        let catalog = Catalog::from_records(items, buildings, &recipes, precision)?;
        tracing::debug!(
            items = catalog.items.len(),
            buildings = catalog.buildings.len(),
            recipes = catalog.recipes.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn find_item(&self, item_id: &str) -> Option<&Item> {
        self.items.get(item_id)
    }

    pub fn item(&self, item_id: &str) -> Result<&Item, CatalogError> {
        self.find_item(item_id)
            .ok_or_else(|| CatalogError::ItemNotFound(item_id.to_string()))
    }

    pub fn find_recipe(&self, recipe_id: &str) -> Option<&Recipe> {
        self.recipe_index.get(recipe_id).map(|&idx| &self.recipes[idx])
    }

    pub fn recipe(&self, recipe_id: &str) -> Result<&Recipe, CatalogError> {
        self.find_recipe(recipe_id)
            .ok_or_else(|| CatalogError::RecipeNotFound(recipe_id.to_string()))
    }

    pub fn find_building(&self, building_id: &str) -> Option<&Building> {
        self.buildings.get(building_id)
    }

    pub fn building(&self, building_id: &str) -> Result<&Building, CatalogError> {
        self.find_building(building_id)
            .ok_or_else(|| CatalogError::BuildingNotFound(building_id.to_string()))
    }

    /// Display name of a building, falling back to its id.
    pub fn building_name<'a>(&'a self, building_id: &'a str) -> &'a str {
        self.find_building(building_id)
            .map_or(building_id, |b| b.name.as_str())
    }

    /// Display name of an item, falling back to its id.
    pub fn item_name<'a>(&'a self, item_id: &'a str) -> &'a str {
        self.find_item(item_id).map_or(item_id, |i| i.name.as_str())
    }

    /// All recipes whose outputs include `item_id`, in catalog order.
    pub fn recipes_producing<'a>(
        &'a self,
        item_id: &str,
    ) -> impl Iterator<Item = &'a Recipe> + use<'a> {
        self.producers
            .get(item_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&idx| &self.recipes[idx])
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Items sorted by name.
    pub fn items(&self) -> Vec<&Item> {
        let mut items: Vec<_> = self.items.values().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        items
    }
}
