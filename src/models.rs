//! Data models for catalog items, buildings and recipes

use serde::{Deserialize, Deserializer};

use crate::rational::{Rational, RationalError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub is_raw_input: bool,
    #[serde(default)]
    pub is_fluid: bool,
    #[serde(default, deserialize_with = "stack_size")]
    pub stack_size: Option<u32>, // None for fluids
    #[serde(default)]
    pub img_url: String,
    #[serde(default)]
    pub wiki_url: String,
    #[serde(default)]
    pub wiki_img_url: String,
}

/// Scraped data marks fluids with a stack size of -1.
fn stack_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let size = Option::<f64>::deserialize(deserializer)?;
    Ok(size.filter(|size| *size >= 0.0).map(|size| size as u32))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub img_url: String,
    pub wiki_url: String,
    #[serde(default)]
    pub wiki_img_url: String,
}

/// A recipe input or output as stored: decimal amounts straight from the
/// scraped tables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeIoRecord {
    pub item_id: String,
    pub amount: f64,
    pub throughput: f64, // per minute
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRecord {
    pub id: String,
    pub name: String,
    pub building_id: String,
    #[serde(default)]
    pub is_alternate: bool,
    #[serde(default)]
    pub is_manual: bool,
    pub inputs: Vec<RecipeIoRecord>,
    pub outputs: Vec<RecipeIoRecord>,
    #[serde(default)]
    pub wiki_url: String,
}

/// A recipe input or output with exact amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeIo {
    pub item_id: String,
    pub amount: Rational,
    pub throughput: Rational,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub building_id: String,
    pub is_alternate: bool,
    pub is_manual: bool,
    pub inputs: Vec<RecipeIo>,
    pub outputs: Vec<RecipeIo>,
    pub wiki_url: String,
}

impl RecipeIoRecord {
    pub fn new(item_id: &str, amount: f64, throughput: f64) -> Self {
        RecipeIoRecord {
            item_id: item_id.to_string(),
            amount,
            throughput,
        }
    }

    fn to_exact(&self, precision: f64) -> Result<RecipeIo, RationalError> {
        Ok(RecipeIo {
            item_id: self.item_id.clone(),
            amount: Rational::from_decimal_with_precision(self.amount, precision)?,
            throughput: Rational::from_decimal_with_precision(self.throughput, precision)?,
        })
    }
}

impl RecipeRecord {
    /// Convert the stored decimals into exact rationals.
    pub fn to_recipe(&self, precision: f64) -> Result<Recipe, RationalError> {
        let convert = |ios: &[RecipeIoRecord]| {
            ios.iter()
                .map(|io| io.to_exact(precision))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(Recipe {
            id: self.id.clone(),
            name: self.name.clone(),
            building_id: self.building_id.clone(),
            is_alternate: self.is_alternate,
            is_manual: self.is_manual,
            inputs: convert(&self.inputs)?,
            outputs: convert(&self.outputs)?,
            wiki_url: self.wiki_url.clone(),
        })
    }
}

impl Recipe {
    /// Position and entry of `item_id` among the outputs.
    pub fn output(&self, item_id: &str) -> Option<(usize, &RecipeIo)> {
        self.outputs
            .iter()
            .enumerate()
            .find(|(_, io)| io.item_id == item_id)
    }

    /// Primary recipes are the ones the solver may pick on its own.
    pub fn is_primary(&self) -> bool {
        !self.is_alternate && !self.is_manual
    }
}
