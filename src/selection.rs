//! Primary recipe selection
//!
//! When several recipes can produce an item the solver needs exactly one.
//! The choice is made by a [`RecipePolicy`]; [`PrimaryRecipePolicy`] is a
//! best-effort approximation of which recipe the game intends as the
//! canonical one. Changing its ordering changes every solve that hits a tie.

use std::cmp::Ordering;

use crate::models::{Item, Recipe};

pub trait RecipePolicy {
    /// Whether the solver may pick `recipe` without the user asking for it.
    fn is_candidate(&self, recipe: &Recipe) -> bool {
        recipe.is_primary()
    }

    /// Order two candidates for `item`; `Less` means `a` is preferred.
    fn compare(&self, item: &Item, a: &Recipe, b: &Recipe) -> Ordering;

    /// Pick the preferred candidate. Ties keep the first in iteration order.
    fn select<'c, I>(&self, item: &Item, recipes: I) -> Option<&'c Recipe>
    where
        I: IntoIterator<Item = &'c Recipe>,
        Self: Sized,
    {
        recipes
            .into_iter()
            .filter(|recipe| self.is_candidate(recipe))
            .min_by(|a, b| self.compare(item, a, b))
    }
}

/// Tie-break order, first difference wins:
/// 1. the recipe sharing the item's id
/// 2. anything that is not an "unpackage" recipe
/// 3. the lowest position of the item among the outputs
/// 4. fewer outputs
/// 5. higher throughput of the item
/// 6. higher amount of the item per cycle
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimaryRecipePolicy;

const UNPACKAGE_PREFIX: &str = "unpackage-";

impl RecipePolicy for PrimaryRecipePolicy {
    fn compare(&self, item: &Item, a: &Recipe, b: &Recipe) -> Ordering {
        let same_id = |r: &Recipe| r.id != item.id;
        let unpackage = |r: &Recipe| r.id.contains(UNPACKAGE_PREFIX);

        let (a_idx, a_out) = match a.output(&item.id) {
            Some(found) => found,
            None => return Ordering::Greater,
        };
        let (b_idx, b_out) = match b.output(&item.id) {
            Some(found) => found,
            None => return Ordering::Less,
        };

        same_id(a)
            .cmp(&same_id(b))
            .then_with(|| unpackage(a).cmp(&unpackage(b)))
            .then_with(|| a_idx.cmp(&b_idx))
            .then_with(|| a.outputs.len().cmp(&b.outputs.len()))
            .then_with(|| b_out.throughput.cmp(&a_out.throughput))
            .then_with(|| b_out.amount.cmp(&a_out.amount))
    }
}
