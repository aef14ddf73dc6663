//! The linked-recipe graph built by a single solve
//!
//! Nodes live in an arena in discovery order and are addressed by their
//! catalog recipe id. Feeds are addressed by [`FeedKey`]; a link is the key of
//! the counterpart feed, so fan-out, fan-in and recycle loops never create
//! reference cycles.

use std::collections::HashMap;
use std::fmt;

use crate::models::{Recipe, RecipeIo};
use crate::rational::{Rational, RationalError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
        }
    }
}

/// Address of one feed: `(recipe, input/output, item, feed index)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey {
    pub recipe_id: String,
    pub direction: Direction,
    pub item_id: String,
    pub index: usize,
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Input => "in",
            Direction::Output => "out",
        };
        write!(f, "{}.{}.{}[{}]", self.recipe_id, dir, self.item_id, self.index)
    }
}

/// One unknown of the linear system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    pub column: usize,
    pub solution: Option<Rational>,
}

impl Variable {
    pub fn new(column: usize) -> Self {
        Variable {
            column,
            solution: None,
        }
    }

    /// The solved value, zero before the solve has run.
    pub fn value(&self) -> Rational {
        self.solution.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub variable: Variable,
    pub link: Option<FeedKey>,
    pub is_recycle: bool,
}

impl Feed {
    pub fn unlinked(column: usize) -> Self {
        Feed {
            variable: Variable::new(column),
            link: None,
            is_recycle: false,
        }
    }

    pub fn value(&self) -> Rational {
        self.variable.value()
    }
}

/// All feeds of one item on one side of a linked recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedIo<'c> {
    pub io: &'c RecipeIo,
    pub feeds: Vec<Feed>,
}

impl LinkedIo<'_> {
    pub fn item_id(&self) -> &str {
        &self.io.item_id
    }

    /// Sum of every feed's solved rate.
    pub fn total(&self) -> Result<Rational, RationalError> {
        Rational::checked_sum(self.feeds.iter().map(Feed::value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkedRecipe<'c> {
    pub recipe: &'c Recipe,
    pub building: Variable,
    pub inputs: Vec<LinkedIo<'c>>,
    pub outputs: Vec<LinkedIo<'c>>,
}

impl<'c> LinkedRecipe<'c> {
    pub fn new(recipe: &'c Recipe, building_column: usize) -> Self {
        LinkedRecipe {
            recipe,
            building: Variable::new(building_column),
            inputs: Vec::with_capacity(recipe.inputs.len()),
            outputs: Vec::with_capacity(recipe.outputs.len()),
        }
    }

    pub fn id(&self) -> &str {
        &self.recipe.id
    }

    /// Solved number of buildings running this recipe.
    pub fn building_count(&self) -> Rational {
        self.building.value()
    }

    pub fn ios(&self, direction: Direction) -> &[LinkedIo<'c>] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    pub fn ios_mut(&mut self, direction: Direction) -> &mut Vec<LinkedIo<'c>> {
        match direction {
            Direction::Input => &mut self.inputs,
            Direction::Output => &mut self.outputs,
        }
    }

    pub fn io(&self, direction: Direction, item_id: &str) -> Option<&LinkedIo<'c>> {
        self.ios(direction).iter().find(|io| io.item_id() == item_id)
    }

    pub fn io_mut(&mut self, direction: Direction, item_id: &str) -> Option<&mut LinkedIo<'c>> {
        self.ios_mut(direction)
            .iter_mut()
            .find(|io| io.item_id() == item_id)
    }

    pub fn input(&self, item_id: &str) -> Option<&LinkedIo<'c>> {
        self.io(Direction::Input, item_id)
    }

    pub fn output(&self, item_id: &str) -> Option<&LinkedIo<'c>> {
        self.io(Direction::Output, item_id)
    }

    /// Solved rates of every feed of `item_id` on the given side.
    #[cfg(test)]
    pub fn feed_values(&self, direction: Direction, item_id: &str) -> Vec<Rational> {
        self.io(direction, item_id)
            .map(|io| io.feeds.iter().map(Feed::value).collect())
            .unwrap_or_default()
    }

    /// Key of a feed of this recipe.
    pub fn feed_key(&self, direction: Direction, item_id: &str, index: usize) -> FeedKey {
        FeedKey {
            recipe_id: self.recipe.id.clone(),
            direction,
            item_id: item_id.to_string(),
            index,
        }
    }
}

/// Arena of linked recipes for one solve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductionGraph<'c> {
    nodes: Vec<LinkedRecipe<'c>>,
    index: HashMap<String, usize>,
}

impl<'c> ProductionGraph<'c> {
    pub fn new() -> Self {
        ProductionGraph::default()
    }

    /// Add a node; a recipe can be instantiated at most once.
    pub(crate) fn insert(&mut self, node: LinkedRecipe<'c>) -> usize {
        debug_assert!(!self.index.contains_key(node.id()));
        let idx = self.nodes.len();
        self.index.insert(node.id().to_string(), idx);
        self.nodes.push(node);
        idx
    }

    /// Linked recipes in discovery order.
    pub fn nodes(&self) -> &[LinkedRecipe<'c>] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [LinkedRecipe<'c>] {
        &mut self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn position(&self, recipe_id: &str) -> Option<usize> {
        self.index.get(recipe_id).copied()
    }

    pub fn node(&self, recipe_id: &str) -> Option<&LinkedRecipe<'c>> {
        self.position(recipe_id).map(|idx| &self.nodes[idx])
    }

    pub(crate) fn node_mut(&mut self, recipe_id: &str) -> Option<&mut LinkedRecipe<'c>> {
        self.position(recipe_id).map(move |idx| &mut self.nodes[idx])
    }

    pub fn feed(&self, key: &FeedKey) -> Option<&Feed> {
        self.node(&key.recipe_id)?
            .io(key.direction, &key.item_id)?
            .feeds
            .get(key.index)
    }

    pub(crate) fn feed_mut(&mut self, key: &FeedKey) -> Option<&mut Feed> {
        self.node_mut(&key.recipe_id)?
            .io_mut(key.direction, &key.item_id)?
            .feeds
            .get_mut(key.index)
    }

    /// The recipe on the other end of a feed's link.
    pub fn linked_recipe(&self, feed: &Feed) -> Option<&LinkedRecipe<'c>> {
        feed.link.as_ref().and_then(|key| self.node(&key.recipe_id))
    }

    /// Check that every link points at a feed whose link points back.
    pub fn links_are_symmetric(&self) -> bool {
        self.nodes.iter().all(|node| {
            [Direction::Input, Direction::Output].into_iter().all(|direction| {
                node.ios(direction).iter().all(|io| {
                    io.feeds.iter().enumerate().all(|(index, feed)| {
                        let Some(link) = &feed.link else {
                            return true;
                        };
                        let own = node.feed_key(direction, io.item_id(), index);
                        link.direction == direction.opposite()
                            && self.feed(link).and_then(|other| other.link.as_ref()) == Some(&own)
                    })
                })
            })
        })
    }
}
