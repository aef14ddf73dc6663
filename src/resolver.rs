//! Production graph resolution
//!
//! Starting from the requested item, picks one recipe per required item
//! depth-first and links every consumer input to a producer output. A recipe
//! is instantiated once per solve; later demand for it adds feeds (fan-out).
//! Byproducts left unlinked after the forward pass are offered to other
//! recipes that consume the same item (recycle feeds).

use std::collections::HashMap;

use crate::catalog::Catalog;
use crate::graph::{Direction, Feed, FeedKey, LinkedIo, LinkedRecipe, ProductionGraph, Variable};
use crate::models::Item;
use crate::selection::RecipePolicy;
use crate::solver::SolveError;

/// A resolved but not yet solved graph.
#[derive(Debug)]
pub struct ResolvedGraph<'c> {
    pub graph: ProductionGraph<'c>,
    /// Number of unknowns, i.e. matrix columns without the constants.
    pub variables: usize,
    /// The root recipe's feed for the requested item.
    pub target: FeedKey,
}

struct Resolver<'c, 'p, P> {
    catalog: &'c Catalog,
    policy: &'p P,
    target: &'c Item,
    graph: ProductionGraph<'c>,
    next_column: usize,
    pending_outputs: Vec<FeedKey>,
    consumers: HashMap<&'c str, Vec<&'c str>>,
}

/// Build the production graph for `target`.
pub fn resolve<'c, P: RecipePolicy>(
    catalog: &'c Catalog,
    target: &'c Item,
    policy: &P,
) -> Result<ResolvedGraph<'c>, SolveError> {
    let mut resolver = Resolver {
        catalog,
        policy,
        target,
        graph: ProductionGraph::new(),
        next_column: 0,
        pending_outputs: Vec::new(),
        consumers: HashMap::new(),
    };

    let root = resolver.resolve_item(target, None)?;
    resolver.link_recycled_outputs()?;
    resolver.check_inputs_linked()?;
    debug_assert!(resolver.graph.links_are_symmetric());

    tracing::debug!(
        item = %target.id,
        recipes = resolver.graph.len(),
        variables = resolver.next_column,
        "resolved production graph"
    );

    Ok(ResolvedGraph {
        graph: resolver.graph,
        variables: resolver.next_column,
        target: FeedKey {
            recipe_id: root.to_string(),
            direction: Direction::Output,
            item_id: target.id.clone(),
            index: 0,
        },
    })
}

impl<'c, P: RecipePolicy> Resolver<'c, '_, P> {
    fn allocate(&mut self) -> usize {
        let column = self.next_column;
        self.next_column += 1;
        column
    }

    fn column_of(&self, key: &FeedKey) -> Result<usize, SolveError> {
        self.graph
            .feed(key)
            .map(|feed| feed.variable.column)
            .ok_or_else(|| SolveError::Internal(format!("missing feed {key}")))
    }

    /// Resolve the recipe producing `item`, returning its id. `consumer` is the
    /// input feed waiting for this item, absent only for the requested item.
    fn resolve_item(
        &mut self,
        item: &'c Item,
        consumer: Option<FeedKey>,
    ) -> Result<&'c str, SolveError> {
        let recipe = self
            .policy
            .select(item, self.catalog.recipes_producing(&item.id))
            .ok_or_else(|| SolveError::NoPrimaryRecipe(item.id.clone()))?;

        if self.graph.position(&recipe.id).is_some() {
            let consumer = consumer.ok_or_else(|| {
                let message = format!("recipe \"{}\" revisited without a consumer", recipe.id);
                SolveError::Internal(message)
            })?;
            let column = self.column_of(&consumer)?;
            self.attach(&recipe.id, Direction::Output, &item.id, column, consumer, false)?;
            tracing::trace!(recipe = %recipe.id, item = %item.id, "fan-out feed");
            return Ok(&recipe.id);
        }

        tracing::trace!(recipe = %recipe.id, item = %item.id, "new linked recipe");
        let building = self.allocate();
        self.graph.insert(LinkedRecipe::new(recipe, building));

        for output in &recipe.outputs {
            let node = self.node_mut(&recipe.id)?;
            if node.output(&output.item_id).is_some() {
                continue;
            }
            node.outputs.push(LinkedIo {
                io: output,
                feeds: Vec::new(),
            });

            match consumer.as_ref().filter(|_| output.item_id == item.id) {
                Some(consumer) => {
                    let column = self.column_of(consumer)?;
                    self.attach(
                        &recipe.id,
                        Direction::Output,
                        &output.item_id,
                        column,
                        consumer.clone(),
                        false,
                    )?;
                }
                None => {
                    let column = self.allocate();
                    let node = self.node_mut(&recipe.id)?;
                    let key = node.feed_key(Direction::Output, &output.item_id, 0);
                    if let Some(io) = node.outputs.last_mut() {
                        io.feeds.push(Feed::unlinked(column));
                    }
                    if output.item_id != self.target.id {
                        self.pending_outputs.push(key);
                    }
                }
            }
        }

        for input in &recipe.inputs {
            if self.node_mut(&recipe.id)?.input(&input.item_id).is_some() {
                continue;
            }
            let column = self.allocate();
            let node = self.node_mut(&recipe.id)?;
            node.inputs.push(LinkedIo {
                io: input,
                feeds: vec![Feed::unlinked(column)],
            });
            let key = node.feed_key(Direction::Input, &input.item_id, 0);
            self.consumers
                .entry(input.item_id.as_str())
                .or_default()
                .push(recipe.id.as_str());

            let input_item = self.catalog.item(&input.item_id)?;
            if !input_item.is_raw_input {
                self.resolve_item(input_item, Some(key))?;
            }
        }

        Ok(&recipe.id)
    }

    fn node_mut(&mut self, recipe_id: &str) -> Result<&mut LinkedRecipe<'c>, SolveError> {
        self.graph
            .node_mut(recipe_id)
            .ok_or_else(|| SolveError::Internal(format!("missing recipe \"{recipe_id}\"")))
    }

    /// Add a feed to an existing IO record, sharing `column` with
    /// `counterpart`, and point `counterpart` back at it.
    fn attach(
        &mut self,
        recipe_id: &str,
        direction: Direction,
        item_id: &str,
        column: usize,
        counterpart: FeedKey,
        is_recycle: bool,
    ) -> Result<FeedKey, SolveError> {
        let node = self.node_mut(recipe_id)?;
        let key_prefix = node.feed_key(direction, item_id, 0);
        let io = node.io_mut(direction, item_id).ok_or_else(|| {
            let message = format!("recipe \"{recipe_id}\" has no {direction:?} for \"{item_id}\"");
            SolveError::Internal(message)
        })?;

        let key = FeedKey {
            index: io.feeds.len(),
            ..key_prefix
        };
        io.feeds.push(Feed {
            variable: Variable::new(column),
            link: Some(counterpart.clone()),
            is_recycle,
        });

        let other = self
            .graph
            .feed_mut(&counterpart)
            .ok_or_else(|| SolveError::Internal(format!("missing feed {counterpart}")))?;
        other.link = Some(key.clone());
        other.is_recycle = is_recycle;
        Ok(key)
    }

    /// Offer every unlinked byproduct to the first other recipe consuming it.
    /// Consumers already fed by the producer are passed over; a second feed
    /// from the same output would leave the split between the two unknown.
    fn link_recycled_outputs(&mut self) -> Result<(), SolveError> {
        let pending = std::mem::take(&mut self.pending_outputs);
        for output in pending {
            let Some(consumers) = self.consumers.get(output.item_id.as_str()) else {
                continue;
            };
            let graph = &self.graph;
            let mut receivers = consumers.iter().copied().filter(|recipe_id| {
                *recipe_id != output.recipe_id
                    && !fed_by(graph, recipe_id, &output.item_id, &output.recipe_id)
            });
            let Some(receiver) = receivers.next() else {
                continue;
            };
            let skipped = receivers.count();

            let feed = self
                .graph
                .feed(&output)
                .ok_or_else(|| SolveError::Internal(format!("missing feed {output}")))?;
            if feed.link.is_some() {
                continue;
            }
            let column = feed.variable.column;

            let key = self.attach(
                receiver,
                Direction::Input,
                &output.item_id,
                column,
                output.clone(),
                true,
            )?;
            tracing::debug!(from = %output, to = %key, "linked recycle feed");
            if skipped > 0 {
                // TODO: decide whether the remaining consumers should share the byproduct
                tracing::debug!(
                    from = %output,
                    skipped,
                    "additional recycle consumers left unlinked"
                );
            }
        }
        Ok(())
    }

    fn check_inputs_linked(&self) -> Result<(), SolveError> {
        for node in self.graph.nodes() {
            for io in &node.inputs {
                let item = self.catalog.item(io.item_id())?;
                if !item.is_raw_input && io.feeds.iter().all(|feed| feed.link.is_none()) {
                    return Err(SolveError::UnlinkedInput {
                        recipe: node.id().to_string(),
                        item: item.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Whether `consumer`'s input of `item_id` already has a feed from `producer`.
fn fed_by(graph: &ProductionGraph<'_>, consumer: &str, item_id: &str, producer: &str) -> bool {
    graph
        .node(consumer)
        .and_then(|node| node.input(item_id))
        .is_some_and(|io| {
            io.feeds
                .iter()
                .filter_map(|feed| feed.link.as_ref())
                .any(|link| link.recipe_id == producer)
        })
}
