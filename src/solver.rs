//! Exact production chain solver
//!
//! `solve` resolves the graph of recipes needed for one item, turns it into a
//! square linear system, row-reduces it over exact rationals and writes the
//! building counts and feed rates back into the graph.

use thiserror::Error;

use crate::catalog::{Catalog, CatalogError};
use crate::equations;
use crate::graph::ProductionGraph;
use crate::matrix::MatrixError;
use crate::rational::{Rational, RationalError};
use crate::resolver::{self, ResolvedGraph};
use crate::selection::{PrimaryRecipePolicy, RecipePolicy};

#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("no primary recipe produces \"{0}\"")]
    NoPrimaryRecipe(String),

    #[error("target rate must be positive, got {0}")]
    InvalidRate(Rational),

    #[error("recipe \"{0}\" has no outputs")]
    MalformedRecipe(String),

    #[error("input \"{item}\" of recipe \"{recipe}\" is not linked to a producer")]
    UnlinkedInput { recipe: String, item: String },

    #[error("unexpected {rows} x {columns} matrix size, the system is not square")]
    NotSquare { rows: usize, columns: usize },

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Arithmetic(#[from] RationalError),

    #[error("inconsistent production graph: {0}")]
    Internal(String),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SolveOptions {
    /// Log every row reduction step.
    pub debug: bool,
}

/// Solve for `rate` units per minute of `item_id` using primary recipes.
pub fn solve<'c>(
    catalog: &'c Catalog,
    item_id: &str,
    rate: Rational,
    debug: bool,
) -> Result<ProductionGraph<'c>, SolveError> {
    solve_with(catalog, item_id, rate, &PrimaryRecipePolicy, SolveOptions { debug })
}

/// Solve with a custom recipe selection policy.
pub fn solve_with<'c, P: RecipePolicy>(
    catalog: &'c Catalog,
    item_id: &str,
    rate: Rational,
    policy: &P,
    options: SolveOptions,
) -> Result<ProductionGraph<'c>, SolveError> {
    if !rate.is_positive() {
        return Err(SolveError::InvalidRate(rate));
    }
    let item = catalog.item(item_id)?;

    let ResolvedGraph {
        mut graph,
        variables,
        target,
    } = resolver::resolve(catalog, item, policy)?;

    let mut matrix = equations::build_matrix(&graph, variables, &target, rate)?;
    matrix.row_reduce(options.debug)?;
    let solutions = matrix.solutions()?;
    if options.debug {
        tracing::debug!("reduced matrix\n{}", matrix);
    }

    write_solutions(&mut graph, &solutions)?;
    tracing::debug!(item = item_id, %rate, recipes = graph.len(), "solved production chain");
    Ok(graph)
}

fn write_solutions(
    graph: &mut ProductionGraph<'_>,
    solutions: &[Rational],
) -> Result<(), SolveError> {
    let value = |column: usize| {
        solutions
            .get(column)
            .copied()
            .ok_or_else(|| SolveError::Internal(format!("no solution for column {column}")))
    };

    for node in graph.nodes_mut() {
        node.building.solution = Some(value(node.building.column)?);
        for io in node.inputs.iter_mut().chain(node.outputs.iter_mut()) {
            for feed in &mut io.feeds {
                feed.variable.solution = Some(value(feed.variable.column)?);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::*;
    use crate::graph::Direction;
    use crate::models::{Building, Item, Recipe, RecipeIo};
    use crate::sample;

    fn r(n: i64, d: i64) -> Rational {
        Rational::new(n, d).unwrap()
    }

    fn count(graph: &ProductionGraph<'_>, recipe_id: &str) -> Rational {
        graph.node(recipe_id).unwrap().building_count()
    }

    #[test]
    fn iron_plate() {
        let catalog = sample::catalog();
        let graph = solve(&catalog, "iron-plate", Rational::from(20), false).unwrap();
        assert_eq!(count(&graph, "iron-plate"), Rational::ONE);
        assert_eq!(count(&graph, "iron-ingot"), Rational::ONE);
        assert_eq!(graph.nodes()[0].id(), "iron-plate");
    }

    #[test]
    fn reinforced_iron_plate() {
        let catalog = sample::catalog();
        let graph = solve(&catalog, "reinforced-iron-plate", Rational::from(10), false).unwrap();
        assert_eq!(count(&graph, "reinforced-iron-plate"), Rational::from(2));
        assert_eq!(count(&graph, "screw"), Rational::from(3));
        assert_eq!(count(&graph, "iron-plate"), Rational::from(3));
    }

    #[test]
    fn modular_frame_fans_out_iron_rod() {
        let catalog = sample::catalog();
        let graph = solve(&catalog, "modular-frame", Rational::from(3), false).unwrap();
        assert_eq!(count(&graph, "modular-frame"), r(3, 2));
        assert_eq!(count(&graph, "reinforced-iron-plate"), r(9, 10));
        assert_eq!(count(&graph, "iron-rod"), r(21, 10));

        let rod = graph.node("iron-rod").unwrap();
        assert_eq!(rod.feed_values(Direction::Output, "iron-rod"), [r(27, 2), Rational::from(18)]);
        assert_eq!(rod.output("iron-rod").unwrap().total().unwrap(), r(63, 2));
    }

    #[test]
    fn plastic_leaves_residue_as_byproduct() {
        let catalog = sample::catalog();
        let graph = solve(&catalog, "plastic", Rational::from(400), false).unwrap();
        assert_eq!(count(&graph, "plastic"), Rational::from(20));
        let plastic = graph.node("plastic").unwrap();
        assert_eq!(
            plastic.feed_values(Direction::Output, "heavy-oil-residue"),
            [Rational::from(200)]
        );
        assert_eq!(plastic.feed_values(Direction::Input, "crude-oil"), [Rational::from(600)]);
    }

    #[test]
    fn alclad_recycles_water_and_silica() {
        let catalog = sample::catalog();
        let graph = solve(&catalog, "alclad-aluminum-sheet", Rational::from(100), false).unwrap();
        assert_eq!(count(&graph, "alclad-aluminum-sheet"), r(10, 3));
        assert_eq!(count(&graph, "aluminum-ingot"), r(5, 3));
        assert_eq!(count(&graph, "aluminum-scrap"), r(5, 12));
        assert_eq!(count(&graph, "alumina-solution"), r(5, 6));
        assert_eq!(count(&graph, "silica"), r(20, 9));

        let alumina = graph.node("alumina-solution").unwrap();
        assert_eq!(
            alumina.feed_values(Direction::Input, "water"),
            [Rational::from(100), Rational::from(50)]
        );
        let ingot = graph.node("aluminum-ingot").unwrap();
        assert_eq!(ingot.feed_values(Direction::Input, "silica"), [r(250, 3), r(125, 3)]);
    }

    #[test]
    fn identical_solves_agree() {
        let catalog = sample::catalog();
        let first = solve(&catalog, "alclad-aluminum-sheet", Rational::from(100), false).unwrap();
        let second = solve(&catalog, "alclad-aluminum-sheet", Rational::from(100), true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn linked_feeds_carry_equal_rates() {
        let catalog = sample::catalog();
        let graph = solve(&catalog, "modular-frame", Rational::from(3), false).unwrap();
        for node in graph.nodes() {
            for io in node.inputs.iter().chain(&node.outputs) {
                for feed in io.feeds.iter().filter(|f| f.link.is_some()) {
                    let other = graph.feed(feed.link.as_ref().unwrap()).unwrap();
                    assert_eq!(feed.value(), other.value());
                }
            }
        }
    }

    #[test]
    fn single_io_recipes_scale_with_demand() {
        let catalog = sample::catalog();
        let graph = solve(&catalog, "modular-frame", Rational::from(3), false).unwrap();
        for node in graph.nodes() {
            if node.inputs.len() != 1 || node.outputs.len() != 1 {
                continue;
            }
            let output = &node.outputs[0];
            let produced = node.building_count().checked_mul(output.io.throughput).unwrap();
            assert_eq!(produced, output.total().unwrap(), "{}", node.id());
        }
    }

    #[test]
    fn rejects_non_positive_rates() {
        let catalog = sample::catalog();
        for rate in [Rational::ZERO, Rational::from(-5)] {
            let err = solve(&catalog, "iron-plate", rate, false).unwrap_err();
            assert!(matches!(err, SolveError::InvalidRate(_)));
        }
    }

    #[test]
    fn unknown_and_unproducible_items_fail() {
        let catalog = sample::catalog();
        let err = solve(&catalog, "unobtainium", Rational::ONE, false).unwrap_err();
        assert!(matches!(err, SolveError::Catalog(CatalogError::ItemNotFound(_))));

        let err = solve(&catalog, "polymer-resin", Rational::ONE, false).unwrap_err();
        assert_eq!(err.to_string(), "no primary recipe produces \"polymer-resin\"");

        let err = solve(&catalog, "iron-ore", Rational::ONE, false).unwrap_err();
        assert!(matches!(err, SolveError::NoPrimaryRecipe(id) if id == "iron-ore"));
    }

    fn io(item_id: &str, throughput: i64) -> RecipeIo {
        RecipeIo {
            item_id: item_id.to_string(),
            amount: Rational::ONE,
            throughput: Rational::from(throughput),
        }
    }

    fn plain_item(id: &str, is_raw_input: bool) -> Item {
        Item {
            id: id.to_string(),
            name: id.to_string(),
            is_raw_input,
            is_fluid: false,
            stack_size: Some(100),
            img_url: String::new(),
            wiki_url: String::new(),
            wiki_img_url: String::new(),
        }
    }

    fn plain_recipe(id: &str, inputs: Vec<RecipeIo>, outputs: Vec<RecipeIo>) -> Recipe {
        Recipe {
            id: id.to_string(),
            name: id.to_string(),
            building_id: "machine".to_string(),
            is_alternate: false,
            is_manual: false,
            inputs,
            outputs,
            wiki_url: String::new(),
        }
    }

    fn machine() -> Building {
        Building {
            id: "machine".to_string(),
            name: "Machine".to_string(),
            img_url: String::new(),
            wiki_url: String::new(),
            wiki_img_url: String::new(),
        }
    }

    #[test]
    fn recipes_without_inputs_anchor_on_their_output() {
        let catalog = Catalog::new(
            vec![plain_item("water", false), plain_item("ice", false)],
            vec![machine()],
            vec![
                plain_recipe("pump", Vec::new(), vec![io("water", 120)]),
                plain_recipe("ice", vec![io("water", 60)], vec![io("ice", 30)]),
            ],
        );
        let graph = solve(&catalog, "ice", Rational::from(30), false).unwrap();
        assert_eq!(count(&graph, "ice"), Rational::ONE);
        assert_eq!(count(&graph, "pump"), r(1, 2));
    }

    #[test]
    fn byproducts_recycle_into_the_first_consumer_only() {
        let catalog = Catalog::new(
            vec![
                plain_item("ore", true),
                plain_item("waste", true),
                plain_item("a", false),
                plain_item("b", false),
                plain_item("c", false),
                plain_item("kit", false),
            ],
            vec![machine()],
            vec![
                plain_recipe(
                    "kit",
                    vec![io("a", 10), io("b", 10), io("c", 10)],
                    vec![io("kit", 10)],
                ),
                plain_recipe("a", vec![io("ore", 10)], vec![io("a", 10), io("waste", 10)]),
                plain_recipe("b", vec![io("ore", 10), io("waste", 10)], vec![io("b", 10)]),
                plain_recipe("c", vec![io("waste", 10)], vec![io("c", 10)]),
            ],
        );
        let graph = solve(&catalog, "kit", Rational::from(10), false).unwrap();
        for id in ["kit", "a", "b", "c"] {
            assert_eq!(count(&graph, id), Rational::ONE, "{id}");
        }
        let b = graph.node("b").unwrap();
        assert_eq!(b.feed_values(Direction::Input, "waste"), [Rational::ZERO, Rational::from(10)]);
        assert!(b.input("waste").unwrap().feeds[1].is_recycle);
        let c = graph.node("c").unwrap();
        assert_eq!(c.feed_values(Direction::Input, "waste"), [Rational::from(10)]);
    }

    #[test]
    fn byproduct_is_not_recycled_into_a_consumer_it_already_feeds() {
        let catalog = Catalog::new(
            vec![
                plain_item("oil", true),
                plain_item("a", false),
                plain_item("b", false),
                plain_item("kit", false),
            ],
            vec![machine()],
            vec![
                plain_recipe("kit", vec![io("a", 10), io("b", 5)], vec![io("kit", 5)]),
                plain_recipe("refine", vec![io("oil", 30)], vec![io("a", 20), io("b", 20)]),
            ],
        );
        let graph = solve(&catalog, "kit", Rational::from(10), false).unwrap();
        assert_eq!(count(&graph, "kit"), Rational::from(2));
        assert_eq!(count(&graph, "refine"), Rational::ONE);

        let kit = graph.node("kit").unwrap();
        assert_eq!(kit.feed_values(Direction::Input, "b"), [Rational::from(10)]);
        let refine = graph.node("refine").unwrap();
        // the first feed stays a byproduct, the second is the fan-out to kit
        assert_eq!(
            refine.feed_values(Direction::Output, "b"),
            [Rational::from(10), Rational::from(10)]
        );
        assert!(refine.output("b").unwrap().feeds[0].link.is_none());
        assert!(!refine.output("b").unwrap().feeds[1].is_recycle);
    }

    struct AlternatesFirst;

    impl RecipePolicy for AlternatesFirst {
        fn is_candidate(&self, recipe: &Recipe) -> bool {
            !recipe.is_manual
        }

        fn compare(&self, item: &Item, a: &Recipe, b: &Recipe) -> Ordering {
            b.is_alternate
                .cmp(&a.is_alternate)
                .then_with(|| PrimaryRecipePolicy.compare(item, a, b))
        }
    }

    #[test]
    fn custom_policy_changes_recipe_choice() {
        let catalog = sample::catalog();
        let graph = solve_with(
            &catalog,
            "screw",
            Rational::from(50),
            &AlternatesFirst,
            SolveOptions::default(),
        )
        .unwrap();
        assert_eq!(graph.nodes()[0].id(), "cast-screw");
        assert_eq!(count(&graph, "cast-screw"), Rational::ONE);
        assert!(graph.node("iron-rod").is_none());
    }
}
