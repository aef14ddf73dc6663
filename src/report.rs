//! Rendering of solved production graphs

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::catalog::Catalog;
use crate::graph::{Direction, Feed, LinkedIo, LinkedRecipe, ProductionGraph};
use crate::rational::{Rational, RationalError};

fn format_io(
    out: &mut String,
    catalog: &Catalog,
    graph: &ProductionGraph<'_>,
    io: &LinkedIo<'_>,
    direction: Direction,
) {
    let towards = match direction {
        Direction::Input => "from",
        Direction::Output => "to",
    };
    let linked = |feed: &Feed| {
        graph
            .linked_recipe(feed)
            .map(|other| format!(" {towards} recipe \"{}\"", other.recipe.name))
            .unwrap_or_default()
    };
    let name = catalog.item_name(io.item_id());

    match io.feeds.as_slice() {
        [feed] => {
            out.push_str(&format!(
                "\n  - {name} ({} units/min){}",
                feed.value(),
                linked(feed)
            ));
        }
        feeds => {
            out.push_str(&format!("\n  - {name} (split)"));
            for feed in feeds {
                out.push_str(&format!("\n    - {} units/min{}", feed.value(), linked(feed)));
            }
        }
    }
}

/// Plain text listing of every linked recipe, its building count and feeds.
pub fn format_solved_graph(catalog: &Catalog, graph: &ProductionGraph<'_>) -> String {
    let mut out = String::new();
    for (idx, node) in graph.nodes().iter().enumerate() {
        if idx > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&format!(
            "Recipe \"{}\" ({} x{}):\nInputs:",
            node.recipe.name,
            catalog.building_name(&node.recipe.building_id),
            node.building_count()
        ));
        for io in &node.inputs {
            format_io(&mut out, catalog, graph, io, Direction::Input);
        }
        out.push_str("\nOutputs:");
        for io in &node.outputs {
            format_io(&mut out, catalog, graph, io, Direction::Output);
        }
    }
    out
}

/// Totals of a solved production graph
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionSummary {
    pub target_item: String,
    pub target_rate: Rational,
    /// Building name and count, summed over recipes sharing a building.
    pub buildings: Vec<(String, Rational)>,
    /// Items entering the chain from outside, per minute.
    pub raw_inputs: Vec<(String, Rational)>,
    /// Items leaving the chain besides the target, per minute.
    pub byproducts: Vec<(String, Rational)>,
}

fn accumulate(
    totals: &mut BTreeMap<String, Rational>,
    key: &str,
    value: Rational,
) -> Result<(), RationalError> {
    let total = totals.entry(key.to_string()).or_default();
    *total = total.checked_add(value)?;
    Ok(())
}

/// Flows too small to be worth listing.
fn negligible(value: Rational) -> bool {
    value.approx_eq(&Rational::ZERO)
}

fn is_target(graph: &ProductionGraph<'_>, node: &LinkedRecipe<'_>, target: &str) -> bool {
    graph.position(node.id()) == Some(0) && node.output(target).is_some()
}

/// Sum up buildings, raw inputs and byproducts of a solved graph.
pub fn summarize(
    catalog: &Catalog,
    graph: &ProductionGraph<'_>,
    target_item: &str,
    target_rate: Rational,
) -> Result<ProductionSummary, RationalError> {
    let mut buildings = BTreeMap::new();
    let mut raw_inputs = BTreeMap::new();
    let mut byproducts = BTreeMap::new();

    for node in graph.nodes() {
        let building = catalog.building_name(&node.recipe.building_id);
        accumulate(&mut buildings, building, node.building_count())?;

        for io in &node.inputs {
            for feed in io.feeds.iter().filter(|f| f.link.is_none() && !negligible(f.value())) {
                accumulate(&mut raw_inputs, catalog.item_name(io.item_id()), feed.value())?;
            }
        }
        for io in &node.outputs {
            if io.item_id() == target_item && is_target(graph, node, target_item) {
                continue;
            }
            for feed in io.feeds.iter().filter(|f| f.link.is_none() && !negligible(f.value())) {
                accumulate(&mut byproducts, catalog.item_name(io.item_id()), feed.value())?;
            }
        }
    }

    Ok(ProductionSummary {
        target_item: catalog.item_name(target_item).to_string(),
        target_rate,
        buildings: buildings.into_iter().collect(),
        raw_inputs: raw_inputs.into_iter().collect(),
        byproducts: byproducts.into_iter().collect(),
    })
}

/// Decimal hint for values that are not whole numbers.
fn approx(value: Rational) -> String {
    if value.denominator() == 1 {
        String::new()
    } else {
        format!(" (~{:.3})", value.to_f64())
    }
}

fn write_totals(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    totals: &[(String, Rational)],
    suffix: &str,
) -> fmt::Result {
    writeln!(f, "{title}:")?;
    if totals.is_empty() {
        writeln!(f, "  (none)")?;
    }
    for (name, value) in totals {
        writeln!(f, "  {name} @ {value}{suffix}{}", approx(*value))?;
    }
    Ok(())
}

impl fmt::Display for ProductionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Production Summary ===")?;
        writeln!(f, "Target: {} @ {}/min", self.target_item, self.target_rate)?;
        writeln!(f)?;

        writeln!(f, "Buildings required:")?;
        for (name, count) in &self.buildings {
            writeln!(f, "  {count}x {name}{}", approx(*count))?;
        }
        writeln!(f)?;

        write_totals(f, "Raw inputs required", &self.raw_inputs, "/min")?;
        writeln!(f)?;
        write_totals(f, "Byproducts", &self.byproducts, "/min")
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

fn recipe_node(recipe_id: &str) -> String {
    format!("\"recipe:{}\"", escape(recipe_id))
}

/// Graphviz rendering; recycle links are dashed.
pub fn to_dot(catalog: &Catalog, graph: &ProductionGraph<'_>) -> String {
    let mut out = String::from("digraph production {\n    rankdir=LR;\n    node [shape=box];\n");

    for node in graph.nodes() {
        out.push_str(&format!(
            "    {} [label=\"{}\\n{} x{}\"];\n",
            recipe_node(node.id()),
            escape(&node.recipe.name),
            escape(catalog.building_name(&node.recipe.building_id)),
            node.building_count()
        ));
    }

    let mut sources = HashSet::new();
    for node in graph.nodes() {
        for io in &node.inputs {
            let item = escape(catalog.item_name(io.item_id()));
            for feed in io.feeds.iter().filter(|f| f.link.is_none()) {
                let source = format!("\"source:{}\"", escape(io.item_id()));
                if sources.insert(source.clone()) {
                    out.push_str(&format!("    {source} [shape=ellipse, label=\"{item}\"];\n"));
                }
                out.push_str(&format!(
                    "    {source} -> {} [label=\"{}/min\"];\n",
                    recipe_node(node.id()),
                    feed.value()
                ));
            }
        }

        for io in &node.outputs {
            let item = escape(catalog.item_name(io.item_id()));
            for (feed_index, feed) in io.feeds.iter().enumerate() {
                let (consumer, style) = match &feed.link {
                    Some(link) => (
                        recipe_node(&link.recipe_id),
                        if feed.is_recycle { ", style=dashed" } else { "" },
                    ),
                    None => {
                        let key = node.feed_key(Direction::Output, io.item_id(), feed_index);
                        let sink = format!("\"sink:{}\"", escape(&key.to_string()));
                        out.push_str(&format!("    {sink} [shape=ellipse, label=\"{item}\"];\n"));
                        (sink, "")
                    }
                };
                out.push_str(&format!(
                    "    {} -> {consumer} [label=\"{item}\\n{}/min\"{style}];\n",
                    recipe_node(node.id()),
                    feed.value()
                ));
            }
        }
    }

    out.push_str("}\n");
    out
}
