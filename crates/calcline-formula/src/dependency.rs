//! Dependency tracking between variables

use crate::ast::{Component, ConversionTarget};
use crate::lexer::{opens_call, tokenize, Token, TokenKind};
use crate::parser::{normalize_name, parse};
use calcline_core::{currency, Error, SemanticValue};
use std::collections::{BTreeMap, BTreeSet};

/// Tokenizer used to extract references from a definition
pub type Tokenizer = fn(&str) -> Vec<Token>;

/// One defined variable in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraphNode {
    pub name: String,
    /// Definition text as written
    pub raw_value: String,
    /// Names this definition references
    pub dependencies: BTreeSet<String>,
    /// Names whose definitions reference this one
    pub dependents: BTreeSet<String>,
    /// Lies on a cycle of `dependencies` edges
    pub is_circular: bool,
}

/// Dependency graph for variables
///
/// A reference to a name with no node is kept as an orphan edge, so a later
/// definition under that name reconnects to its dependents.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, DependencyGraphNode>,
    /// Undefined name → names that reference it
    orphan_dependents: BTreeMap<String, BTreeSet<String>>,
    tokenizer: Tokenizer,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::with_tokenizer(tokenize)
    }
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph that extracts references with `tokenizer`
    pub fn with_tokenizer(tokenizer: Tokenizer) -> Self {
        Self {
            nodes: BTreeMap::new(),
            orphan_dependents: BTreeMap::new(),
            tokenizer,
        }
    }

    /// Define or redefine `name`.
    ///
    /// The node is inserted even when it closes a cycle; in that case every node
    /// on the cycle is flagged and the cycle path is returned as the error.
    pub fn add_node(&mut self, name: &str, raw_value: &str) -> Result<(), Error> {
        let name = normalize_name(name);
        let (mut dependencies, currencies) = self.extract_references(raw_value);
        // A rate declaration (`EUR = $1.10`) does not wait on other rates
        if !currency::is_currency_code(&name) {
            dependencies.extend(currencies);
        }

        // Drop the old definition's edges
        let dependents = match self.nodes.remove(&name) {
            Some(old) => {
                for dependency in &old.dependencies {
                    self.unlink(dependency, &name);
                }
                old.dependents
            }
            None => self.orphan_dependents.remove(&name).unwrap_or_default(),
        };

        for dependency in &dependencies {
            if dependency == &name {
                continue;
            }
            match self.nodes.get_mut(dependency) {
                Some(node) => {
                    node.dependents.insert(name.clone());
                }
                None => {
                    self.orphan_dependents
                        .entry(dependency.clone())
                        .or_default()
                        .insert(name.clone());
                }
            }
        }

        let mut dependents = dependents;
        dependents.remove(&name);
        if dependencies.contains(&name) {
            dependents.insert(name.clone());
        }

        self.nodes.insert(
            name.clone(),
            DependencyGraphNode {
                name: name.clone(),
                raw_value: raw_value.to_string(),
                dependencies,
                dependents,
                is_circular: false,
            },
        );

        self.refresh_circular_flags(&name);

        match self.find_cycle(&name) {
            Some(path) => {
                tracing::warn!(variable = %name, cycle = %path.join(" -> "), "circular dependency");
                Err(Error::CircularDependency { path })
            }
            None => Ok(()),
        }
    }

    fn unlink(&mut self, dependency: &str, dependent: &str) {
        if let Some(node) = self.nodes.get_mut(dependency) {
            node.dependents.remove(dependent);
        } else if let Some(set) = self.orphan_dependents.get_mut(dependency) {
            set.remove(dependent);
            if set.is_empty() {
                self.orphan_dependents.remove(dependency);
            }
        }
    }

    /// Names referenced by `raw_value`: variables plus the currency codes its
    /// amounts and conversion targets use, whose rate declarations it needs
    pub fn extract_dependencies(&self, raw_value: &str) -> BTreeSet<String> {
        let (mut names, currencies) = self.extract_references(raw_value);
        names.extend(currencies);
        names
    }

    /// Variable names and currency codes referenced by `raw_value`
    fn extract_references(&self, raw_value: &str) -> (BTreeSet<String>, BTreeSet<String>) {
        let tokens = (self.tokenizer)(raw_value);
        let mut names = BTreeSet::new();
        let mut currencies = BTreeSet::new();
        match parse(&tokens) {
            Ok(components) => collect_references(&components, &mut names, &mut currencies),
            // Unparseable definitions still order after anything they name
            Err(_) => {
                for (i, token) in tokens.iter().enumerate() {
                    match token.kind {
                        TokenKind::Identifier if token.text != "per" && !opens_call(&tokens, i) => {
                            names.insert(normalize_name(&token.text));
                        }
                        TokenKind::CurrencySymbol => {
                            let info = token
                                .text
                                .chars()
                                .next()
                                .and_then(currency::lookup_symbol)
                                .or_else(|| currency::lookup_code(&token.text));
                            if let Some(info) = info {
                                currencies.insert(info.code.to_string());
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        (names, currencies)
    }

    /// Re-derive `is_circular` for every node connected to `name`
    fn refresh_circular_flags(&mut self, name: &str) {
        let mut component = BTreeSet::new();
        let mut pending = vec![name.to_string()];
        while let Some(current) = pending.pop() {
            if !component.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                pending.extend(node.dependencies.iter().cloned());
                pending.extend(node.dependents.iter().cloned());
            }
        }

        let circular: BTreeSet<String> = {
            let mut walk = SccWalk::default();
            for member in &component {
                if let Some(node) = self.nodes.get(member) {
                    walk.run(self, &node.name);
                }
            }
            walk.cyclic.into_iter().map(str::to_string).collect()
        };
        for member in &component {
            if let Some(node) = self.nodes.get_mut(member) {
                node.is_circular = circular.contains(member);
            }
        }
    }

    /// First cycle reachable from `name`, as a path that starts and ends on the
    /// same node
    pub fn find_cycle(&self, name: &str) -> Option<Vec<String>> {
        let root = self.nodes.get(name)?.name.as_str();
        let mut visited = BTreeSet::from([root]);
        let mut on_path = BTreeSet::from([root]);
        let mut frames: Vec<Frame> = vec![Frame::new(self, root)];

        while let Some(frame) = frames.last_mut() {
            let Some(dependency) = frame.next_dependency() else {
                on_path.remove(frame.node);
                frames.pop();
                continue;
            };
            if on_path.contains(dependency) {
                let start = frames.iter().position(|f| f.node == dependency)?;
                let mut path: Vec<String> =
                    frames[start..].iter().map(|f| f.node.to_string()).collect();
                path.push(dependency.to_string());
                return Some(path);
            }
            if visited.insert(dependency) {
                on_path.insert(dependency);
                frames.push(Frame::new(self, dependency));
            }
        }
        None
    }

    /// Every node, dependencies before dependents.
    ///
    /// Node names and each node's dependencies are visited in sorted order, so
    /// the same graph always yields the same order. Nodes on a cycle appear
    /// once, in the order the walk reaches them.
    pub fn get_update_order(&self) -> Vec<String> {
        let mut result = Vec::with_capacity(self.nodes.len());
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut in_stack: BTreeSet<&str> = BTreeSet::new();
        let mut frames: Vec<Frame> = Vec::new();

        for name in self.nodes.keys() {
            if visited.contains(name.as_str()) {
                continue;
            }
            in_stack.insert(name);
            frames.push(Frame::new(self, name));

            // Post-order: a node is emitted after all of its dependencies
            while let Some(frame) = frames.last_mut() {
                if let Some(dependency) = frame.next_dependency() {
                    if !visited.contains(dependency) && in_stack.insert(dependency) {
                        frames.push(Frame::new(self, dependency));
                    }
                    continue;
                }
                let node = frame.node;
                frames.pop();
                in_stack.remove(node);
                visited.insert(node);
                result.push(node.to_string());
            }
        }

        result
    }

    /// Defined names `name` references, sorted
    pub fn dependencies_of<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let nodes = &self.nodes;
        nodes
            .get(name)
            .into_iter()
            .flat_map(|node| node.dependencies.iter())
            .filter(move |dependency| nodes.contains_key(*dependency))
            .map(String::as_str)
    }

    /// Names whose definitions reference `name`, defined or not
    pub fn dependents_of<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.nodes
            .get(name)
            .map(|node| &node.dependents)
            .or_else(|| self.orphan_dependents.get(name))
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Look up a node
    pub fn node(&self, name: &str) -> Option<&DependencyGraphNode> {
        self.nodes.get(name)
    }

    /// All nodes, sorted by name
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyGraphNode> {
        self.nodes.values()
    }

    /// True if `name` is flagged as lying on a cycle
    pub fn is_circular(&self, name: &str) -> bool {
        self.nodes.get(name).is_some_and(|node| node.is_circular)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.orphan_dependents.clear();
    }
}

/// One node of an explicit depth-first walk and its unvisited dependencies
struct Frame<'a> {
    node: &'a str,
    dependencies: Vec<&'a str>,
    next: usize,
}

impl<'a> Frame<'a> {
    fn new(graph: &'a DependencyGraph, node: &'a str) -> Self {
        Self {
            node,
            dependencies: graph.dependencies_of(node).collect(),
            next: 0,
        }
    }

    fn next_dependency(&mut self) -> Option<&'a str> {
        let dependency = self.dependencies.get(self.next).copied()?;
        self.next += 1;
        Some(dependency)
    }
}

/// Tarjan's strongly connected components over `dependencies` edges.
///
/// `cyclic` collects every node in a component of two or more nodes, or with
/// an edge to itself.
#[derive(Default)]
struct SccWalk<'a> {
    index: BTreeMap<&'a str, usize>,
    lowlink: BTreeMap<&'a str, usize>,
    stack: Vec<&'a str>,
    on_stack: BTreeSet<&'a str>,
    frames: Vec<Frame<'a>>,
    cyclic: BTreeSet<&'a str>,
}

impl<'a> SccWalk<'a> {
    fn enter(&mut self, graph: &'a DependencyGraph, node: &'a str) {
        let index = self.index.len();
        self.index.insert(node, index);
        self.lowlink.insert(node, index);
        self.stack.push(node);
        self.on_stack.insert(node);
        self.frames.push(Frame::new(graph, node));
    }

    fn lower(&mut self, node: &'a str, value: usize) {
        if let Some(low) = self.lowlink.get_mut(node) {
            *low = (*low).min(value);
        }
    }

    fn run(&mut self, graph: &'a DependencyGraph, root: &'a str) {
        if self.index.contains_key(root) {
            return;
        }
        self.enter(graph, root);

        while let Some(frame) = self.frames.last_mut() {
            let node = frame.node;
            if let Some(dependency) = frame.next_dependency() {
                match self.index.get(dependency).copied() {
                    None => self.enter(graph, dependency),
                    Some(index) if self.on_stack.contains(dependency) => self.lower(node, index),
                    Some(_) => {}
                }
                continue;
            }

            self.frames.pop();
            let low = self.lowlink.get(node).copied().unwrap_or_default();
            if let Some(parent) = self.frames.last().map(|f| f.node) {
                self.lower(parent, low);
            }
            if Some(low) != self.index.get(node).copied() {
                continue;
            }

            let mut members = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(member);
                members.push(member);
                if member == node {
                    break;
                }
            }
            let self_loop = graph.dependencies_of(node).any(|d| d == node);
            if members.len() > 1 || self_loop {
                self.cyclic.extend(members);
            }
        }
    }
}

fn collect_references(
    components: &[Component],
    names: &mut BTreeSet<String>,
    currencies: &mut BTreeSet<String>,
) {
    for component in components {
        match component {
            Component::Variable(name) => {
                names.insert(name.clone());
            }
            Component::Literal {
                value: SemanticValue::Currency { code, .. } | SemanticValue::CurrencyUnit { code, .. },
                ..
            }
            | Component::Conversion(ConversionTarget::Currency(code)) => {
                currencies.insert(code.clone());
            }
            Component::Function { args, .. } => {
                for arg in args {
                    collect_references(&arg.components, names, currencies);
                }
            }
            Component::Group(children) => collect_references(children, names, currencies),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_dependencies() {
        let graph = DependencyGraph::new();
        assert_eq!(
            graph.extract_dependencies("monthly rent * 12 + sqrt(fee) + $0.15/h"),
            set(&["USD", "fee", "monthly rent"])
        );
        assert_eq!(graph.extract_dependencies("€10 to GBP"), set(&["EUR", "GBP"]));
        assert_eq!(graph.extract_dependencies("price (1 + 2)"), set(&["price"]));
        assert_eq!(graph.extract_dependencies("2 km + 3"), set(&[]));
        assert_eq!(graph.extract_dependencies("(a + b"), set(&["a", "b"]));
    }

    #[test]
    fn test_edges_are_transposed() {
        let mut graph = DependencyGraph::new();
        graph.add_node("total", "price * qty").unwrap();
        graph.add_node("price", "$5").unwrap();

        assert_eq!(graph.node("price").unwrap().dependents, set(&["total"]));
        assert_eq!(graph.dependents_of("qty").collect::<Vec<_>>(), vec!["total"]);

        graph.add_node("total", "price * 2").unwrap();
        assert_eq!(graph.dependents_of("qty").count(), 0);
        assert_eq!(graph.node("price").unwrap().dependents, set(&["total"]));
    }

    #[test]
    fn test_circular_reference() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", "2 b").unwrap();
        let err = graph.add_node("b", "3 a").unwrap_err();

        assert_eq!(
            err,
            Error::CircularDependency {
                path: vec!["b".into(), "a".into(), "b".into()]
            }
        );
        assert!(graph.is_circular("a"));
        assert!(graph.is_circular("b"));
        assert!(graph.contains("b"));
    }

    #[test]
    fn test_redefinition_clears_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", "b + 1").unwrap();
        assert!(graph.add_node("b", "a + 1").is_err());
        graph.add_node("b", "5").unwrap();
        assert!(!graph.is_circular("a"));
        assert!(!graph.is_circular("b"));
    }

    #[test]
    fn test_self_reference() {
        let mut graph = DependencyGraph::new();
        assert!(graph.add_node("x", "x + 1").is_err());
        assert!(graph.is_circular("x"));
    }

    #[test]
    fn test_node_downstream_of_cycle_is_not_circular() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a", "b").unwrap();
        assert!(graph.add_node("b", "a").is_err());
        assert!(graph.add_node("c", "a * 2").is_err());
        assert!(!graph.is_circular("c"));
    }

    #[test]
    fn test_update_order_is_deterministic() {
        let mut graph = DependencyGraph::new();
        graph.add_node("z", "1").unwrap();
        graph.add_node("total", "z + a").unwrap();
        graph.add_node("a", "z * 2").unwrap();
        assert_eq!(graph.get_update_order(), vec!["z", "a", "total"]);
    }

    #[test]
    fn test_rate_declarations_order_first() {
        let mut graph = DependencyGraph::new();
        graph.add_node("Cost", "€10 to USD").unwrap();
        graph.add_node("EUR", "$1.10").unwrap();
        graph.add_node("USD", "€0.91").unwrap();

        assert_eq!(graph.node("EUR").unwrap().dependencies, set(&[]));
        assert_eq!(graph.node("EUR").unwrap().dependents, set(&["Cost"]));
        assert!(!graph.is_circular("EUR"));
        assert_eq!(graph.get_update_order(), vec!["EUR", "USD", "Cost"]);
    }

    #[test]
    fn test_long_chain_and_ring() {
        const LENGTH: usize = 3000;

        // Small stack: the walks must not recurse per node
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let mut graph = DependencyGraph::new();
                graph.add_node("v0", "1").unwrap();
                for i in 1..LENGTH {
                    graph.add_node(&format!("v{i}"), &format!("v{} + 1", i - 1)).unwrap();
                }
                let order = graph.get_update_order();
                assert_eq!(order.len(), LENGTH);
                assert_eq!(order.first().map(String::as_str), Some("v0"));
                assert_eq!(order.last().map(|s| s.to_string()), Some(format!("v{}", LENGTH - 1)));

                let err = graph.add_node("v0", &format!("v{} + 1", LENGTH - 1)).unwrap_err();
                let Error::CircularDependency { path } = &err else {
                    panic!("Expected CircularDependency, got {err:?}");
                };
                assert_eq!(path.len(), LENGTH + 1);
                assert!(graph.nodes().all(|node| node.is_circular));
                assert_eq!(graph.get_update_order().len(), LENGTH);

                graph.add_node("v0", "1").unwrap();
                assert!(graph.nodes().all(|node| !node.is_circular));
            })
            .unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_custom_tokenizer() {
        fn nothing(_: &str) -> Vec<Token> {
            Vec::new()
        }
        let mut graph = DependencyGraph::with_tokenizer(nothing);
        graph.add_node("a", "b + c").unwrap();
        assert!(graph.node("a").unwrap().dependencies.is_empty());
    }

    proptest! {
        #[test]
        fn prop_dependencies_precede_dependents(
            edges in prop::collection::vec((0usize..8, 0usize..8), 0..20)
        ) {
            // Only edges from higher to lower index, so the graph is acyclic
            let mut definitions: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (from, to) in edges {
                if from > to {
                    definitions.entry(from).or_default().push(to);
                }
            }
            let mut graph = DependencyGraph::new();
            for node in 0..8usize {
                let raw = match definitions.get(&node) {
                    Some(deps) => deps
                        .iter()
                        .map(|d| format!("v{d}"))
                        .collect::<Vec<_>>()
                        .join(" + "),
                    None => "1".to_string(),
                };
                let name = format!("v{node}");
                prop_assert!(graph.add_node(&name, &raw).is_ok());
            }

            let order = graph.get_update_order();
            prop_assert_eq!(order.len(), 8);
            let position = |name: &str| order.iter().position(|n| n == name);
            for node in graph.nodes() {
                for dependency in &node.dependencies {
                    prop_assert!(position(dependency) < position(&node.name));
                }
            }
        }
    }
}
