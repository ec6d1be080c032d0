//! Dependency tracking and evaluation order for report fields

use crate::evaluator::quoted_literal;
use crate::functions::Function;
use crate::lexer::{is_keyword, tokenize, Token};
use ahash::{AHashMap, AHashSet};
use std::fmt;

/// Free identifiers a formula references, in order of first appearance
///
/// Purely syntactic: keywords, string literal contents and names in call position that
/// name a known function are skipped. A quoted-literal formula or one that fails to
/// tokenize references nothing.
pub fn referenced_names(formula: &str) -> Vec<String> {
    if quoted_literal(formula).is_some() {
        return Vec::new();
    }
    let tokens = match tokenize(formula) {
        Ok(tokens) => tokens,
        Err(_) => return Vec::new(),
    };

    let mut names: Vec<String> = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let (name, quoted) = match token.identifier() {
            Some(ident) => ident,
            None => continue,
        };
        if !quoted {
            if is_keyword(name) {
                continue;
            }
            let is_call = matches!(tokens.get(i + 1), Some(Token::LeftParen));
            if is_call
                && (Function::from_name(name).is_some() || name.eq_ignore_ascii_case("distinct"))
            {
                continue;
            }
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// A cycle found while ordering fields
///
/// `path` starts and ends with the field that was re-entered: `a -> b -> a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleWarning {
    pub path: Vec<String>,
}

impl CycleWarning {
    /// Fields on the cycle, each once
    pub fn members(&self) -> &[String] {
        match self.path.split_last() {
            Some((_, members)) if !members.is_empty() => members,
            _ => &self.path,
        }
    }

    /// Check whether a field lies on this cycle
    pub fn contains(&self, field: &str) -> bool {
        self.path.iter().any(|f| f == field)
    }
}

impl fmt::Display for CycleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular reference: {}", self.path.join(" -> "))
    }
}

/// Evaluation order produced by [`DependencyGraph::schedule`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Every node exactly once, dependencies first
    pub order: Vec<String>,
    /// Cycles encountered (non-fatal)
    pub cycles: Vec<CycleWarning>,
}

impl Schedule {
    /// Check whether a field lies on any detected cycle
    pub fn is_cyclic(&self, field: &str) -> bool {
        self.cycles.iter().any(|c| c.contains(field))
    }

    /// Position of a field in the order
    pub fn position(&self, field: &str) -> Option<usize> {
        self.order.iter().position(|f| f == field)
    }
}

/// Dependency graph for report fields
///
/// Nodes keep insertion order so that scheduling is deterministic and follows the field
/// definition order wherever dependencies allow.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Nodes in insertion order
    nodes: Vec<String>,
    /// Field → Fields it depends on (precedents), in reference order
    precedents: AHashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node (no-op if present)
    pub fn add_node(&mut self, node: &str) {
        if !self.contains(node) {
            self.nodes.push(node.to_string());
        }
    }

    /// Check whether a node is present
    pub fn contains(&self, node: &str) -> bool {
        self.nodes.iter().any(|n| n == node)
    }

    /// Add a dependency: dependent depends on precedent
    pub fn add_dependency(&mut self, precedent: &str, dependent: &str) {
        self.add_node(dependent);
        self.add_node(precedent);

        let precs = self.precedents.entry(dependent.to_string()).or_default();
        if !precs.iter().any(|p| p == precedent) {
            precs.push(precedent.to_string());
        }
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(String::as_str)
    }

    /// Get nodes that the given node depends on
    pub fn get_precedents(&self, node: &str) -> impl Iterator<Item = &str> + '_ {
        self.precedents
            .get(node)
            .into_iter()
            .flat_map(|precs| precs.iter().map(String::as_str))
    }

    /// Order every node after its dependencies
    ///
    /// DFS from each unvisited node in insertion order, emitting a node once all of its
    /// precedents are emitted. Reaching a node that is still on the DFS stack records a
    /// [`CycleWarning`] and stops that branch, so every node is still emitted exactly once.
    pub fn schedule(&self) -> Schedule {
        let mut schedule = Schedule::default();
        let mut visited = AHashSet::new();
        let mut stack: Vec<&str> = Vec::new();

        for node in &self.nodes {
            self.topological_sort(node, &mut schedule, &mut visited, &mut stack);
        }

        schedule
    }

    /// Topological sort helper (DFS)
    fn topological_sort<'a>(
        &'a self,
        node: &'a str,
        schedule: &mut Schedule,
        visited: &mut AHashSet<&'a str>,
        stack: &mut Vec<&'a str>,
    ) {
        if visited.contains(node) {
            return;
        }

        if let Some(pos) = stack.iter().position(|n| *n == node) {
            let mut path: Vec<String> = stack[pos..].iter().map(|n| n.to_string()).collect();
            path.push(node.to_string());
            let warning = CycleWarning { path };
            log::warn!("{}", warning);
            schedule.cycles.push(warning);
            return;
        }

        stack.push(node);

        // Visit all precedents first
        if let Some(precedents) = self.precedents.get(node) {
            for precedent in precedents {
                self.topological_sort(precedent, schedule, visited, stack);
            }
        }

        stack.pop();
        visited.insert(node);
        schedule.order.push(node.to_string());
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_referenced_names() {
        assert_eq!(
            referenced_names("SUM(Revenue) / total_units + growth"),
            vec!["Revenue", "total_units", "growth"]
        );
        assert_eq!(
            referenced_names("COUNT(DISTINCT(Customer))"),
            vec!["Customer"]
        );
        // Keywords, literals and string contents are not references
        assert_eq!(
            referenced_names("COUNT(region == 'North' and not flag) + TRUE"),
            vec!["region", "flag"]
        );
        // A name used as a plain identifier still counts, even if it spells a function
        assert_eq!(referenced_names("sum + 1"), vec!["sum"]);
        assert_eq!(referenced_names("`unit price` * qty"), vec!["unit price", "qty"]);
    }

    #[test]
    fn test_referenced_names_literal_and_garbage() {
        assert!(referenced_names("'total revenue'").is_empty());
        assert!(referenced_names("a $ b").is_empty());
        assert_eq!(referenced_names("a + a"), vec!["a"]);
    }

    #[test]
    fn test_referenced_names_quoted_concatenation() {
        assert_eq!(referenced_names("'Total: ' + label + ''"), vec!["label"]);
        assert_eq!(referenced_names("'(' + region + ') ' + total"), vec!["region", "total"]);
        assert!(referenced_names("'it's here'").is_empty());
    }

    #[test]
    fn test_add_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b");

        assert!(graph.get_precedents("b").any(|n| n == "a"));
        assert_eq!(graph.get_precedents("a").count(), 0);
        assert_eq!(graph.nodes().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_schedule_orders_precedents_first() {
        let mut graph = DependencyGraph::new();
        graph.add_node("b");
        graph.add_node("a");
        graph.add_node("c");
        // b depends on a, c depends on b
        graph.add_dependency("a", "b");
        graph.add_dependency("b", "c");

        let schedule = graph.schedule();
        assert_eq!(schedule.order, vec!["a", "b", "c"]);
        assert!(schedule.cycles.is_empty());
    }

    #[test]
    fn test_schedule_keeps_definition_order_for_independent_nodes() {
        let mut graph = DependencyGraph::new();
        for node in ["z", "m", "a"] {
            graph.add_node(node);
        }
        assert_eq!(graph.schedule().order, vec!["z", "m", "a"]);
    }

    #[test]
    fn test_schedule_mutual_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("b", "a");
        graph.add_dependency("a", "b");

        let schedule = graph.schedule();
        assert_eq!(schedule.order.len(), 2);
        assert_eq!(schedule.cycles.len(), 1);
        assert_eq!(schedule.cycles[0].path, vec!["a", "b", "a"]);
        assert_eq!(schedule.cycles[0].members(), &["a".to_string(), "b".to_string()]);
        assert!(schedule.is_cyclic("a"));
        assert!(schedule.is_cyclic("b"));
    }

    #[test]
    fn test_schedule_self_loop() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "a");
        graph.add_node("b");

        let schedule = graph.schedule();
        assert_eq!(schedule.order, vec!["a", "b"]);
        assert_eq!(schedule.cycles[0].path, vec!["a", "a"]);
        assert_eq!(schedule.cycles[0].to_string(), "Circular reference: a -> a");
    }
}
