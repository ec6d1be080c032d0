//! Report field definitions
//!
//! A [`FieldSet`] is the ordered collection of named fields one report binds to a dataset.
//! Definition order matters: the scheduler follows it wherever dependencies allow.

use crate::{referenced_names, ChartSpec, DependencyGraph, Scalar};

/// What a field resolves from
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A literal value, stored as-is
    Fixed(Scalar),
    /// An expression over dataset columns and other fields
    Formula(String),
    /// A chart drawn by the chart collaborator
    Chart(ChartSpec),
}

impl FieldKind {
    /// Label used in settings files and log messages
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Fixed(_) => "fixed",
            FieldKind::Formula(_) => "formula",
            FieldKind::Chart(_) => "chart",
        }
    }

    /// Expression text, for formula fields
    pub fn expression(&self) -> Option<&str> {
        match self {
            FieldKind::Formula(expression) => Some(expression),
            _ => None,
        }
    }
}

/// A named report variable
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new<S: Into<String>>(name: S, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn formula<S: Into<String>, E: Into<String>>(name: S, expression: E) -> Self {
        Self::new(name, FieldKind::Formula(expression.into()))
    }

    pub fn fixed<S: Into<String>, V: Into<Scalar>>(name: S, value: V) -> Self {
        Self::new(name, FieldKind::Fixed(value.into()))
    }

    pub fn chart<S: Into<String>>(name: S, spec: ChartSpec) -> Self {
        Self::new(name, FieldKind::Chart(spec))
    }
}

/// Dependency graph over a field set
#[derive(Debug, Clone, Default)]
pub struct FieldGraph {
    /// Edges between distinct fields
    pub graph: DependencyGraph,
    /// Formula fields whose expression names the field itself
    pub self_references: Vec<String>,
}

/// Ordered set of fields with unique names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: Vec<Field>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing (in place) any field with the same name
    ///
    /// Returns the replaced field.
    pub fn insert(&mut self, field: Field) -> Option<Field> {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(slot) => Some(std::mem::replace(slot, field)),
            None => {
                self.fields.push(field);
                None
            }
        }
    }

    /// Builder form of [`FieldSet::insert`] for a formula field
    pub fn formula<S: Into<String>, E: Into<String>>(mut self, name: S, expression: E) -> Self {
        self.insert(Field::formula(name, expression));
        self
    }

    /// Builder form of [`FieldSet::insert`] for a fixed field
    pub fn fixed<S: Into<String>, V: Into<Scalar>>(mut self, name: S, value: V) -> Self {
        self.insert(Field::fixed(name, value));
        self
    }

    /// Builder form of [`FieldSet::insert`] for a chart field
    pub fn chart<S: Into<String>>(mut self, name: S, spec: ChartSpec) -> Self {
        self.insert(Field::chart(name, spec));
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Field> {
        let index = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Fields in definition order
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build the dependency graph
    ///
    /// Every field becomes a node, in definition order. A formula field gets an edge to each
    /// other defined field its expression names; its own name is reported separately since it
    /// may equally be a dataset column.
    pub fn build_graph(&self) -> FieldGraph {
        let mut result = FieldGraph::default();

        for field in &self.fields {
            result.graph.add_node(&field.name);
        }

        for field in &self.fields {
            let Some(expression) = field.kind.expression() else {
                continue;
            };
            for name in referenced_names(expression) {
                if name == field.name {
                    result.self_references.push(name);
                } else if self.contains(&name) {
                    result.graph.add_dependency(&name, &field.name);
                }
            }
        }

        result
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut set = FieldSet::new();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
