//! Model graph: random-variable nodes and their dependencies.
//!
//! A node's parameters are either literal constants or references to other
//! nodes; the references are the node's parents. The graph owns its nodes,
//! rejects cycles at construction, and evaluates the joint log density of a
//! latent assignment together with observed data.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use ix_common::VariableId;
use ix_math::{Distribution, DistributionTag, MathError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Observed values per observable variable. Each value is one i.i.d. draw.
pub type ObservedData = BTreeMap<VariableId, Vec<f64>>;

/// Latent values keyed by variable.
pub type Assignment = BTreeMap<VariableId, f64>;

/// Errors raised by the model graph.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("duplicate variable {0}")]
    Duplicate(VariableId),

    #[error("variable {node} references unknown parent {parent}")]
    UnknownParent { node: VariableId, parent: VariableId },

    #[error("variable {node}: {source}")]
    Parameters {
        node: VariableId,
        #[source]
        source: MathError,
    },

    #[error("dependency cycle through {0}")]
    Cycle(VariableId),

    #[error("no value bound for {0}")]
    MissingBinding(VariableId),

    #[error("log density is not a number at {0}")]
    NotANumber(VariableId),
}

/// A parameter slot: a literal or a reference to another variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamRef {
    Const(f64),
    Var(VariableId),
}

impl From<f64> for ParamRef {
    fn from(value: f64) -> Self {
        ParamRef::Const(value)
    }
}

impl From<&str> for ParamRef {
    fn from(id: &str) -> Self {
        ParamRef::Var(VariableId::from(id))
    }
}

impl From<VariableId> for ParamRef {
    fn from(id: VariableId) -> Self {
        ParamRef::Var(id)
    }
}

/// An immutable random-variable node.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomVariableNode {
    id: VariableId,
    family: DistributionTag,
    params: Vec<ParamRef>,
    parents: BTreeSet<VariableId>,
}

impl RandomVariableNode {
    pub fn new(
        id: impl Into<VariableId>,
        family: DistributionTag,
        params: Vec<ParamRef>,
    ) -> Result<Self, GraphError> {
        let id = id.into();
        if params.len() != family.arity() {
            return Err(GraphError::Parameters {
                node: id,
                source: MathError::Arity {
                    family,
                    expected: family.arity(),
                    got: params.len(),
                },
            });
        }
        let parents = params
            .iter()
            .filter_map(|p| match p {
                ParamRef::Var(parent) => Some(parent.clone()),
                ParamRef::Const(_) => None,
            })
            .collect();
        Ok(Self {
            id,
            family,
            params,
            parents,
        })
    }

    pub fn id(&self) -> &VariableId {
        &self.id
    }

    pub fn family(&self) -> DistributionTag {
        self.family
    }

    pub fn params(&self) -> &[ParamRef] {
        &self.params
    }

    pub fn parents(&self) -> &BTreeSet<VariableId> {
        &self.parents
    }

    /// Build the node's distribution, looking parent values up in `values`.
    pub fn resolve<F>(&self, values: F) -> Result<Distribution, GraphError>
    where
        F: Fn(&VariableId) -> Option<f64>,
    {
        let mut resolved = Vec::with_capacity(self.params.len());
        for param in &self.params {
            match param {
                ParamRef::Const(v) => resolved.push(*v),
                ParamRef::Var(parent) => {
                    let v = values(parent).ok_or_else(|| GraphError::MissingBinding(parent.clone()))?;
                    resolved.push(v);
                }
            }
        }
        Distribution::from_params(self.family, &resolved).map_err(|source| GraphError::Parameters {
            node: self.id.clone(),
            source,
        })
    }

    /// The node's distribution when every parameter is a literal.
    pub fn constant_distribution(&self) -> Option<Distribution> {
        if self.parents.is_empty() {
            self.resolve(|_| None).ok()
        } else {
            None
        }
    }

    /// Whether `x` is a possible observation of this node.
    pub fn admits(&self, x: f64) -> bool {
        match self.constant_distribution() {
            Some(dist) => dist.contains(x),
            None => {
                if !self.family.admits(x) {
                    return false;
                }
                // A literal trial count still bounds binomial observations.
                match (self.family, self.params.first()) {
                    (DistributionTag::Binomial, Some(ParamRef::Const(n))) => x <= *n,
                    _ => true,
                }
            }
        }
    }
}

/// Directed acyclic graph of random variables.
#[derive(Debug, Clone)]
pub struct ModelGraph {
    nodes: BTreeMap<VariableId, RandomVariableNode>,
    children: BTreeMap<VariableId, BTreeSet<VariableId>>,
    order: Vec<VariableId>,
}

impl ModelGraph {
    pub fn new(nodes: Vec<RandomVariableNode>) -> Result<Self, GraphError> {
        let mut by_id = BTreeMap::new();
        for node in nodes {
            if by_id.contains_key(node.id()) {
                return Err(GraphError::Duplicate(node.id().clone()));
            }
            by_id.insert(node.id().clone(), node);
        }

        let mut children: BTreeMap<VariableId, BTreeSet<VariableId>> =
            by_id.keys().map(|id| (id.clone(), BTreeSet::new())).collect();
        for node in by_id.values() {
            for parent in node.parents() {
                match children.get_mut(parent) {
                    Some(set) => {
                        set.insert(node.id().clone());
                    }
                    None => {
                        return Err(GraphError::UnknownParent {
                            node: node.id().clone(),
                            parent: parent.clone(),
                        })
                    }
                }
            }
        }

        let order = topological_order(&by_id, &children)?;
        Ok(Self {
            nodes: by_id,
            children,
            order,
        })
    }

    pub fn builder() -> ModelGraphBuilder {
        ModelGraphBuilder::default()
    }

    pub fn node(&self, id: &VariableId) -> Option<&RandomVariableNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &VariableId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in topological order (parents before children).
    pub fn nodes(&self) -> impl Iterator<Item = &RandomVariableNode> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn topological_order(&self) -> &[VariableId] {
        &self.order
    }

    pub fn children(&self, id: &VariableId) -> impl Iterator<Item = &VariableId> {
        self.children.get(id).into_iter().flatten()
    }

    /// A leaf has no children and may be bound to observed data.
    pub fn is_leaf(&self, id: &VariableId) -> bool {
        self.children.get(id).map_or(true, |c| c.is_empty())
    }

    /// Joint log density of `latent` and `observed`.
    ///
    /// Parameter values that fall outside a family's domain (for example a
    /// negative scale proposed for a latent) contribute zero density and
    /// yield `-inf`. A variable with neither a latent value nor observations
    /// is an error.
    pub fn log_joint(&self, latent: &Assignment, observed: &ObservedData) -> Result<f64, GraphError> {
        let mut total = 0.0;
        for node in self.nodes() {
            let dist = match node.resolve(|parent| latent.get(parent).copied()) {
                Ok(dist) => dist,
                Err(GraphError::Parameters { .. }) => return Ok(f64::NEG_INFINITY),
                Err(e) => return Err(e),
            };
            if let Some(values) = observed.get(node.id()) {
                for &x in values {
                    total += dist.ln_pdf(x);
                }
            } else {
                let x = latent
                    .get(node.id())
                    .copied()
                    .ok_or_else(|| GraphError::MissingBinding(node.id().clone()))?;
                total += dist.ln_pdf(x);
            }
            if total.is_nan() {
                return Err(GraphError::NotANumber(node.id().clone()));
            }
            if total == f64::NEG_INFINITY {
                return Ok(total);
            }
        }
        Ok(total)
    }
}

/// Kahn's algorithm; ties broken by identifier so the order is deterministic.
fn topological_order(
    nodes: &BTreeMap<VariableId, RandomVariableNode>,
    children: &BTreeMap<VariableId, BTreeSet<VariableId>>,
) -> Result<Vec<VariableId>, GraphError> {
    let mut in_degree: BTreeMap<&VariableId, usize> =
        nodes.iter().map(|(id, node)| (id, node.parents().len())).collect();
    let mut ready: VecDeque<&VariableId> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(id) = ready.pop_front() {
        order.push(id.clone());
        for child in children.get(id).into_iter().flatten() {
            if let Some(d) = in_degree.get_mut(child) {
                *d -= 1;
                if *d == 0 {
                    ready.push_back(child);
                }
            }
        }
    }

    if order.len() != nodes.len() {
        let stuck = in_degree
            .into_iter()
            .find(|(_, d)| *d > 0)
            .map(|(id, _)| id.clone())
            .unwrap_or_else(|| VariableId::from("?"));
        return Err(GraphError::Cycle(stuck));
    }
    Ok(order)
}

/// Fluent construction for tests and embedding code.
#[derive(Debug, Default)]
pub struct ModelGraphBuilder {
    nodes: Vec<RandomVariableNode>,
    error: Option<GraphError>,
}

impl ModelGraphBuilder {
    pub fn node<I, P>(mut self, id: &str, family: DistributionTag, params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ParamRef>,
    {
        if self.error.is_some() {
            return self;
        }
        let params = params.into_iter().map(Into::into).collect();
        match RandomVariableNode::new(id, family, params) {
            Ok(node) => self.nodes.push(node),
            Err(e) => self.error = Some(e),
        }
        self
    }

    pub fn build(self) -> Result<ModelGraph, GraphError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        ModelGraph::new(self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin() -> ModelGraph {
        ModelGraph::builder()
            .node("p", DistributionTag::Beta, [1.0, 1.0])
            .node("x", DistributionTag::Bernoulli, ["p"])
            .build()
            .unwrap()
    }

    #[test]
    fn parents_come_from_references() {
        let graph = coin();
        let x = graph.node(&"x".into()).unwrap();
        assert!(x.parents().contains("p"));
        assert!(graph.node(&"p".into()).unwrap().parents().is_empty());
    }

    #[test]
    fn children_and_leaves() {
        let graph = coin();
        let kids: Vec<_> = graph.children(&"p".into()).cloned().collect();
        assert_eq!(kids, vec![VariableId::from("x")]);
        assert!(graph.is_leaf(&"x".into()));
        assert!(!graph.is_leaf(&"p".into()));
    }

    #[test]
    fn topological_order_puts_parents_first() {
        let graph = ModelGraph::builder()
            .node("y", DistributionTag::Normal, ["mu", "sigma"])
            .node("sigma", DistributionTag::Gamma, [2.0, 2.0])
            .node("mu", DistributionTag::Normal, [0.0, 1.0])
            .build()
            .unwrap();
        let order: Vec<&str> = graph.topological_order().iter().map(|v| v.as_str()).collect();
        assert_eq!(order, vec!["mu", "sigma", "y"]);
    }

    #[test]
    fn rejects_cycles() {
        let err = ModelGraph::builder()
            .node("a", DistributionTag::Normal, [ParamRef::from("b"), ParamRef::from(1.0)])
            .node("b", DistributionTag::Normal, [ParamRef::from("a"), ParamRef::from(1.0)])
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::Cycle(_)));
    }

    #[test]
    fn rejects_unknown_parent_and_duplicates() {
        let err = ModelGraph::builder()
            .node("x", DistributionTag::Bernoulli, ["q"])
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownParent { .. }));

        let err = ModelGraph::builder()
            .node("p", DistributionTag::Beta, [1.0, 1.0])
            .node("p", DistributionTag::Beta, [2.0, 2.0])
            .build()
            .unwrap_err();
        assert_eq!(err, GraphError::Duplicate("p".into()));
    }

    #[test]
    fn rejects_wrong_arity() {
        let err = ModelGraph::builder()
            .node("p", DistributionTag::Beta, [1.0])
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::Parameters { .. }));
    }

    #[test]
    fn log_joint_sums_prior_and_likelihood() {
        let graph = coin();
        let mut latent = Assignment::new();
        latent.insert("p".into(), 0.25);
        let mut observed = ObservedData::new();
        observed.insert("x".into(), vec![1.0, 0.0, 0.0]);
        let lp = graph.log_joint(&latent, &observed).unwrap();
        let expected = 0.25f64.ln() + 2.0 * 0.75f64.ln();
        assert!((lp - expected).abs() < 1e-12);
    }

    #[test]
    fn log_joint_out_of_domain_is_neg_infinity() {
        let graph = ModelGraph::builder()
            .node("s", DistributionTag::Normal, [0.0, 1.0])
            .node("y", DistributionTag::Normal, [ParamRef::from(0.0), ParamRef::from("s")])
            .build()
            .unwrap();
        let mut latent = Assignment::new();
        latent.insert("s".into(), -1.0);
        let mut observed = ObservedData::new();
        observed.insert("y".into(), vec![0.3]);
        assert_eq!(graph.log_joint(&latent, &observed).unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn log_joint_requires_bindings() {
        let graph = coin();
        let err = graph.log_joint(&Assignment::new(), &ObservedData::new()).unwrap_err();
        assert_eq!(err, GraphError::MissingBinding("p".into()));
    }

    #[test]
    fn admits_uses_literal_trial_count() {
        let graph = ModelGraph::builder()
            .node("p", DistributionTag::Beta, [1.0, 1.0])
            .node("k", DistributionTag::Binomial, [ParamRef::from(5.0), ParamRef::from("p")])
            .build()
            .unwrap();
        let k = graph.node(&"k".into()).unwrap();
        assert!(k.admits(5.0));
        assert!(!k.admits(6.0));
        assert!(!k.admits(2.5));
    }

    #[test]
    fn param_refs_deserialize_untagged() {
        let params: Vec<ParamRef> = serde_json::from_str(r#"[1.5, "mu"]"#).unwrap();
        assert_eq!(params, vec![ParamRef::Const(1.5), ParamRef::from("mu")]);
    }
}
