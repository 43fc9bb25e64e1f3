//! JSON model documents.
//!
//! A document bundles everything a run needs besides its configuration:
//!
//! ```json
//! {
//!   "schema_version": "1.0.0",
//!   "nodes": [
//!     { "id": "p", "family": "beta", "params": { "alpha": 1.0, "beta": 1.0 } },
//!     { "id": "x", "family": "bernoulli", "params": ["p"] }
//!   ],
//!   "approximations": { "p": { "kind": "parametric", "family": "beta" } },
//!   "observations": { "x": [0, 1, 0, 0, 0, 0, 0, 0, 0, 1] }
//! }
//! ```
//!
//! Parameters are given either positionally or by name. A string refers to
//! another node, a number is a literal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ix_common::{VariableId, SCHEMA_VERSION};
use ix_math::DistributionTag;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::family::ApproximationSpec;
use crate::graph::{GraphError, ModelGraph, ObservedData, ParamRef, RandomVariableNode};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(ix_common::Error),

    #[error("node {node}: {family} has no parameter named {name}")]
    UnknownParameter {
        node: VariableId,
        family: DistributionTag,
        name: String,
    },

    #[error("node {node}: missing {family} parameter {name}")]
    MissingParameter {
        node: VariableId,
        family: DistributionTag,
        name: &'static str,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl From<DocumentError> for ix_common::Error {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Io { source, .. } => ix_common::Error::Io(source),
            DocumentError::Schema(inner) => inner,
            other => ix_common::Error::Model(other.to_string()),
        }
    }
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Node parameters, positional or keyed by parameter name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeParams {
    Positional(Vec<ParamRef>),
    Named(BTreeMap<String, ParamRef>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: VariableId,
    pub family: DistributionTag,
    pub params: NodeParams,
}

impl NodeSpec {
    fn into_node(self) -> Result<RandomVariableNode, DocumentError> {
        let params = match self.params {
            NodeParams::Positional(params) => params,
            NodeParams::Named(mut named) => {
                if let Some(name) = named
                    .keys()
                    .find(|name| self.family.param_index(name).is_none())
                {
                    return Err(DocumentError::UnknownParameter {
                        node: self.id,
                        family: self.family,
                        name: name.clone(),
                    });
                }
                let mut params = Vec::with_capacity(self.family.arity());
                for &name in self.family.param_names() {
                    match named.remove(name) {
                        Some(p) => params.push(p),
                        None => {
                            return Err(DocumentError::MissingParameter {
                                node: self.id,
                                family: self.family,
                                name,
                            })
                        }
                    }
                }
                params
            }
        };
        Ok(RandomVariableNode::new(self.id, self.family, params)?)
    }
}

/// A model, its approximations, and its observed data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub approximations: ApproximationSpec,
    #[serde(default)]
    pub observations: ObservedData,
}

impl ModelDocument {
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and check the schema version.
    pub fn parse(content: &str) -> Result<Self, DocumentError> {
        let doc: ModelDocument = serde_json::from_str(content)?;
        ix_common::schema::ensure_compatible(&doc.schema_version).map_err(DocumentError::Schema)?;
        Ok(doc)
    }

    /// Build the model graph described by `nodes`.
    pub fn graph(&self) -> Result<ModelGraph, DocumentError> {
        let nodes = self
            .nodes
            .iter()
            .cloned()
            .map(NodeSpec::into_node)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ModelGraph::new(nodes)?)
    }
}
