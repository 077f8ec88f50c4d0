use std::collections::BTreeMap;
use std::fmt::Display;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{GraphBoltError, Result};
use crate::types::{EdgeType, EdgeTypeId, NodeTypeId};

/// Type vocabulary of a heterogeneous graph.
///
/// Node types map a name to a dense id, edge types map a canonical
/// `(src, relation, dst)` triple to a dense id. Both id ranges start at 0
/// without gaps, and every node type named by an edge type is registered.
/// Two metadata values are equal iff both mappings are equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphMetadata {
    node_type_to_id: BTreeMap<String, NodeTypeId>,
    edge_type_to_id: BTreeMap<EdgeType, EdgeTypeId>,
}

impl GraphMetadata {
    /// Validates both mappings and builds the metadata.
    ///
    /// # Errors
    /// `Validation` when ids of either mapping are duplicated or not the
    /// contiguous range `0..len`, or when an edge type references an unknown node type.
    pub fn new(
        node_type_to_id: BTreeMap<String, NodeTypeId>,
        edge_type_to_id: BTreeMap<EdgeType, EdgeTypeId>,
    ) -> Result<Self> {
        check_dense_ids("node type", node_type_to_id.iter().map(|(k, v)| (k, *v)))?;
        check_dense_ids("edge type", edge_type_to_id.iter().map(|(k, v)| (k, *v)))?;

        for etype in edge_type_to_id.keys() {
            for endpoint in [&etype.src, &etype.dst] {
                if !node_type_to_id.contains_key(endpoint) {
                    return Err(GraphBoltError::validation(format!(
                        "edge type {etype} references unknown node type {endpoint:?}"
                    )));
                }
            }
        }

        Ok(Self {
            node_type_to_id,
            edge_type_to_id,
        })
    }

    /// Parses metadata from a YAML document of the form
    ///
    /// ```yaml
    /// node_types: { user: 0, item: 1 }
    /// edge_types:
    ///   "user:clicks:item": 0
    ///   ? [item, clicked-by, user]
    ///   : 1
    /// ```
    pub fn from_yaml(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text)
            .map_err(|e| GraphBoltError::validation(format!("metadata is not valid YAML: {e}")))?;
        Self::from_yaml_value(&value)
    }

    /// Builds metadata from a loosely typed YAML value, checking the type of every key and id.
    pub fn from_yaml_value(value: &Value) -> Result<Self> {
        let document = value
            .as_mapping()
            .ok_or_else(|| GraphBoltError::validation("metadata document must be a mapping"))?;

        let node_types = document
            .get("node_types")
            .and_then(Value::as_mapping)
            .ok_or_else(|| GraphBoltError::validation("metadata requires a `node_types` mapping"))?;

        let mut node_type_to_id = BTreeMap::new();
        for (key, id) in node_types {
            let name = key.as_str().ok_or_else(|| {
                GraphBoltError::validation(format!("node type key {key:?} is not a string"))
            })?;
            node_type_to_id.insert(name.to_owned(), parse_type_id(id, name)?);
        }

        let mut edge_type_to_id = BTreeMap::new();
        match document.get("edge_types") {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(edge_types)) => {
                for (key, id) in edge_types {
                    let etype = parse_edge_type_key(key)?;
                    let id = parse_type_id(id, &etype)?;
                    if edge_type_to_id.insert(etype.clone(), id).is_some() {
                        return Err(GraphBoltError::validation(format!(
                            "edge type {etype} is listed twice"
                        )));
                    }
                }
            }
            Some(other) => {
                return Err(GraphBoltError::validation(format!(
                    "`edge_types` must be a mapping, got {other:?}"
                )))
            }
        }

        Self::new(node_type_to_id, edge_type_to_id)
    }

    pub fn node_type_to_id(&self) -> &BTreeMap<String, NodeTypeId> {
        &self.node_type_to_id
    }

    pub fn edge_type_to_id(&self) -> &BTreeMap<EdgeType, EdgeTypeId> {
        &self.edge_type_to_id
    }

    pub fn num_node_types(&self) -> usize {
        self.node_type_to_id.len()
    }

    pub fn num_edge_types(&self) -> usize {
        self.edge_type_to_id.len()
    }

    pub fn node_type_id(&self, name: &str) -> Option<NodeTypeId> {
        self.node_type_to_id.get(name).copied()
    }

    pub fn edge_type_id(&self, etype: &EdgeType) -> Option<EdgeTypeId> {
        self.edge_type_to_id.get(etype).copied()
    }

    /// Reverse lookup of a node type name.
    pub fn node_type_name(&self, id: NodeTypeId) -> Option<&str> {
        self.node_type_to_id
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k.as_str())
    }

    /// Reverse lookup of an edge type triple.
    pub fn edge_type(&self, id: EdgeTypeId) -> Option<&EdgeType> {
        self.edge_type_to_id
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k)
    }
}

/// Incremental construction that assigns the next free id on every insertion.
#[derive(Debug, Default)]
pub struct GraphMetadataBuilder {
    node_type_to_id: BTreeMap<String, NodeTypeId>,
    edge_type_to_id: BTreeMap<EdgeType, EdgeTypeId>,
}

impl GraphMetadataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node type, returning the existing id if the name is already known.
    pub fn add_node_type(&mut self, name: &str) -> Result<NodeTypeId> {
        if let Some(id) = self.node_type_to_id.get(name) {
            return Ok(*id);
        }
        let id = next_id(self.node_type_to_id.len())?;
        self.node_type_to_id.insert(name.to_owned(), id);
        Ok(id)
    }

    /// Registers an edge type between two already registered node types.
    pub fn add_edge_type(&mut self, src: &str, relation: &str, dst: &str) -> Result<EdgeTypeId> {
        let etype = EdgeType::new(src, relation, dst);
        for endpoint in [src, dst] {
            if !self.node_type_to_id.contains_key(endpoint) {
                return Err(GraphBoltError::validation(format!(
                    "edge type {etype} references unknown node type {endpoint:?}"
                )));
            }
        }
        if self.edge_type_to_id.contains_key(&etype) {
            return Err(GraphBoltError::validation(format!("duplicate edge type {etype}")));
        }
        let id = next_id(self.edge_type_to_id.len())?;
        self.edge_type_to_id.insert(etype, id);
        Ok(id)
    }

    pub fn build(self) -> Result<GraphMetadata> {
        GraphMetadata::new(self.node_type_to_id, self.edge_type_to_id)
    }
}

/// Persisted form of [`GraphMetadata`], ordered by id.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MetadataRecord {
    pub node_types: Vec<(String, NodeTypeId)>,
    pub edge_types: Vec<(EdgeType, EdgeTypeId)>,
}

impl From<&GraphMetadata> for MetadataRecord {
    fn from(metadata: &GraphMetadata) -> Self {
        let mut node_types: Vec<_> = metadata
            .node_type_to_id
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        node_types.sort_by_key(|(_, id)| *id);
        let mut edge_types: Vec<_> = metadata
            .edge_type_to_id
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        edge_types.sort_by_key(|(_, id)| *id);
        Self {
            node_types,
            edge_types,
        }
    }
}

impl TryFrom<MetadataRecord> for GraphMetadata {
    type Error = GraphBoltError;

    fn try_from(record: MetadataRecord) -> Result<Self> {
        let node_count = record.node_types.len();
        let edge_count = record.edge_types.len();
        let node_type_to_id: BTreeMap<_, _> = record.node_types.into_iter().collect();
        let edge_type_to_id: BTreeMap<_, _> = record.edge_types.into_iter().collect();
        if node_type_to_id.len() != node_count || edge_type_to_id.len() != edge_count {
            return Err(GraphBoltError::validation("metadata record repeats a type name"));
        }
        GraphMetadata::new(node_type_to_id, edge_type_to_id)
    }
}

/// Ids must be exactly `0..len`: every id in range and none repeated.
fn check_dense_ids<K, I>(kind: &str, entries: I) -> Result<()>
where
    K: Display,
    I: ExactSizeIterator<Item = (K, u32)>,
{
    let count = entries.len();
    let mut seen = FxHashSet::default();
    for (key, id) in entries {
        if id as usize >= count {
            return Err(GraphBoltError::validation(format!(
                "{kind} {key} has id {id}, ids must be contiguous in 0..{count}"
            )));
        }
        if !seen.insert(id) {
            return Err(GraphBoltError::validation(format!(
                "{kind} {key} reuses id {id}"
            )));
        }
    }
    Ok(())
}

fn next_id(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| GraphBoltError::validation("too many types for a u32 id"))
}

fn parse_type_id(value: &Value, owner: impl Display) -> Result<u32> {
    value
        .as_u64()
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| {
            GraphBoltError::validation(format!(
                "id {value:?} of {owner} is not a non-negative integer"
            ))
        })
}

fn parse_edge_type_key(key: &Value) -> Result<EdgeType> {
    match key {
        Value::String(s) => s.parse(),
        Value::Sequence(parts) => {
            let names: Option<Vec<&str>> = parts.iter().map(Value::as_str).collect();
            match names.as_deref() {
                Some([src, relation, dst]) => Ok(EdgeType::new(*src, *relation, *dst)),
                Some(_) => Err(GraphBoltError::validation(format!(
                    "edge type key {key:?} must have exactly three parts"
                ))),
                None => Err(GraphBoltError::validation(format!(
                    "edge type key {key:?} must consist of strings"
                ))),
            }
        }
        other => Err(GraphBoltError::validation(format!(
            "edge type key {other:?} is neither a string nor a sequence"
        ))),
    }
}
