use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GraphBoltError;

pub mod graph_serialize;
pub mod graph_query;
pub mod metadata;

/// Global node identifier; nodes are numbered densely from 0.
pub type NodeId = u64;

/// Edge identifier, equal to the edge's position in the `indices` array.
pub type EdgeId = u64;

/// Position into the `indices` array (entries of `indptr` and `node_type_offset`).
pub type Offset = u64;

/// Dense id of a node type in [`metadata::GraphMetadata`].
pub type NodeTypeId = u32;

/// Dense id of an edge type in [`metadata::GraphMetadata`].
pub type EdgeTypeId = u32;

/// Separator of the canonical `"src:relation:dst"` edge type string.
pub const EDGE_TYPE_DELIMITER: char = ':';

/// A canonical edge type, the ordered triple (source node type, relation, destination node type).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeType {
    pub src: String,
    pub relation: String,
    pub dst: String,
}

impl EdgeType {
    pub fn new(src: impl Into<String>, relation: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            relation: relation.into(),
            dst: dst.into(),
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{d}{}{d}{}",
            self.src,
            self.relation,
            self.dst,
            d = EDGE_TYPE_DELIMITER
        )
    }
}

impl FromStr for EdgeType {
    type Err = GraphBoltError;

    /// Parses `"src:relation:dst"`; any other arity is a validation error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(EDGE_TYPE_DELIMITER).collect();
        match parts.as_slice() {
            [src, relation, dst] => Ok(EdgeType::new(*src, *relation, *dst)),
            _ => Err(GraphBoltError::validation(format!(
                "edge type {s:?} must have exactly three parts separated by '{EDGE_TYPE_DELIMITER}'"
            ))),
        }
    }
}

#[cfg(test)]
pub mod test_type {
    use super::*;

    #[test]
    fn test_edge_type_string_form() {
        let etype = EdgeType::new("user", "follows", "user");
        assert_eq!(etype.to_string(), "user:follows:user");
        assert_eq!("user:follows:user".parse::<EdgeType>().unwrap(), etype);
    }

    #[test]
    fn test_edge_type_wrong_arity() {
        assert!("e1".parse::<EdgeType>().is_err());
        assert!("n1:e1".parse::<EdgeType>().is_err());
        assert!("n1:e1:n2:n3".parse::<EdgeType>().is_err());
    }

    #[test]
    fn test_edge_type_ordering_follows_fields() {
        let a = EdgeType::new("a", "r", "b");
        let b = EdgeType::new("a", "s", "a");
        assert!(a < b);
    }
}
