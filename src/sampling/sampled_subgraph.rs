use crate::types::{EdgeId, EdgeTypeId, NodeId, Offset};

/// Result of an in-subgraph extraction.
///
/// Columns are local (`0..reverse_column_node_ids.len()`), while `indices`
/// keep the global source ids of the original graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampledSubgraph {
    /// Column offsets of the extracted edges.
    pub indptr: Vec<Offset>,

    /// Global source id of every extracted edge.
    pub indices: Vec<NodeId>,

    /// Global node id of every local column, the requested nodes in request order.
    pub reverse_column_node_ids: Vec<NodeId>,

    /// Global node id of every row; rows are never relabeled so this is `0..num_nodes`.
    pub reverse_row_node_ids: Vec<NodeId>,

    /// Position in the original `indices` of every extracted edge.
    pub reverse_edge_ids: Vec<EdgeId>,

    /// Edge type of every extracted edge, present iff the source graph is heterogeneous.
    pub type_per_edge: Option<Vec<EdgeTypeId>>,
}

impl SampledSubgraph {
    pub fn num_columns(&self) -> usize {
        self.reverse_column_node_ids.len()
    }

    pub fn num_edges(&self) -> usize {
        self.indices.len()
    }

    /// Iterates over the extracted edges as global `(src, dst)` pairs in output order.
    pub fn node_pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.indptr
            .windows(2)
            .zip(&self.reverse_column_node_ids)
            .flat_map(move |(w, &dst)| {
                self.indices[w[0] as usize..w[1] as usize]
                    .iter()
                    .map(move |&src| (src, dst))
            })
    }
}

#[cfg(test)]
mod test_sampled_subgraph {
    use super::*;

    #[test]
    fn test_node_pairs_follow_columns() {
        let subgraph = SampledSubgraph {
            indptr: vec![0, 2, 2, 3],
            indices: vec![2, 3, 0],
            reverse_column_node_ids: vec![1, 3, 4],
            reverse_row_node_ids: vec![0, 1, 2, 3, 4],
            reverse_edge_ids: vec![3, 4, 9],
            type_per_edge: None,
        };
        assert_eq!(subgraph.num_columns(), 3);
        assert_eq!(subgraph.num_edges(), 3);
        let pairs: Vec<_> = subgraph.node_pairs().collect();
        assert_eq!(pairs, vec![(2, 1), (3, 1), (0, 4)]);
    }
}
