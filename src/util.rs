use rand::Rng;

use crate::error::{GraphBoltError, Result};
use crate::types::metadata::{GraphMetadata, GraphMetadataBuilder};
use crate::types::{EdgeTypeId, NodeId, Offset};

/// Raw arrays of a random heterogeneous graph, ready for `CSCSamplingGraph::from_csc`.
#[derive(Clone, Debug)]
pub struct RandomHeteroGraph {
    pub indptr: Vec<Offset>,
    pub indices: Vec<NodeId>,
    pub node_type_offset: Vec<Offset>,
    pub type_per_edge: Vec<EdgeTypeId>,
    pub metadata: GraphMetadata,
}

/// Builds a vocabulary of `num_ntypes` node types `n0, n1, ...` and up to
/// `num_etypes` edge types `(n{i}, e{k}, n{j})` with `i <= j`, assigned in
/// lexicographic order of `(i, j)`.
///
/// Fewer edge types are produced when `num_ntypes` does not allow that many pairs.
pub fn chain_metadata(num_ntypes: usize, num_etypes: usize) -> Result<GraphMetadata> {
    let mut builder = GraphMetadataBuilder::new();
    let names: Vec<String> = (0..num_ntypes).map(|i| format!("n{i}")).collect();
    for name in &names {
        builder.add_node_type(name)?;
    }
    let pairs = (0..num_ntypes).flat_map(|i| (i..num_ntypes).map(move |j| (i, j)));
    for (count, (i, j)) in pairs.take(num_etypes).enumerate() {
        builder.add_edge_type(&names[i], &format!("e{count}"), &names[j])?;
    }
    builder.build()
}

/// Sorted random offsets in `[0, end]` with the first pinned to 0 and the last to `end`.
fn random_offsets<R: Rng>(rng: &mut R, len: usize, end: u64) -> Vec<Offset> {
    let mut offsets: Vec<Offset> = (0..len)
        .map(|_| if end == 0 { 0 } else { rng.gen_range(0..end) })
        .collect();
    offsets.sort_unstable();
    offsets[0] = 0;
    offsets[len - 1] = end;
    offsets
}

/// Random CSC arrays with `num_nodes` columns and `num_edges` edges.
///
/// # Errors
/// `Validation` when edges are requested for a graph without nodes.
pub fn random_homo_graph(num_nodes: usize, num_edges: usize) -> Result<(Vec<Offset>, Vec<NodeId>)> {
    if num_nodes == 0 && num_edges > 0 {
        return Err(GraphBoltError::validation(format!(
            "cannot place {num_edges} edges in a graph without nodes"
        )));
    }
    let mut rng = rand::thread_rng();
    let indptr = random_offsets(&mut rng, num_nodes + 1, num_edges as u64);
    let indices = (0..num_edges)
        .map(|_| rng.gen_range(0..num_nodes as NodeId))
        .collect();
    Ok((indptr, indices))
}

/// Random heterogeneous graph over [`chain_metadata`]; edge types are sorted within each column.
pub fn random_hetero_graph(
    num_nodes: usize,
    num_edges: usize,
    num_ntypes: usize,
    num_etypes: usize,
) -> Result<RandomHeteroGraph> {
    let metadata = chain_metadata(num_ntypes, num_etypes)?;
    let num_etypes = metadata.num_edge_types() as EdgeTypeId;
    if num_edges > 0 && num_etypes == 0 {
        return Err(GraphBoltError::validation(
            "a graph with edges needs at least one edge type",
        ));
    }
    let (indptr, indices) = random_homo_graph(num_nodes, num_edges)?;
    let mut rng = rand::thread_rng();

    // Randomly get node type split points
    let node_type_offset = random_offsets(&mut rng, num_ntypes + 1, num_nodes as u64);

    let mut type_per_edge = Vec::with_capacity(num_edges);
    for w in indptr.windows(2) {
        let mut column: Vec<EdgeTypeId> = (w[0]..w[1])
            .map(|_| rng.gen_range(0..num_etypes))
            .collect();
        column.sort_unstable();
        type_per_edge.append(&mut column);
    }

    Ok(RandomHeteroGraph {
        indptr,
        indices,
        node_type_offset,
        type_per_edge,
        metadata,
    })
}

#[cfg(test)]
mod test_util {
    use super::*;

    #[test]
    fn test_chain_metadata_shape() {
        let metadata = chain_metadata(3, 5).unwrap();
        assert_eq!(metadata.num_node_types(), 3);
        assert_eq!(metadata.num_edge_types(), 5);
        assert_eq!(metadata.edge_type(4).unwrap().to_string(), "n1:e4:n2");

        // Only one pair exists for a single node type
        assert_eq!(chain_metadata(1, 3).unwrap().num_edge_types(), 1);
    }

    #[test]
    fn test_random_homo_graph_is_consistent() {
        let (indptr, indices) = random_homo_graph(10, 50).unwrap();
        assert_eq!(indptr.len(), 11);
        assert_eq!(indptr[0], 0);
        assert_eq!(indptr[10], 50);
        assert!(indptr.windows(2).all(|w| w[0] <= w[1]));
        assert!(indices.iter().all(|&v| v < 10));

        let (indptr, indices) = random_homo_graph(0, 0).unwrap();
        assert_eq!(indptr, vec![0]);
        assert!(indices.is_empty());

        assert!(matches!(random_homo_graph(0, 3), Err(GraphBoltError::Validation(_))));
    }

    #[test]
    fn test_random_hetero_graph_is_consistent() {
        let parts = random_hetero_graph(100, 1000, 3, 5).unwrap();
        assert_eq!(parts.node_type_offset.len(), 4);
        assert_eq!(parts.node_type_offset[3], 100);
        assert_eq!(parts.type_per_edge.len(), 1000);
        assert!(parts.type_per_edge.iter().all(|&t| t < 5));
    }

    #[test]
    fn test_random_hetero_graph_needs_types() {
        assert!(random_hetero_graph(10, 5, 2, 0).is_err());
        assert!(random_hetero_graph(0, 5, 2, 1).is_err());
        assert!(random_hetero_graph(10, 0, 2, 0).is_ok());
    }
}
