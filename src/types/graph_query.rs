use crate::error::Result;
use crate::types::NodeId;

/// A trait that defines random-access query operations over a graph stored by destination.
///
/// Neighbors are always incoming: for a column `v`, `in_neighbors(v)` returns the
/// source ids of the edges ending at `v`, in storage order.
pub trait GraphQuery {
    /// Retrieves the sources of all incoming edges of a node.
    ///
    /// # Parameters
    ///
    /// * `node` - The destination node whose incoming edges are requested.
    ///
    /// # Returns
    ///
    /// A borrowed slice of source ids, or an `Index` error when `node` is out of range.
    fn in_neighbors(&self, node: NodeId) -> Result<&[NodeId]>;

    /// Number of incoming edges of a node.
    fn in_degree(&self, node: NodeId) -> Result<usize> {
        Ok(self.in_neighbors(node)?.len())
    }

    /// Checks if a node id exists in the graph.
    fn has_node(&self, node: NodeId) -> bool;

    /// Determines if an edge `src -> dst` exists.
    ///
    /// Returns `false` when either endpoint is out of range.
    fn has_edge(&self, src: NodeId, dst: NodeId) -> bool {
        if !self.has_node(src) {
            return false;
        }
        match self.in_neighbors(dst) {
            Ok(sources) => sources.contains(&src),
            Err(_) => false,
        }
    }

    /// Retrieves all node ids of the graph in ascending order.
    fn node_list(&self) -> Vec<NodeId>;
}
