use rayon::iter::{
    IndexedParallelIterator, IntoParallelIterator, IntoParallelRefIterator, ParallelIterator,
};
use tracing::{debug, trace};

use crate::config::{ValidationLevel, PARALLEL_GATHER_THRESHOLD};
use crate::error::{GraphBoltError, Result};
use crate::types::graph_query::GraphQuery;
use crate::types::metadata::GraphMetadata;
use crate::types::{EdgeId, EdgeTypeId, NodeId, NodeTypeId, Offset};

pub mod archive;
pub mod graph_file;
pub mod sampled_subgraph;

pub use sampled_subgraph::SampledSubgraph;

/// The heterogeneous overlay of a graph.
///
/// The three parts only exist together, so a graph is either fully typed or not typed at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeteroInfo {
    /// Node ids in `[node_type_offset[t], node_type_offset[t + 1])` belong to node type `t`.
    pub node_type_offset: Vec<Offset>,

    /// Edge type id of every edge, aligned with `indices`.
    pub type_per_edge: Vec<EdgeTypeId>,

    /// Type vocabulary the ids above refer to.
    pub metadata: GraphMetadata,
}

/// A graph stored in CSC (compressed sparse column) layout.
///
/// Column `v` holds the incoming edges of node `v`: their sources are
/// `indices[indptr[v]..indptr[v + 1]]`. The edge at position `i` of `indices`
/// has edge id `i`. The graph is immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CSCSamplingGraph {
    /// Column offsets, `num_nodes + 1` entries starting at 0 and ending at `num_edges`.
    indptr: Vec<Offset>,

    /// Source node of every edge, grouped by destination.
    indices: Vec<NodeId>,

    /// Type information, present iff the graph is heterogeneous.
    hetero: Option<HeteroInfo>,
}

impl CSCSamplingGraph {
    /// Builds a graph from raw CSC arrays, trusting the producer for the bulk contents.
    ///
    /// The heterogeneous arguments must be supplied all together or not at all.
    ///
    /// # Errors
    /// `Validation` when the heterogeneous bundle is partial, when `node_type_offset`
    /// does not hold one entry per node type plus a sentinel, or when an array shape
    /// contradicts `indptr` (see [`Self::from_csc_with`]).
    pub fn from_csc(
        indptr: Vec<Offset>,
        indices: Vec<NodeId>,
        node_type_offset: Option<Vec<Offset>>,
        type_per_edge: Option<Vec<EdgeTypeId>>,
        metadata: Option<GraphMetadata>,
    ) -> Result<Self> {
        Self::from_csc_with(
            indptr,
            indices,
            node_type_offset,
            type_per_edge,
            metadata,
            ValidationLevel::Trusted,
        )
    }

    /// Same as [`Self::from_csc`], but scans every array for consistency.
    pub fn from_csc_checked(
        indptr: Vec<Offset>,
        indices: Vec<NodeId>,
        node_type_offset: Option<Vec<Offset>>,
        type_per_edge: Option<Vec<EdgeTypeId>>,
        metadata: Option<GraphMetadata>,
    ) -> Result<Self> {
        Self::from_csc_with(
            indptr,
            indices,
            node_type_offset,
            type_per_edge,
            metadata,
            ValidationLevel::Strict,
        )
    }

    /// Builds a homogeneous graph.
    pub fn from_homo(indptr: Vec<Offset>, indices: Vec<NodeId>) -> Result<Self> {
        Self::from_csc(indptr, indices, None, None, None)
    }

    /// Builds a graph with an explicit validation level.
    ///
    /// Both levels check, in O(1): a non-empty `indptr` starting at 0 and ending at
    /// `indices.len()`, a `type_per_edge` as long as `indices`, and a `node_type_offset`
    /// of `num_node_types + 1` entries starting at 0 and ending at `num_nodes`.
    ///
    /// `Strict` additionally scans for non-decreasing offsets, source ids below
    /// `num_nodes` and edge type ids below `num_edge_types`.
    pub fn from_csc_with(
        indptr: Vec<Offset>,
        indices: Vec<NodeId>,
        node_type_offset: Option<Vec<Offset>>,
        type_per_edge: Option<Vec<EdgeTypeId>>,
        metadata: Option<GraphMetadata>,
        level: ValidationLevel,
    ) -> Result<Self> {
        let hetero = match (node_type_offset, type_per_edge, metadata) {
            (None, None, None) => None,
            (Some(node_type_offset), Some(type_per_edge), Some(metadata)) => Some(HeteroInfo {
                node_type_offset,
                type_per_edge,
                metadata,
            }),
            (node_type_offset, type_per_edge, metadata) => {
                let describe = |present: bool| if present { "given" } else { "missing" };
                return Err(GraphBoltError::validation(format!(
                    "node_type_offset ({}), type_per_edge ({}) and metadata ({}) must be given together",
                    describe(node_type_offset.is_some()),
                    describe(type_per_edge.is_some()),
                    describe(metadata.is_some()),
                )));
            }
        };

        let graph = Self {
            indptr,
            indices,
            hetero,
        };
        graph.check_shape()?;
        if level == ValidationLevel::Strict {
            graph.check_contents()?;
        }

        debug!(
            num_nodes = graph.num_nodes(),
            num_edges = graph.num_edges(),
            heterogeneous = graph.is_heterogeneous(),
            ?level,
            "built CSC sampling graph"
        );
        Ok(graph)
    }

    fn check_shape(&self) -> Result<()> {
        let Some(&last) = self.indptr.last() else {
            return Err(GraphBoltError::validation(
                "indptr must hold at least one entry",
            ));
        };
        if self.indptr[0] != 0 {
            return Err(GraphBoltError::validation(format!(
                "indptr must start at 0, got {}",
                self.indptr[0]
            )));
        }
        if last != self.indices.len() as u64 {
            return Err(GraphBoltError::validation(format!(
                "indptr ends at {last} but there are {} indices",
                self.indices.len()
            )));
        }

        if let Some(hetero) = &self.hetero {
            let expected = hetero.metadata.num_node_types() + 1;
            if hetero.node_type_offset.len() != expected {
                return Err(GraphBoltError::validation(format!(
                    "node_type_offset has {} entries, expected {expected} for {} node types",
                    hetero.node_type_offset.len(),
                    hetero.metadata.num_node_types()
                )));
            }
            let first = hetero.node_type_offset[0];
            let end = hetero.node_type_offset[expected - 1];
            if first != 0 || end != self.num_nodes() as u64 {
                return Err(GraphBoltError::validation(format!(
                    "node_type_offset must span [0, {}], got [{first}, {end}]",
                    self.num_nodes()
                )));
            }
            if hetero.type_per_edge.len() != self.indices.len() {
                return Err(GraphBoltError::validation(format!(
                    "type_per_edge has {} entries for {} edges",
                    hetero.type_per_edge.len(),
                    self.indices.len()
                )));
            }
        }
        Ok(())
    }

    fn check_contents(&self) -> Result<()> {
        if let Some(pos) = self.indptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(GraphBoltError::validation(format!(
                "indptr decreases at column {pos}"
            )));
        }
        let num_nodes = self.num_nodes() as u64;
        if let Some(pos) = self.indices.par_iter().position_any(|&src| src >= num_nodes) {
            return Err(GraphBoltError::validation(format!(
                "edge {pos} has source {} outside [0, {num_nodes})",
                self.indices[pos]
            )));
        }
        if let Some(hetero) = &self.hetero {
            if let Some(pos) = hetero.node_type_offset.windows(2).position(|w| w[0] > w[1]) {
                return Err(GraphBoltError::validation(format!(
                    "node_type_offset decreases at node type {pos}"
                )));
            }
            let num_edge_types = hetero.metadata.num_edge_types() as u64;
            if let Some(pos) = hetero
                .type_per_edge
                .par_iter()
                .position_any(|&etype| etype as u64 >= num_edge_types)
            {
                return Err(GraphBoltError::validation(format!(
                    "edge {pos} has type {} but only {num_edge_types} edge types exist",
                    hetero.type_per_edge[pos]
                )));
            }
        }
        Ok(())
    }

    /// Returns the number of nodes, one per column.
    pub fn num_nodes(&self) -> usize {
        self.indptr.len() - 1
    }

    /// Returns the number of edges stored in `indices`.
    pub fn num_edges(&self) -> usize {
        self.indices.len()
    }

    /// Column offsets of the CSC layout.
    ///
    /// # Returns
    /// `num_nodes + 1` non-decreasing offsets; column `v` spans `indptr[v]..indptr[v + 1]`.
    pub fn csc_indptr(&self) -> &[Offset] {
        &self.indptr
    }

    /// Source node of every edge, indexed by edge id.
    pub fn indices(&self) -> &[NodeId] {
        &self.indices
    }

    /// Whether the graph carries node and edge types.
    pub fn is_heterogeneous(&self) -> bool {
        self.hetero.is_some()
    }

    /// The whole heterogeneous overlay, `None` for homogeneous graphs.
    pub fn hetero(&self) -> Option<&HeteroInfo> {
        self.hetero.as_ref()
    }

    /// Node type boundaries.
    ///
    /// # Returns
    /// `num_node_types + 1` offsets starting at 0 and ending at `num_nodes`, or `None`
    /// for homogeneous graphs.
    pub fn node_type_offset(&self) -> Option<&[Offset]> {
        self.hetero.as_ref().map(|h| h.node_type_offset.as_slice())
    }

    /// Edge type id of every edge, aligned with [`Self::indices`].
    pub fn type_per_edge(&self) -> Option<&[EdgeTypeId]> {
        self.hetero.as_ref().map(|h| h.type_per_edge.as_slice())
    }

    /// Type vocabulary of a heterogeneous graph.
    pub fn metadata(&self) -> Option<&GraphMetadata> {
        self.hetero.as_ref().map(|h| &h.metadata)
    }

    /// Node type of a node, `None` for homogeneous graphs.
    ///
    /// Node types with no nodes have equal consecutive offsets; the last type whose
    /// range starts at or before `node` is the owner.
    pub fn node_type_of(&self, node: NodeId) -> Result<Option<NodeTypeId>> {
        self.check_node(node)?;
        Ok(self.hetero.as_ref().map(|hetero| {
            let owner = hetero
                .node_type_offset
                .partition_point(|&start| start <= node)
                .saturating_sub(1);
            owner as NodeTypeId
        }))
    }

    /// Edge type of an edge, `None` for homogeneous graphs.
    ///
    /// # Errors
    /// `EdgeIndex` when `edge` is outside `[0, num_edges)`.
    pub fn edge_type_of(&self, edge: EdgeId) -> Result<Option<EdgeTypeId>> {
        if edge >= self.num_edges() as u64 {
            return Err(GraphBoltError::EdgeIndex {
                edge,
                num_edges: self.num_edges() as u64,
            });
        }
        Ok(self.type_per_edge().map(|types| types[edge as usize]))
    }

    fn check_node(&self, node: NodeId) -> Result<()> {
        if node >= self.num_nodes() as u64 {
            return Err(GraphBoltError::Index {
                node,
                num_nodes: self.num_nodes() as u64,
            });
        }
        Ok(())
    }

    /// Edge position range of a column, or a validation error when a trusted
    /// `indptr` turns out to be malformed.
    fn column_range(&self, node: NodeId) -> Result<(usize, usize)> {
        self.check_node(node)?;
        let v = node as usize;
        let start = self.indptr[v] as usize;
        let end = self.indptr[v + 1] as usize;
        if start > end || end > self.indices.len() {
            return Err(GraphBoltError::validation(format!(
                "indptr of column {node} is malformed: [{start}, {end})"
            )));
        }
        Ok((start, end))
    }

    /// Extracts the subgraph made of the incoming edges of `nodes`.
    ///
    /// Columns follow the order of `nodes` and repeated ids produce repeated
    /// columns. Sources are not relabeled: output `indices` hold global node ids
    /// and `reverse_row_node_ids` is the identity over all nodes.
    ///
    /// # Errors
    /// `Index` when a requested node is outside `[0, num_nodes)`.
    pub fn in_subgraph(&self, nodes: &[NodeId]) -> Result<SampledSubgraph> {
        // Step 1: Resolve the edge range of every requested column
        let ranges = nodes
            .iter()
            .map(|&node| self.column_range(node))
            .collect::<Result<Vec<_>>>()?;

        // Step 2: Prefix sum of the column degrees
        let mut indptr = Vec::with_capacity(nodes.len() + 1);
        indptr.push(0 as Offset);
        let mut total = 0usize;
        for (start, end) in &ranges {
            total += end - start;
            indptr.push(total as Offset);
        }

        // Step 3: Gather sources, edge ids and edge types into the output columns
        let mut indices = vec![0 as NodeId; total];
        let mut reverse_edge_ids = vec![0 as EdgeId; total];
        let mut type_per_edge = self.hetero.as_ref().map(|_| vec![0 as EdgeTypeId; total]);

        if nodes.len() >= PARALLEL_GATHER_THRESHOLD {
            self.gather_parallel(
                &ranges,
                &indptr,
                &mut indices,
                &mut reverse_edge_ids,
                type_per_edge.as_deref_mut(),
            );
        } else {
            self.gather_sequential(
                &ranges,
                &mut indices,
                &mut reverse_edge_ids,
                type_per_edge.as_deref_mut(),
            );
        }

        trace!(
            num_columns = nodes.len(),
            num_edges = total,
            "extracted in-subgraph"
        );

        Ok(SampledSubgraph {
            indptr,
            indices,
            reverse_column_node_ids: nodes.to_vec(),
            reverse_row_node_ids: (0..self.num_nodes() as NodeId).collect(),
            reverse_edge_ids,
            type_per_edge,
        })
    }

    fn gather_sequential(
        &self,
        ranges: &[(usize, usize)],
        indices: &mut [NodeId],
        reverse_edge_ids: &mut [EdgeId],
        type_per_edge: Option<&mut [EdgeTypeId]>,
    ) {
        let mut cursor = 0usize;
        for &(start, end) in ranges {
            let len = end - start;
            indices[cursor..cursor + len].copy_from_slice(&self.indices[start..end]);
            fill_edge_ids(&mut reverse_edge_ids[cursor..cursor + len], start);
            cursor += len;
        }

        if let (Some(out), Some(types)) = (type_per_edge, self.type_per_edge()) {
            let mut cursor = 0usize;
            for &(start, end) in ranges {
                let len = end - start;
                out[cursor..cursor + len].copy_from_slice(&types[start..end]);
                cursor += len;
            }
        }
    }

    fn gather_parallel(
        &self,
        ranges: &[(usize, usize)],
        indptr: &[Offset],
        indices: &mut [NodeId],
        reverse_edge_ids: &mut [EdgeId],
        type_per_edge: Option<&mut [EdgeTypeId]>,
    ) {
        split_by_offsets(indices, indptr)
            .into_par_iter()
            .zip(split_by_offsets(reverse_edge_ids, indptr))
            .zip(ranges.par_iter())
            .for_each(|((index_out, edge_out), &(start, end))| {
                index_out.copy_from_slice(&self.indices[start..end]);
                fill_edge_ids(edge_out, start);
            });

        if let (Some(out), Some(types)) = (type_per_edge, self.type_per_edge()) {
            split_by_offsets(out, indptr)
                .into_par_iter()
                .zip(ranges.par_iter())
                .for_each(|(type_out, &(start, end))| {
                    type_out.copy_from_slice(&types[start..end]);
                });
        }
    }
}

impl GraphQuery for CSCSamplingGraph {
    fn in_neighbors(&self, node: NodeId) -> Result<&[NodeId]> {
        let (start, end) = self.column_range(node)?;
        Ok(&self.indices[start..end])
    }

    fn has_node(&self, node: NodeId) -> bool {
        node < self.num_nodes() as u64
    }

    fn node_list(&self) -> Vec<NodeId> {
        (0..self.num_nodes() as NodeId).collect()
    }
}

fn fill_edge_ids(out: &mut [EdgeId], first: usize) {
    for (k, slot) in out.iter_mut().enumerate() {
        *slot = (first + k) as EdgeId;
    }
}

/// Cuts `buffer` into the disjoint column slices described by a prefix-sum `indptr`.
fn split_by_offsets<'a, T>(mut buffer: &'a mut [T], indptr: &[Offset]) -> Vec<&'a mut [T]> {
    let mut slices = Vec::with_capacity(indptr.len().saturating_sub(1));
    for w in indptr.windows(2) {
        let (head, tail) = std::mem::take(&mut buffer).split_at_mut((w[1] - w[0]) as usize);
        slices.push(head);
        buffer = tail;
    }
    slices
}
