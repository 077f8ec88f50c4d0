use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::config::READ_BUFFER_SIZE;
use crate::error::{GraphBoltError, Result};
use crate::sampling::CSCSamplingGraph;
use crate::types::{NodeId, Offset};

impl CSCSamplingGraph {
    /// Loads a homogeneous graph from a text graph file.
    ///
    /// # Format
    /// - First line: `t [vertex_count] [edge_count]`
    /// - Vertex lines: `v [vertex_id] ...` (only checked for range)
    /// - Edge lines: `e [source_id] [destination_id]`
    ///
    /// Blank lines and lines starting with `#` are skipped. Every edge becomes an
    /// incoming edge of its destination; edges of one destination keep file order,
    /// so edge ids follow the order in which the file lists them per column.
    pub fn from_graph_file<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let file_path = file_path.as_ref();
        let graph_file = File::open(file_path)?;
        let mut lines = BufReader::with_capacity(READ_BUFFER_SIZE, graph_file).lines();

        // Parse the header line to extract vertex and edge counts
        let header = lines
            .next()
            .ok_or_else(|| GraphBoltError::validation("graph file is empty"))??;
        let header_tokens: Vec<&str> = header.split_whitespace().collect();
        let (vertex_count, declared_edges) = match header_tokens.as_slice() {
            ["t", vertices, edges] => (parse_token(vertices, 1)?, parse_token(edges, 1)?),
            _ => {
                return Err(GraphBoltError::validation(format!(
                    "line 1: expected `t [vertex_count] [edge_count]`, got {header:?}"
                )))
            }
        };

        let num_columns = usize::try_from(vertex_count)
            .ok()
            .filter(|&n| n < usize::MAX)
            .ok_or_else(|| {
                GraphBoltError::validation(format!("line 1: vertex count {vertex_count} is too large"))
            })?;

        let pb = ProgressBar::new(vertex_count.saturating_add(declared_edges));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .map_err(|e| GraphBoltError::validation(e.to_string()))?
                .progress_chars("=>-"),
        );
        pb.set_message("Graph Loading.");

        // The header edge count is only a hint, the vector grows past it if needed
        let edge_hint = declared_edges.min(MAX_EDGE_CAPACITY_HINT) as usize;
        let mut edges = Vec::<(NodeId, NodeId)>::with_capacity(edge_hint);
        let mut in_degrees = zeroed_offsets(num_columns)?;

        for (line_idx, line) in lines.enumerate() {
            let line = line?;
            let line_no = line_idx + 2;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.first() {
                None => continue,
                Some(token) if token.starts_with('#') => continue,
                Some(&"v") => {
                    let vertex = parse_token(tokens.get(1).copied().unwrap_or(""), line_no)?;
                    check_range(vertex, vertex_count, line_no)?;
                }
                Some(&"e") => {
                    let src = parse_token(tokens.get(1).copied().unwrap_or(""), line_no)?;
                    let dst = parse_token(tokens.get(2).copied().unwrap_or(""), line_no)?;
                    check_range(src, vertex_count, line_no)?;
                    check_range(dst, vertex_count, line_no)?;
                    edges.push((src, dst));
                    in_degrees[dst as usize] += 1;
                }
                Some(other) => {
                    return Err(GraphBoltError::validation(format!(
                        "line {line_no}: unknown record type {other:?}"
                    )))
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if edges.len() as u64 != declared_edges {
            warn!(
                declared = declared_edges,
                found = edges.len(),
                "edge count in graph file header does not match its edge lines"
            );
        }

        // Compute CSC offsets from in-degrees
        let mut indptr = zeroed_offsets(num_columns + 1)?;
        for (v, degree) in in_degrees.iter().enumerate() {
            indptr[v + 1] = indptr[v] + degree;
        }

        // Place every source at the next free slot of its destination column
        let mut cursor: Vec<usize> = indptr[..num_columns].iter().map(|&o| o as usize).collect();
        let mut indices = vec![0 as NodeId; edges.len()];
        for (src, dst) in edges {
            let slot = &mut cursor[dst as usize];
            indices[*slot] = src;
            *slot += 1;
        }

        Self::from_homo(indptr, indices)
    }
}

/// Upper bound on the edge capacity reserved from the header alone.
const MAX_EDGE_CAPACITY_HINT: u64 = 1 << 24;

/// A zeroed offset array, or a validation error when the declared size cannot be allocated.
fn zeroed_offsets(len: usize) -> Result<Vec<Offset>> {
    let mut offsets = Vec::new();
    offsets.try_reserve_exact(len).map_err(|_| {
        GraphBoltError::validation(format!("cannot allocate offsets for {len} vertices"))
    })?;
    offsets.resize(len, 0);
    Ok(offsets)
}

fn parse_token(token: &str, line_no: usize) -> Result<u64> {
    token.parse::<u64>().map_err(|_| {
        GraphBoltError::validation(format!("line {line_no}: {token:?} is not a non-negative integer"))
    })
}

fn check_range(vertex: u64, vertex_count: u64, line_no: usize) -> Result<()> {
    if vertex >= vertex_count {
        return Err(GraphBoltError::validation(format!(
            "line {line_no}: vertex {vertex} exceeds the declared count {vertex_count}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod test_graph_file {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::types::graph_query::GraphQuery;

    #[test]
    fn test_load_example_graph() {
        let graph = CSCSamplingGraph::from_graph_file("data/example.graph").unwrap();
        assert_eq!(graph.num_nodes(), 5);
        assert_eq!(graph.num_edges(), 12);
        assert_eq!(graph.csc_indptr(), &[0, 3, 5, 7, 9, 12]);
        assert_eq!(graph.indices(), &[0, 1, 4, 2, 3, 0, 1, 1, 2, 0, 3, 4]);
        assert!(graph.has_edge(4, 0));
    }

    #[test]
    fn test_edges_are_grouped_by_destination() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("small.graph");
        fs::write(&path, "t 3 4\n# comment\ne 0 2\ne 1 0\n\ne 2 2\ne 0 0\n").unwrap();
        let graph = CSCSamplingGraph::from_graph_file(&path).unwrap();
        assert_eq!(graph.csc_indptr(), &[0, 2, 2, 4]);
        assert_eq!(graph.indices(), &[1, 0, 0, 2]);
    }

    #[test]
    fn test_malformed_files_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.graph");
        for content in [
            "",
            "t 3\n",
            "x 5 12\n",
            "t 2 1\ne 0 2\n",
            "t 2 1\ne 0 x\n",
            "t 2 1\nq 0 1\n",
            "t 18446744073709551615 0\n",
        ] {
            fs::write(&path, content).unwrap();
            let result = CSCSamplingGraph::from_graph_file(&path);
            assert!(
                matches!(result, Err(GraphBoltError::Validation(_))),
                "accepted {content:?}"
            );
        }
    }

    #[test]
    fn test_header_edge_count_is_only_a_hint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hint.graph");

        fs::write(&path, "t 1 1000000000000000000\ne 0 0\n").unwrap();
        let graph = CSCSamplingGraph::from_graph_file(&path).unwrap();
        assert_eq!(graph.csc_indptr(), &[0, 1]);
        assert_eq!(graph.indices(), &[0]);

        fs::write(&path, "t 1 18446744073709551615\n").unwrap();
        let graph = CSCSamplingGraph::from_graph_file(&path).unwrap();
        assert_eq!(graph.num_nodes(), 1);
        assert_eq!(graph.num_edges(), 0);
    }
}
