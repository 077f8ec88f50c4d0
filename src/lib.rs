//! Compact CSC sampling graph for graph neural network pipelines.
//!
//! A [`CSCSamplingGraph`] stores the incoming edges of every node in
//! compressed sparse column layout, optionally tagged with node and edge
//! types described by a [`GraphMetadata`]. It supports O(degree) neighbor
//! lookup, in-subgraph extraction and a binary archive format.

pub mod config;
pub mod error;
pub mod sampling;
pub mod types;
pub mod util;

pub use error::{GraphBoltError, Result};
pub use sampling::archive::{load_csc_sampling_graph, save_csc_sampling_graph};
pub use sampling::{CSCSamplingGraph, HeteroInfo, SampledSubgraph};
pub use types::metadata::{GraphMetadata, GraphMetadataBuilder};
pub use types::EdgeType;
