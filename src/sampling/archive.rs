//! Binary archive of a [`CSCSamplingGraph`].
//!
//! Layout (little-endian):
//!
//! ```text
//! magic "GBCSCSG\0" | version: u32 | section count: u32 | section*
//! section = tag: u8 | element width: u8 | element count: u64 | payload
//! ```
//!
//! `indptr` and `indices` are mandatory. `node_type_offset`, `type_per_edge`
//! and `metadata` are either all present or all absent.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use memmap2::Mmap;
use tracing::{debug, info};

use crate::config::{ValidationLevel, ARCHIVE_MAGIC, ARCHIVE_VERSION, WRITE_BUFFER_SIZE};
use crate::error::{GraphBoltError, Result};
use crate::sampling::CSCSamplingGraph;
use crate::types::graph_serialize::{ByteEncodable, TopologyDecode, TopologyEncode};
use crate::types::metadata::{GraphMetadata, MetadataRecord};

const HEADER_SIZE: usize = ARCHIVE_MAGIC.len() + 4 + 4;

/// Identifies the content of an archive section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum SectionTag {
    Indptr = 1,
    Indices = 2,
    NodeTypeOffset = 3,
    TypePerEdge = 4,
    Metadata = 5,
}

impl SectionTag {
    const ALL: [SectionTag; 5] = [
        SectionTag::Indptr,
        SectionTag::Indices,
        SectionTag::NodeTypeOffset,
        SectionTag::TypePerEdge,
        SectionTag::Metadata,
    ];

    fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| *tag as u8 == value)
    }

    /// Byte width of one element of the section.
    fn width(self) -> usize {
        match self {
            SectionTag::Indptr | SectionTag::Indices | SectionTag::NodeTypeOffset => u64::byte_size(),
            SectionTag::TypePerEdge => u32::byte_size(),
            SectionTag::Metadata => 1,
        }
    }

    fn slot(self) -> usize {
        self as usize - 1
    }
}

/// An encoded section waiting to be written.
#[derive(Debug)]
pub(crate) struct SectionBuf {
    pub tag: SectionTag,
    pub count: u64,
    pub payload: Vec<u8>,
}

impl SectionBuf {
    fn array<T: ByteEncodable>(tag: SectionTag, values: &Vec<T>) -> Self {
        Self {
            tag,
            count: values.len() as u64,
            payload: values.encode_topology(),
        }
    }
}

/// Encodes every section of a graph, mandatory sections first.
pub(crate) fn graph_sections(graph: &CSCSamplingGraph) -> Result<Vec<SectionBuf>> {
    let mut sections = vec![
        SectionBuf::array(SectionTag::Indptr, &graph.indptr),
        SectionBuf::array(SectionTag::Indices, &graph.indices),
    ];
    if let Some(hetero) = &graph.hetero {
        sections.push(SectionBuf::array(SectionTag::NodeTypeOffset, &hetero.node_type_offset));
        sections.push(SectionBuf::array(SectionTag::TypePerEdge, &hetero.type_per_edge));
        let payload = bincode::serialize(&MetadataRecord::from(&hetero.metadata))
            .map_err(std::io::Error::other)?;
        sections.push(SectionBuf {
            tag: SectionTag::Metadata,
            count: payload.len() as u64,
            payload,
        });
    }
    Ok(sections)
}

pub(crate) fn write_sections<W: Write>(writer: &mut W, sections: &[SectionBuf]) -> Result<()> {
    writer.write_all(&ARCHIVE_MAGIC)?;
    writer.write_all(&ARCHIVE_VERSION.to_bytes())?;
    writer.write_all(&(sections.len() as u32).to_bytes())?;
    for section in sections {
        writer.write_all(&[section.tag as u8, section.tag.width() as u8])?;
        writer.write_all(&section.count.to_bytes())?;
        writer.write_all(&section.payload)?;
    }
    Ok(())
}

/// Writes the archive of `graph` into any byte sink.
pub fn write_csc_sampling_graph<W: Write>(graph: &CSCSamplingGraph, writer: &mut W) -> Result<()> {
    let sections = graph_sections(graph)?;
    write_sections(writer, &sections)
}

/// Saves `graph` to `path`, replacing any existing file.
pub fn save_csc_sampling_graph<P: AsRef<Path>>(graph: &CSCSamplingGraph, path: P) -> Result<()> {
    let path = path.as_ref();
    let start = Instant::now();

    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    write_csc_sampling_graph(graph, &mut writer)?;
    writer.flush()?;

    info!(
        path = %path.display(),
        num_nodes = graph.num_nodes(),
        num_edges = graph.num_edges(),
        heterogeneous = graph.is_heterogeneous(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "saved CSC sampling graph"
    );
    Ok(())
}

/// Loads a graph previously written by [`save_csc_sampling_graph`].
///
/// # Errors
/// `Io` when the file cannot be read, `CorruptArchive` when its content is not a
/// consistent archive.
pub fn load_csc_sampling_graph<P: AsRef<Path>>(path: P) -> Result<CSCSamplingGraph> {
    let path = path.as_ref();
    let start = Instant::now();

    let file = File::open(path)?;
    let file_len = fs::metadata(path)?.len();
    if file_len < HEADER_SIZE as u64 {
        return Err(GraphBoltError::corrupt(format!(
            "{} holds {file_len} bytes, shorter than the archive header",
            path.display()
        )));
    }
    // Safety: the map is read-only and dropped before returning.
    let mem_map = unsafe { Mmap::map(&file)? };
    let graph = read_csc_sampling_graph(&mem_map)?;

    info!(
        path = %path.display(),
        num_nodes = graph.num_nodes(),
        num_edges = graph.num_edges(),
        heterogeneous = graph.is_heterogeneous(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "loaded CSC sampling graph"
    );
    Ok(graph)
}

/// Decodes an archive held in memory.
pub fn read_csc_sampling_graph(bytes: &[u8]) -> Result<CSCSamplingGraph> {
    let mut reader = ArchiveReader { bytes, pos: 0 };

    if reader.take(ARCHIVE_MAGIC.len(), "magic")? != ARCHIVE_MAGIC {
        return Err(GraphBoltError::corrupt("not a graph archive (bad magic)"));
    }
    let version = reader.read_u32("version")?;
    if version != ARCHIVE_VERSION {
        return Err(GraphBoltError::corrupt(format!(
            "unsupported archive version {version}, expected {ARCHIVE_VERSION}"
        )));
    }
    let section_count = reader.read_u32("section count")?;

    let mut payloads: [Option<&[u8]>; 5] = [None; 5];
    for _ in 0..section_count {
        let raw_tag = reader.read_u8("section tag")?;
        let tag = SectionTag::from_u8(raw_tag)
            .ok_or_else(|| GraphBoltError::corrupt(format!("unknown section tag {raw_tag}")))?;
        let width = reader.read_u8("section width")? as usize;
        if width != tag.width() {
            return Err(GraphBoltError::corrupt(format!(
                "{tag:?} section declares {width}-byte elements, expected {}",
                tag.width()
            )));
        }
        let count = reader.read_u64("section length")?;
        let byte_len = usize::try_from(count)
            .ok()
            .and_then(|count| count.checked_mul(width))
            .ok_or_else(|| GraphBoltError::corrupt(format!("{tag:?} section length overflows")))?;
        let payload = reader.take(byte_len, "section payload")?;
        if payloads[tag.slot()].replace(payload).is_some() {
            return Err(GraphBoltError::corrupt(format!("{tag:?} section appears twice")));
        }
        debug!(?tag, count, "decoded archive section");
    }
    if reader.pos != bytes.len() {
        return Err(GraphBoltError::corrupt(format!(
            "{} trailing bytes after the last section",
            bytes.len() - reader.pos
        )));
    }

    let [indptr, indices, node_type_offset, type_per_edge, metadata] = payloads;
    let indptr: Vec<u64> = decode_array(indptr, SectionTag::Indptr)?;
    let indices: Vec<u64> = decode_array(indices, SectionTag::Indices)?;

    let (node_type_offset, type_per_edge, metadata) = match (node_type_offset, type_per_edge, metadata) {
        (None, None, None) => (None, None, None),
        (Some(offsets), Some(types), Some(metadata)) => (
            Some(decode_array::<u64>(Some(offsets), SectionTag::NodeTypeOffset)?),
            Some(decode_array::<u32>(Some(types), SectionTag::TypePerEdge)?),
            Some(decode_metadata(metadata)?),
        ),
        _ => {
            return Err(GraphBoltError::corrupt(
                "node_type_offset, type_per_edge and metadata sections must appear together",
            ))
        }
    };

    CSCSamplingGraph::from_csc_with(
        indptr,
        indices,
        node_type_offset,
        type_per_edge,
        metadata,
        ValidationLevel::Strict,
    )
    .map_err(|e| match e {
        GraphBoltError::Validation(reason) => GraphBoltError::CorruptArchive(reason),
        other => other,
    })
}

fn decode_array<T: ByteEncodable>(payload: Option<&[u8]>, tag: SectionTag) -> Result<Vec<T>> {
    let payload = payload.ok_or_else(|| GraphBoltError::corrupt(format!("missing {tag:?} section")))?;
    Vec::<T>::from_bytes_topology(payload)
        .ok_or_else(|| GraphBoltError::corrupt(format!("{tag:?} section is not a whole number of elements")))
}

fn decode_metadata(payload: &[u8]) -> Result<GraphMetadata> {
    let record: MetadataRecord = bincode::deserialize(payload)
        .map_err(|e| GraphBoltError::corrupt(format!("metadata section: {e}")))?;
    GraphMetadata::try_from(record).map_err(|e| GraphBoltError::corrupt(format!("metadata section: {e}")))
}

/// Cursor over the archive bytes; running past the end is a corruption.
struct ArchiveReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ArchiveReader<'a> {
    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| GraphBoltError::corrupt(format!("archive truncated while reading {what}")))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        let bytes = self.take(u32::byte_size(), what)?;
        u32::from_bytes(bytes).ok_or_else(|| GraphBoltError::corrupt(format!("bad {what}")))
    }

    fn read_u64(&mut self, what: &str) -> Result<u64> {
        let bytes = self.take(u64::byte_size(), what)?;
        u64::from_bytes(bytes).ok_or_else(|| GraphBoltError::corrupt(format!("bad {what}")))
    }
}

#[cfg(test)]
mod test_archive {
    use super::*;
    use crate::util::{random_hetero_graph, random_homo_graph};
    use tempfile::tempdir;

    fn hetero_graph(num_nodes: usize, num_edges: usize, num_ntypes: usize, num_etypes: usize) -> CSCSamplingGraph {
        let parts = random_hetero_graph(num_nodes, num_edges, num_ntypes, num_etypes).unwrap();
        CSCSamplingGraph::from_csc(
            parts.indptr,
            parts.indices,
            Some(parts.node_type_offset),
            Some(parts.type_per_edge),
            Some(parts.metadata),
        )
        .unwrap()
    }

    fn encode(sections: &[SectionBuf]) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_sections(&mut bytes, sections).unwrap();
        bytes
    }

    fn assert_corrupt(bytes: &[u8]) {
        let result = read_csc_sampling_graph(bytes);
        assert!(
            matches!(result, Err(GraphBoltError::CorruptArchive(_))),
            "expected corrupt archive, got {result:?}"
        );
    }

    #[test]
    fn test_load_save_homo_graph() {
        let dir = tempdir().unwrap();
        for (num_nodes, num_edges) in [(1, 1), (100, 1), (10, 50), (1000, 50000)] {
            let (indptr, indices) = random_homo_graph(num_nodes, num_edges).unwrap();
            let graph = CSCSamplingGraph::from_homo(indptr, indices).unwrap();

            let filename = dir.path().join("csc_sampling_graph.tar");
            save_csc_sampling_graph(&graph, &filename).unwrap();
            let graph2 = load_csc_sampling_graph(&filename).unwrap();

            assert_eq!(graph.num_nodes(), graph2.num_nodes());
            assert_eq!(graph.num_edges(), graph2.num_edges());
            assert_eq!(graph.csc_indptr(), graph2.csc_indptr());
            assert_eq!(graph.indices(), graph2.indices());
            assert!(graph2.metadata().is_none());
            assert!(graph2.node_type_offset().is_none());
            assert!(graph2.type_per_edge().is_none());
        }
    }

    #[test]
    fn test_load_save_hetero_graph() {
        let dir = tempdir().unwrap();
        for (num_nodes, num_edges) in [(1, 1), (100, 1), (10, 50), (1000, 50000)] {
            for (num_ntypes, num_etypes) in [(1, 1), (3, 5), (100, 1)] {
                let graph = hetero_graph(num_nodes, num_edges, num_ntypes, num_etypes);

                let filename = dir.path().join("csc_sampling_graph.tar");
                save_csc_sampling_graph(&graph, &filename).unwrap();
                let graph2 = load_csc_sampling_graph(&filename).unwrap();

                assert_eq!(graph.csc_indptr(), graph2.csc_indptr());
                assert_eq!(graph.indices(), graph2.indices());
                assert_eq!(graph.node_type_offset(), graph2.node_type_offset());
                assert_eq!(graph.type_per_edge(), graph2.type_per_edge());
                let (m1, m2) = (graph.metadata().unwrap(), graph2.metadata().unwrap());
                assert_eq!(m1.node_type_to_id(), m2.node_type_to_id());
                assert_eq!(m1.edge_type_to_id(), m2.edge_type_to_id());
                assert_eq!(graph, graph2);
            }
        }
    }

    #[test]
    fn test_load_save_empty_graphs() {
        let dir = tempdir().unwrap();
        let filename = dir.path().join("empty.tar");

        let graph = CSCSamplingGraph::from_homo(vec![0], vec![]).unwrap();
        save_csc_sampling_graph(&graph, &filename).unwrap();
        assert_eq!(load_csc_sampling_graph(&filename).unwrap(), graph);

        let graph = hetero_graph(0, 0, 3, 5);
        save_csc_sampling_graph(&graph, &filename).unwrap();
        let graph2 = load_csc_sampling_graph(&filename).unwrap();
        assert_eq!(graph2.num_nodes(), 0);
        assert_eq!(graph2, graph);
    }

    #[test]
    fn test_in_memory_round_trip() {
        let graph = hetero_graph(10, 50, 3, 5);
        let mut bytes = Vec::new();
        write_csc_sampling_graph(&graph, &mut bytes).unwrap();
        assert_eq!(&bytes[..8], b"GBCSCSG\0");
        assert_eq!(read_csc_sampling_graph(&bytes).unwrap(), graph);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = load_csc_sampling_graph(dir.path().join("absent.tar"));
        assert!(matches!(result, Err(GraphBoltError::Io(_))));
    }

    #[test]
    fn test_short_file_is_corrupt() {
        let dir = tempdir().unwrap();
        let filename = dir.path().join("short.tar");
        fs::write(&filename, b"GBC").unwrap();
        assert!(matches!(
            load_csc_sampling_graph(&filename),
            Err(GraphBoltError::CorruptArchive(_))
        ));
    }

    #[test]
    fn test_bad_header() {
        let graph = CSCSamplingGraph::from_homo(vec![0, 1], vec![0]).unwrap();
        let bytes = encode(&graph_sections(&graph).unwrap());

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert_corrupt(&bad_magic);

        let mut bad_version = bytes.clone();
        bad_version[8] = 9;
        assert_corrupt(&bad_version);
    }

    #[test]
    fn test_truncated_and_trailing_bytes() {
        let graph = hetero_graph(10, 50, 3, 5);
        let bytes = encode(&graph_sections(&graph).unwrap());
        assert_corrupt(&bytes[..bytes.len() - 1]);
        assert_corrupt(&bytes[..HEADER_SIZE + 3]);

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert_corrupt(&trailing);
    }

    #[test]
    fn test_missing_required_section() {
        let graph = CSCSamplingGraph::from_homo(vec![0, 1, 2], vec![1, 0]).unwrap();
        let mut sections = graph_sections(&graph).unwrap();
        sections.retain(|section| section.tag != SectionTag::Indices);
        assert_corrupt(&encode(&sections));
    }

    #[test]
    fn test_partial_hetero_sections() {
        let graph = hetero_graph(10, 50, 3, 5);
        for dropped in [SectionTag::NodeTypeOffset, SectionTag::TypePerEdge, SectionTag::Metadata] {
            let mut sections = graph_sections(&graph).unwrap();
            sections.retain(|section| section.tag != dropped);
            assert_corrupt(&encode(&sections));
        }
    }

    #[test]
    fn test_duplicate_and_unknown_sections() {
        let graph = CSCSamplingGraph::from_homo(vec![0, 1], vec![0]).unwrap();
        let mut sections = graph_sections(&graph).unwrap();
        sections.push(SectionBuf::array(SectionTag::Indices, &vec![0u64]));
        assert_corrupt(&encode(&sections));

        let mut bytes = encode(&graph_sections(&graph).unwrap());
        // Tag byte of the first section
        bytes[HEADER_SIZE] = 42;
        assert_corrupt(&bytes);
    }

    #[test]
    fn test_inconsistent_lengths() {
        // indptr claims two edges, indices holds one
        let sections = vec![
            SectionBuf::array(SectionTag::Indptr, &vec![0u64, 2]),
            SectionBuf::array(SectionTag::Indices, &vec![0u64]),
        ];
        assert_corrupt(&encode(&sections));

        // type_per_edge shorter than indices
        let graph = hetero_graph(10, 50, 3, 5);
        let mut sections = graph_sections(&graph).unwrap();
        for section in sections.iter_mut() {
            if section.tag == SectionTag::TypePerEdge {
                *section = SectionBuf::array(SectionTag::TypePerEdge, &vec![0u32; 49]);
            }
        }
        assert_corrupt(&encode(&sections));
    }

    #[test]
    fn test_garbage_metadata() {
        let graph = hetero_graph(10, 50, 3, 5);
        let mut sections = graph_sections(&graph).unwrap();
        for section in sections.iter_mut() {
            if section.tag == SectionTag::Metadata {
                section.payload = vec![0xff; 3];
                section.count = 3;
            }
        }
        assert_corrupt(&encode(&sections));
    }
}
