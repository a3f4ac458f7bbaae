//! On-disk layout of an exported circuit.
//!
//! ```text
//! <destination>/
//!     circuit_config.json
//!     nodes/<k>_<population>.json
//!     edges/<k>_<source>__<target>__<receptor>.json
//! ```
//!
//! The manifest lists every distinct cell type once, one node group per
//! population and one edge group per (source, target, receptor type) triple.
//! Tables are stored column by column.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MANIFEST_FILE: &str = "circuit_config.json";
pub const NODES_DIR: &str = "nodes";
pub const EDGES_DIR: &str = "edges";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitConfig {
    pub format_version: u32,
    pub cell_types: Vec<CellTypeEntry>,
    pub node_groups: Vec<NodeGroupEntry>,
    pub edge_groups: Vec<EdgeGroupEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTypeEntry {
    pub name: String,
    pub parameters: Vec<(String, f64)>,
    pub initial_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroupEntry {
    pub population: String,
    pub cell_type: String,
    pub size: usize,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeGroupEntry {
    pub name: String,
    pub source: String,
    pub target: String,
    pub receptor_type: String,
    pub synapse_model: String,
    pub synapse_parameters: BTreeMap<String, f64>,
    pub num_edges: usize,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTable {
    pub population: String,
    pub cell_type: String,
    pub size: usize,
    pub parameters: Vec<Column>,
    pub initial_values: Vec<Column>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeTable {
    pub source_index: Vec<usize>,
    pub target_index: Vec<usize>,
    pub weight: Vec<f64>,
    pub delay: Vec<f64>,
}

impl EdgeTable {
    pub fn len(&self) -> usize {
        self.source_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source_index.is_empty()
    }

    pub fn has_consistent_columns(&self) -> bool {
        let len = self.len();
        self.target_index.len() == len && self.weight.len() == len && self.delay.len() == len
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    if pretty {
        serde_json::to_writer_pretty(&mut writer, value).map_err(std::io::Error::from)?;
    } else {
        serde_json::to_writer(&mut writer, value).map_err(std::io::Error::from)?;
    }

    writer.flush()?;
    Ok(())
}

/// Reads a JSON document. Anything unreadable counts as corrupt data.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .map_err(|err| Error::CorruptData(format!("{}: {}", path.display(), err)))?;

    serde_json::from_reader(BufReader::new(file))
        .map_err(|err| Error::CorruptData(format!("{}: {}", path.display(), err)))
}
