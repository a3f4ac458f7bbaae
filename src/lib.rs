//! Description and serialization of spiking neural network models.
//!
//! A [`Network`] holds populations of cells, projections between them and
//! assemblies grouping populations. Networks can be built directly, through the
//! [`procedural`] functions, or from a YAML description ([`config`]), and are
//! written to and read from a directory-based exchange format ([`exchange`]).

pub mod assembly;
pub mod cell_type;
pub mod config;
pub mod connector;
pub mod error;
pub mod exchange;
pub mod network;
pub mod parameters;
pub mod population;
pub mod procedural;
pub mod projection;
pub mod random;
pub mod synapse;
pub mod types;

mod util;

pub use error::{Error, Result};
pub use network::Network;
pub use parameters::ParameterSpec;
pub use types::{AssemblyId, PopulationId, ProjectionId};
