use itertools::izip;
use log::warn;
use rand::distributions::Bernoulli;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parameters;
use crate::population::PopulationView;
use crate::random;
use crate::synapse::Synapse;
use crate::types::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source_index: usize,
    pub target_index: usize,
    pub weight: f64,
    pub delay: f64,
}

/// A rule that generates the edge list of a projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Connector {
    FixedProbability {
        p_connect: f64,
        allow_self_connections: bool,
    },
    AllToAll {
        allow_self_connections: bool,
    },
    OneToOne,
    FromList(Vec<Connection>),
}

impl Connector {
    pub fn fixed_probability(p_connect: f64) -> Result<Self> {
        validate_probability(p_connect)?;
        Ok(Connector::FixedProbability {
            p_connect,
            allow_self_connections: false,
        })
    }

    /// Materializes the edges between `source` and `target`.
    ///
    /// Rule-based connectors resolve the synapse weight and delay over the
    /// accepted edges, in edge order. Explicit lists are kept verbatim,
    /// restricted to the cells of both views.
    pub fn connect(
        &self,
        source: &PopulationView,
        target: &PopulationView,
        synapse: &Synapse,
        rng: Option<&mut StdRng>,
    ) -> Result<Vec<Connection>> {
        let connections = random::with_rng(rng, |rng| -> Result<Vec<Connection>> {
            if let Connector::FromList(connections) = self {
                let sources: HashSet<usize> = source.indices.iter().copied().collect();
                let targets: HashSet<usize> = target.indices.iter().copied().collect();
                return Ok(connections
                    .iter()
                    .filter(|c| sources.contains(&c.source_index) && targets.contains(&c.target_index))
                    .copied()
                    .collect());
            }

            let pairs = self.pairs(source, target, rng)?;
            let weights = parameters::resolve(&synapse.weight, pairs.len(), Some(&mut *rng))?;
            let delays = parameters::resolve(&synapse.delay, pairs.len(), Some(&mut *rng))?;

            Ok(izip!(pairs, weights, delays)
                .map(|((source_index, target_index), weight, delay)| Connection {
                    source_index,
                    target_index,
                    weight,
                    delay,
                })
                .collect())
        })?;

        if let Some(connection) = connections.iter().find(|c| c.delay < 0.0) {
            return Err(Error::InvalidParameterSpec(format!(
                "negative delay {} from {} to {}",
                connection.delay, connection.source_index, connection.target_index
            )));
        }

        if connections.is_empty() {
            warn!("{} connector produced no connections", self.kind());
        }

        Ok(connections)
    }

    fn pairs(
        &self,
        source: &PopulationView,
        target: &PopulationView,
        rng: &mut StdRng,
    ) -> Result<Vec<(usize, usize)>> {
        let same_population = source.population == target.population;
        let mut pairs = Vec::new();

        match *self {
            Connector::FixedProbability {
                p_connect,
                allow_self_connections,
            } => {
                validate_probability(p_connect)?;
                let trial =
                    Bernoulli::new(p_connect).map_err(|_| Error::InvalidProbability(p_connect))?;

                for &i in &source.indices {
                    for &j in &target.indices {
                        let is_self_connection = same_population && i == j;
                        if (allow_self_connections || !is_self_connection) && trial.sample(rng) {
                            pairs.push((i, j));
                        }
                    }
                }
            }
            Connector::AllToAll {
                allow_self_connections,
            } => {
                for &i in &source.indices {
                    for &j in &target.indices {
                        if allow_self_connections || !(same_population && i == j) {
                            pairs.push((i, j));
                        }
                    }
                }
            }
            Connector::OneToOne => {
                if source.len() != target.len() {
                    return Err(Error::SizeMismatch {
                        expected: source.len(),
                        actual: target.len(),
                    });
                }
                pairs.extend(source.indices.iter().copied().zip(target.indices.iter().copied()));
            }
            Connector::FromList(_) => {}
        }

        Ok(pairs)
    }

    fn kind(&self) -> &'static str {
        match self {
            Connector::FixedProbability { .. } => "FixedProbability",
            Connector::AllToAll { .. } => "AllToAll",
            Connector::OneToOne => "OneToOne",
            Connector::FromList(_) => "FromList",
        }
    }
}

fn validate_probability(p_connect: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p_connect) {
        Ok(())
    } else {
        Err(Error::InvalidProbability(p_connect))
    }
}
