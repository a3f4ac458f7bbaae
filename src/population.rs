use std::collections::BTreeSet;

use log::debug;
use rand::rngs::StdRng;

use crate::cell_type::{CellSpec, CellType};
use crate::error::{Error, Result};
use crate::parameters::{self, ParameterSpec};
use crate::types::{HashMap, PopulationId};

#[derive(Debug, Clone)]
pub struct Population {
    label: String,
    size: usize,
    cell_type: CellType,
    parameters: HashMap<String, Vec<f64>>,
    initial_values: HashMap<String, Vec<f64>>,
    recorded: BTreeSet<String>,
}

impl Population {
    /// Creates `size` cells of `cell.cell_type`, resolving every declared
    /// parameter and initial value to a per-cell array.
    pub fn new(
        size: usize,
        cell: CellSpec,
        label: impl Into<String>,
        mut rng: Option<&mut StdRng>,
    ) -> Result<Self> {
        let label = label.into();

        if size == 0 {
            return Err(Error::EmptyPopulation(label));
        }

        let CellSpec {
            cell_type,
            parameters: overrides,
        } = cell;

        for (name, _) in &overrides {
            if cell_type.default_value(name).is_none() {
                return Err(Error::InvalidParameterSpec(format!(
                    "{} has no parameter {}",
                    cell_type.name, name
                )));
            }
        }

        let mut resolved = HashMap::default();
        for (name, default) in &cell_type.parameters {
            let spec = overrides
                .iter()
                .rev()
                .find(|(candidate, _)| candidate == name)
                .map(|(_, spec)| spec.clone())
                .unwrap_or(ParameterSpec::Constant(*default));

            let values = parameters::resolve(&spec, size, rng.as_deref_mut())?;
            resolved.insert(name.clone(), values);
        }

        let initial_values = cell_type
            .initial_values
            .iter()
            .map(|(name, default)| (name.clone(), vec![*default; size]))
            .collect();

        debug!(
            "created population {} with {} cells of type {}",
            label, size, cell_type.name
        );

        Ok(Self {
            label,
            size,
            cell_type,
            parameters: resolved,
            initial_values,
            recorded: BTreeSet::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell_type(&self) -> &CellType {
        &self.cell_type
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.parameters.get(name).map(Vec::as_slice)
    }

    pub fn get_initial_value(&self, variable: &str) -> Option<&[f64]> {
        self.initial_values.get(variable).map(Vec::as_slice)
    }

    /// Replaces the values of a declared parameter. The array length stays
    /// equal to the population size.
    pub fn set(&mut self, name: &str, spec: &ParameterSpec, rng: Option<&mut StdRng>) -> Result<()> {
        let values = self.resolve_parameter(name, spec, rng)?;
        self.store_parameter(name, values);
        Ok(())
    }

    /// Resolves `spec` for the declared parameter `name` without storing it.
    pub fn resolve_parameter(
        &self,
        name: &str,
        spec: &ParameterSpec,
        rng: Option<&mut StdRng>,
    ) -> Result<Vec<f64>> {
        if !self.parameters.contains_key(name) {
            return Err(Error::InvalidParameterSpec(format!(
                "{} has no parameter {}",
                self.cell_type.name, name
            )));
        }

        parameters::resolve(spec, self.size, rng)
    }

    pub(crate) fn store_parameter(&mut self, name: &str, values: Vec<f64>) {
        self.parameters.insert(name.to_owned(), values);
    }

    pub fn initialize(
        &mut self,
        variable: &str,
        spec: &ParameterSpec,
        rng: Option<&mut StdRng>,
    ) -> Result<()> {
        let values = self.resolve_initial_value(variable, spec, rng)?;
        self.store_initial_value(variable, values);
        Ok(())
    }

    pub fn resolve_initial_value(
        &self,
        variable: &str,
        spec: &ParameterSpec,
        rng: Option<&mut StdRng>,
    ) -> Result<Vec<f64>> {
        if !self.initial_values.contains_key(variable) {
            return Err(Error::InvalidParameterSpec(format!(
                "{} has no state variable {}",
                self.cell_type.name, variable
            )));
        }

        parameters::resolve(spec, self.size, rng)
    }

    pub(crate) fn store_initial_value(&mut self, variable: &str, values: Vec<f64>) {
        self.initial_values.insert(variable.to_owned(), values);
    }

    pub fn check_recordable(&self, variables: &[String]) -> Result<()> {
        match variables.iter().find(|v| !self.cell_type.can_record(v)) {
            Some(variable) => Err(Error::TypeMismatch(format!(
                "{} cannot record {}",
                self.cell_type.name, variable
            ))),
            None => Ok(()),
        }
    }

    pub fn record(&mut self, variables: &[String]) -> Result<()> {
        self.check_recordable(variables)?;
        self.recorded.extend(variables.iter().cloned());
        Ok(())
    }

    pub fn recorded(&self) -> impl Iterator<Item = &str> {
        self.recorded.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationView {
    pub population: PopulationId,
    pub indices: Vec<usize>,
}

impl PopulationView {
    pub fn all(population: PopulationId, size: usize) -> Self {
        Self {
            population,
            indices: (0..size).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }
}

/// A single cell, addressed by its population and its index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId {
    pub population: PopulationId,
    pub index: usize,
}

impl CellId {
    pub fn to_view(&self) -> PopulationView {
        PopulationView {
            population: self.population,
            indices: vec![self.index],
        }
    }
}
