//! Contract with the external pipeline engine.
//!
//! The engine itself (clipping, energy integration, good section detection)
//! lives outside this crate. A meter only picks the node sequence, hands it to
//! a [`PipelineExecutor`] and reads back named results.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::meter::ElectricityMeter;
use crate::models::measurement::AcType;
use crate::models::TimeFrame;
use crate::store::DataStore;

pub const ENERGY_RESULT: &str = "energy";
pub const GOOD_SECTIONS_RESULT: &str = "good_sections";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Clip,
    Energy,
    LocateGoodSections,
}

impl Node {
    pub fn name(&self) -> &'static str {
        match self {
            Node::Clip => "ClipNode",
            Node::Energy => "EnergyNode",
            Node::LocateGoodSections => "LocateGoodSectionsNode",
        }
    }

    /// Name of the entry this node contributes to the results, if any.
    pub fn result_key(&self) -> Option<&'static str> {
        match self {
            Node::Clip => None,
            Node::Energy => Some(ENERGY_RESULT),
            Node::LocateGoodSections => Some(GOOD_SECTIONS_RESULT),
        }
    }
}

/// Restrictions applied by the engine while loading a meter's data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    /// Only data inside these frames is processed. `None` processes
    /// everything, an empty list processes nothing.
    pub timeframes: Option<Vec<TimeFrame>>,
    pub chunksize: Option<usize>,
}

impl LoadOptions {
    pub fn with_timeframes(timeframes: Vec<TimeFrame>) -> Self {
        LoadOptions { timeframes: Some(timeframes), ..Default::default() }
    }
}

/// Energy per AC type in kWh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyResults {
    pub active: Option<f64>,
    pub apparent: Option<f64>,
    pub reactive: Option<f64>,
}

impl EnergyResults {
    pub fn get(&self, ac_type: AcType) -> Option<f64> {
        match ac_type {
            AcType::Active => self.active,
            AcType::Apparent => self.apparent,
            AcType::Reactive => self.reactive,
        }
    }

    pub fn set(&mut self, ac_type: AcType, kwh: f64) {
        match ac_type {
            AcType::Active => self.active = Some(kwh),
            AcType::Apparent => self.apparent = Some(kwh),
            AcType::Reactive => self.reactive = Some(kwh),
        }
    }

    /// First AC type, in preference order, both results carry a value for.
    pub fn common_ac_type(&self, other: &EnergyResults) -> Option<AcType> {
        AcType::PREFERENCE
            .into_iter()
            .find(|ac| self.get(*ac).is_some() && other.get(*ac).is_some())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Energy(EnergyResults),
    GoodSections(Vec<TimeFrame>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineResults {
    results: HashMap<String, ResultValue>,
}

impl PipelineResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: ResultValue) {
        self.results.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ResultValue> {
        self.results.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ResultValue> {
        self.results.remove(name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Node {node} failed: {message}")]
    NodeFailed { node: &'static str, message: String },
}

/// The engine executing a node sequence against one meter.
///
/// Implementations must be deterministic for a fixed meter state and node
/// sequence.
pub trait PipelineExecutor {
    fn execute(
        &self,
        nodes: &[Node],
        meter: &ElectricityMeter,
        store: &dyn DataStore,
        options: &LoadOptions,
    ) -> Result<PipelineResults, PipelineError>;
}

pub struct Pipeline {
    nodes: Vec<Node>,
    results: PipelineResults,
}

impl Pipeline {
    pub fn new(nodes: Vec<Node>) -> Self {
        Pipeline { nodes, results: PipelineResults::new() }
    }

    pub fn run(
        &mut self,
        executor: &dyn PipelineExecutor,
        meter: &ElectricityMeter,
        store: &dyn DataStore,
        options: &LoadOptions,
    ) -> Result<(), PipelineError> {
        let names: Vec<&str> = self.nodes.iter().map(|n| n.name()).collect();
        debug!("Running pipeline [{}] for meter {}", names.join(", "), meter.identifier());
        self.results = executor.execute(&self.nodes, meter, store, options)?;
        Ok(())
    }

    pub fn into_results(self) -> PipelineResults {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_result_keys() {
        assert_eq!(Node::Energy.result_key(), Some("energy"));
        assert_eq!(Node::LocateGoodSections.result_key(), Some("good_sections"));
        assert_eq!(Node::Clip.result_key(), None);
        assert_eq!(Node::LocateGoodSections.name(), "LocateGoodSectionsNode");
    }

    #[test]
    fn test_common_ac_type_prefers_active() {
        let mut a = EnergyResults::default();
        a.set(AcType::Apparent, 2.0);
        a.set(AcType::Active, 1.0);
        let mut b = EnergyResults::default();
        b.set(AcType::Apparent, 4.0);
        assert_eq!(a.common_ac_type(&b), Some(AcType::Apparent));

        b.set(AcType::Active, 3.0);
        assert_eq!(a.common_ac_type(&b), Some(AcType::Active));
        assert_eq!(a.common_ac_type(&EnergyResults::default()), None);
    }

    #[test]
    fn test_results_map() {
        let mut results = PipelineResults::new();
        assert!(results.is_empty());
        results.insert(GOOD_SECTIONS_RESULT, ResultValue::GoodSections(Vec::new()));
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("good_sections"), Some(&ResultValue::GoodSections(Vec::new())));
        assert!(results.remove("energy").is_none());
    }

    #[test]
    fn test_no_restriction_differs_from_empty_restriction() {
        assert_eq!(LoadOptions::default().timeframes, None);
        assert_eq!(LoadOptions::with_timeframes(Vec::new()).timeframes, Some(Vec::new()));
        assert_ne!(LoadOptions::default(), LoadOptions::with_timeframes(Vec::new()));
    }
}
