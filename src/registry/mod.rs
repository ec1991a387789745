use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::meter::ElectricityMeter;
use crate::models::MeterId;
use crate::MeterError;

/// Maps meter identities to loaded meters so topology references such as
/// `submeter_of` can be resolved without meters pointing at each other.
///
/// Registering under an identity that is already present replaces the old
/// entry (last load wins).
#[derive(Debug, Default)]
pub struct MeterRegistry {
    meters: HashMap<MeterId, Arc<ElectricityMeter>>,
}

impl MeterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, meter: ElectricityMeter) -> Arc<ElectricityMeter> {
        let id = meter.identifier();
        let meter = Arc::new(meter);
        if !id.is_complete() {
            warn!("Registering meter with incomplete identity {id}");
        }
        match self.meters.insert(id.clone(), Arc::clone(&meter)) {
            Some(_) => debug!("Replaced meter registered under {id}"),
            None => debug!("Registered meter {id}"),
        }
        meter
    }

    pub fn deregister(&mut self, id: &MeterId) -> Option<Arc<ElectricityMeter>> {
        self.meters.remove(id)
    }

    pub fn resolve(&self, id: &MeterId) -> Result<Arc<ElectricityMeter>, MeterError> {
        self.meters
            .get(id)
            .cloned()
            .ok_or_else(|| MeterError::UnknownMeter(id.clone()))
    }

    pub fn contains(&self, id: &MeterId) -> bool {
        self.meters.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.meters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meters.is_empty()
    }

    pub fn clear(&mut self) {
        debug!("Clearing {} registered meters", self.meters.len());
        self.meters.clear();
    }

    /// All meters ordered by dataset, building and instance.
    pub fn meters(&self) -> Vec<Arc<ElectricityMeter>> {
        let mut meters: Vec<Arc<ElectricityMeter>> = self.meters.values().cloned().collect();
        meters.sort_by_key(|m| {
            let id = m.identifier();
            (id.dataset, id.building, id.instance)
        });
        meters
    }

    /// Meters whose upstream meter is `id`.
    pub fn submeters_of(&self, id: &MeterId) -> Vec<Arc<ElectricityMeter>> {
        self.meters()
            .into_iter()
            .filter(|m| m.upstream_identifier().map_or(false, |up| &up == id))
            .collect()
    }

    /// Top level meters of a building: flagged as site meter or without upstream.
    pub fn site_meters(&self, dataset: &str, building: u32) -> Vec<Arc<ElectricityMeter>> {
        self.meters()
            .into_iter()
            .filter(|m| {
                let md = m.metadata();
                md.dataset.as_deref() == Some(dataset) && md.building == Some(building)
                    && (m.is_site_meter() || md.submeter_of.is_none())
            })
            .collect()
    }
}
