use std::collections::BTreeSet;

use crate::core::{ClimateId, DegreeCelsius};

use super::{ClimateAction, MAX_TARGET, MIN_TARGET};

/// Central plant switching: the plant runs while at least one TRV calls for heat.
pub struct HeatingDemand {
    heating_id: ClimateId,
    calling: BTreeSet<ClimateId>,
    last_edge: Option<bool>,
}

impl HeatingDemand {
    pub fn new(heating_id: ClimateId) -> Self {
        Self {
            heating_id,
            calling: BTreeSet::new(),
            last_edge: None,
        }
    }

    /// A TRV calls for heat while its control target is above what it measures.
    pub fn update(
        &mut self,
        trv: &ClimateId,
        control_target: DegreeCelsius,
        trv_temperature: DegreeCelsius,
    ) -> Option<ClimateAction> {
        if control_target > trv_temperature {
            self.calling.insert(trv.clone());
        } else {
            self.calling.remove(trv);
        }

        self.evaluate()
    }

    /// Command for the plant if the on/off decision changed since the last emitted one.
    pub fn evaluate(&mut self) -> Option<ClimateAction> {
        let should_heat = !self.calling.is_empty();

        if self.last_edge == Some(should_heat) {
            return None;
        }

        self.last_edge = Some(should_heat);
        tracing::info!(
            "Heating plant {} should {} ({} TRVs calling for heat)",
            self.heating_id,
            if should_heat { "heat" } else { "stand down" },
            self.calling.len()
        );

        let target = if should_heat { MAX_TARGET } else { MIN_TARGET };
        Some(ClimateAction::heat(self.heating_id.clone(), target))
    }

    /// Drops the last decision so that the next evaluation emits it again.
    pub fn forget_edge(&mut self) {
        self.last_edge = None;
    }

    pub fn should_heat(&self) -> bool {
        !self.calling.is_empty()
    }

    pub fn heating_id(&self) -> &ClimateId {
        &self.heating_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demand() -> HeatingDemand {
        HeatingDemand::new(ClimateId::from("boiler"))
    }

    fn trv(id: &str) -> ClimateId {
        ClimateId::from(id)
    }

    fn heat(target: f64) -> Option<ClimateAction> {
        Some(ClimateAction::heat(ClimateId::from("boiler"), DegreeCelsius(target)))
    }

    #[test]
    fn first_decision_is_always_emitted() {
        let mut demand = demand();

        assert_eq!(demand.update(&trv("a"), DegreeCelsius(18.0), DegreeCelsius(20.0)), heat(7.0));
    }

    #[test]
    fn emits_on_edges_only() {
        let mut demand = demand();

        assert_eq!(demand.update(&trv("a"), DegreeCelsius(21.0), DegreeCelsius(19.0)), heat(32.0));
        assert_eq!(demand.update(&trv("b"), DegreeCelsius(22.0), DegreeCelsius(19.0)), None);
        assert_eq!(demand.update(&trv("a"), DegreeCelsius(19.0), DegreeCelsius(19.0)), None);
        assert!(demand.should_heat());
        assert_eq!(demand.update(&trv("b"), DegreeCelsius(18.0), DegreeCelsius(19.0)), heat(7.0));
    }

    #[test]
    fn forgotten_edge_is_emitted_again() {
        let mut demand = demand();
        demand.update(&trv("a"), DegreeCelsius(21.0), DegreeCelsius(19.0));

        assert_eq!(demand.evaluate(), None);
        demand.forget_edge();
        assert_eq!(demand.evaluate(), heat(32.0));
    }
}
