use serde::Deserialize;

use crate::core::{ClimateId, RoomName, SensorId};
use crate::schedule::WeekSchedule;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoomDefinition {
    pub name: RoomName,
    #[serde(default)]
    pub temperature_sensor_id: Option<SensorId>,
    #[serde(default)]
    pub climate_entity_ids: Vec<ClimateId>,
    #[serde(default)]
    pub schedule: Option<WeekSchedule>,
}

/// Static household configuration, loaded once and shared by the whole graph.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Home {
    pub rooms: Vec<RoomDefinition>,
    pub sleep_switch_id: String,
    pub heating_id: ClimateId,
}

impl Home {
    pub fn room(&self, name: &RoomName) -> Option<&RoomDefinition> {
        self.rooms.iter().find(|room| &room.name == name)
    }

    pub fn room_of_climate_entity(&self, id: &ClimateId) -> Option<&RoomDefinition> {
        self.rooms.iter().find(|room| room.climate_entity_ids.contains(id))
    }

    pub fn rooms_with_sensor<'a>(&'a self, sensor: &'a SensorId) -> impl Iterator<Item = &'a RoomDefinition> + 'a {
        self.rooms
            .iter()
            .filter(move |room| room.temperature_sensor_id.as_ref() == Some(sensor))
    }

    pub fn climate_entities(&self) -> impl Iterator<Item = (&RoomDefinition, &ClimateId)> {
        self.rooms
            .iter()
            .flat_map(|room| room.climate_entity_ids.iter().map(move |id| (room, id)))
    }

    /// Configuration errors that would make the graph ambiguous.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen_rooms = std::collections::HashSet::new();
        for room in &self.rooms {
            if !seen_rooms.insert(&room.name) {
                anyhow::bail!("Room {} is defined more than once", room.name);
            }
        }

        let mut seen_entities = std::collections::HashMap::new();
        for (room, id) in self.climate_entities() {
            if let Some(other) = seen_entities.insert(id, &room.name) {
                anyhow::bail!("Climate entity {} is assigned to both {} and {}", id, other, room.name);
            }
        }

        if seen_entities.contains_key(&self.heating_id) {
            anyhow::bail!("Heating plant {} is also configured as a room device", self.heating_id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn home() -> Home {
        serde_json::from_value(json!({
            "rooms": [
                {
                    "name": "Lounge",
                    "temperature_sensor_id": "sensor-lounge",
                    "climate_entity_ids": ["trv-lounge-1", "trv-lounge-2"]
                },
                {
                    "name": "Study",
                    "climate_entity_ids": ["trv-study"],
                    "schedule": { "monday": { "07:00": 19 } }
                }
            ],
            "sleep_switch_id": "hall-switch",
            "heating_id": "boiler"
        }))
        .unwrap()
    }

    #[test]
    fn lookups() {
        let home = home();

        assert_eq!(
            home.room_of_climate_entity(&ClimateId::from("trv-study")).map(|r| &r.name),
            Some(&RoomName::from("Study"))
        );
        assert!(home.room_of_climate_entity(&ClimateId::from("boiler")).is_none());

        let sensor = SensorId::from("sensor-lounge");
        let rooms: Vec<_> = home.rooms_with_sensor(&sensor).map(|r| r.name.as_str()).collect();
        assert_eq!(rooms, vec!["Lounge"]);

        assert_eq!(home.climate_entities().count(), 3);
        assert!(home.room(&RoomName::from("Study")).unwrap().schedule.is_some());
    }

    #[test]
    fn valid_home_passes_validation() {
        assert!(home().validate().is_ok());
    }

    #[test]
    fn shared_climate_entity_is_rejected() {
        let mut home = home();
        home.rooms[1].climate_entity_ids.push(ClimateId::from("trv-lounge-1"));

        assert!(home.validate().is_err());
    }

    #[test]
    fn duplicate_room_is_rejected() {
        let mut home = home();
        home.rooms.push(home.rooms[0].clone());

        assert!(home.validate().is_err());
    }
}
