use derive_more::{AsRef, Display, From};
use serde::{Deserialize, Serialize};

/// Identity of a climate entity: a TRV or the central heating plant.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Display, From, AsRef, Serialize, Deserialize)]
#[serde(transparent)]
#[as_ref(forward)]
pub struct ClimateId(String);

#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Display, From, AsRef, Serialize, Deserialize)]
#[serde(transparent)]
#[as_ref(forward)]
pub struct RoomName(String);

#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Display, From, AsRef, Serialize, Deserialize)]
#[serde(transparent)]
#[as_ref(forward)]
pub struct SensorId(String);

macro_rules! string_id {
    ($($id:ident),*) => {
        $(
            impl $id {
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl From<&str> for $id {
                fn from(value: &str) -> Self {
                    Self(value.to_owned())
                }
            }
        )*
    };
}

string_id!(ClimateId, RoomName, SensorId);
