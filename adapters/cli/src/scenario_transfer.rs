#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use godhand_core::{Behaviour, Faction, UnitKind};
use serde::{Deserialize, Serialize};

const SNAPSHOT_DOMAIN: &str = "godhand";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded scenario payload.
pub(crate) const SNAPSHOT_HEADER: &str = "godhand:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Snapshot of a match setup suitable for clipboard transfer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScenarioSnapshot {
    /// Number of tiles along each edge of the square terrain grid.
    pub grid_size: u32,
    /// Initial global water level in height steps.
    pub water_level: i32,
    /// Match seed from which every deterministic stream derives.
    pub seed: u64,
    /// Units placed before the first tick.
    pub spawns: Vec<ScenarioSpawn>,
}

impl ScenarioSnapshot {
    /// Encodes the snapshot into a single-line string suitable for clipboard transfer.
    #[must_use]
    pub(crate) fn encode(&self) -> String {
        let payload = SerializableScenario {
            water_level: self.water_level,
            seed: self.seed,
            spawns: self.spawns.clone(),
        };
        let json = serde_json::to_vec(&payload).expect("scenario serialization never fails");
        let encoded = STANDARD_NO_PAD.encode(json);
        format!(
            "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
            self.grid_size, self.grid_size
        )
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, ScenarioTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ScenarioTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(ScenarioTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(ScenarioTransferError::MissingVersion)?;
        let dimensions = parts
            .next()
            .ok_or(ScenarioTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(ScenarioTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(ScenarioTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(ScenarioTransferError::UnsupportedVersion(
                version.to_owned(),
            ));
        }

        let grid_size = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(ScenarioTransferError::InvalidEncoding)?;
        let decoded: SerializableScenario =
            serde_json::from_slice(&bytes).map_err(ScenarioTransferError::InvalidPayload)?;

        Ok(Self {
            grid_size,
            water_level: decoded.water_level,
            seed: decoded.seed,
            spawns: decoded.spawns,
        })
    }
}

/// Unit placement captured within a scenario snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScenarioSpawn {
    /// Faction the unit fights for.
    pub faction: Faction,
    /// Kind of unit to place.
    pub kind: UnitKind,
    /// Behaviour the unit adopts after spawning.
    pub behaviour: Behaviour,
    /// Preferred vertex column.
    pub x: i32,
    /// Preferred vertex row.
    pub z: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableScenario {
    water_level: i32,
    seed: u64,
    spawns: Vec<ScenarioSpawn>,
}

/// Errors that can occur while decoding scenario transfer strings.
#[derive(Debug)]
pub(crate) enum ScenarioTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded snapshot.
    MissingPrefix,
    /// The encoded snapshot did not contain a version segment.
    MissingVersion,
    /// The encoded snapshot did not include grid dimensions.
    MissingDimensions,
    /// The encoded snapshot did not include the payload segment.
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the encoded snapshot.
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for ScenarioTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "scenario payload was empty"),
            Self::MissingPrefix => write!(f, "scenario string is missing the prefix"),
            Self::MissingVersion => write!(f, "scenario string is missing the version"),
            Self::MissingDimensions => {
                write!(f, "scenario string is missing the grid dimensions")
            }
            Self::MissingPayload => write!(f, "scenario string is missing the payload"),
            Self::InvalidPrefix(prefix) => {
                write!(
                    f,
                    "scenario prefix '{prefix}' is not supported (expected '{SNAPSHOT_HEADER}')"
                )
            }
            Self::UnsupportedVersion(version) => {
                write!(f, "scenario version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode scenario payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse scenario payload: {error}")
            }
        }
    }
}

impl Error for ScenarioTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<u32, ScenarioTransferError> {
    let (columns, rows) = dimensions
        .split_once(['x', 'X'])
        .ok_or_else(|| ScenarioTransferError::InvalidDimensions(dimensions.to_owned()))?;

    let columns = columns
        .trim()
        .parse::<u32>()
        .map_err(|_| ScenarioTransferError::InvalidDimensions(dimensions.to_owned()))?;
    let rows = rows
        .trim()
        .parse::<u32>()
        .map_err(|_| ScenarioTransferError::InvalidDimensions(dimensions.to_owned()))?;

    if columns == 0 || columns != rows {
        return Err(ScenarioTransferError::InvalidDimensions(
            dimensions.to_owned(),
        ));
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_empty_scenario() {
        let snapshot = ScenarioSnapshot {
            grid_size: 32,
            water_level: 0,
            seed: 7,
            spawns: Vec::new(),
        };

        let encoded = snapshot.encode();
        assert!(encoded.starts_with(&format!("{SNAPSHOT_HEADER}:32x32:")));

        let decoded = ScenarioSnapshot::decode(&encoded).expect("snapshot decodes");
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn round_trip_populated_scenario() {
        let spawns = vec![
            ScenarioSpawn {
                faction: Faction::Red,
                kind: UnitKind::Brave,
                behaviour: Behaviour::Settle,
                x: 6,
                z: 6,
            },
            ScenarioSpawn {
                faction: Faction::Blue,
                kind: UnitKind::Warrior,
                behaviour: Behaviour::Battle,
                x: 26,
                z: 20,
            },
        ];
        let snapshot = ScenarioSnapshot {
            grid_size: 64,
            water_level: 1,
            seed: 2024,
            spawns,
        };

        let encoded = snapshot.encode();
        assert!(encoded.starts_with(&format!("{SNAPSHOT_HEADER}:64x64:")));

        let decoded = ScenarioSnapshot::decode(&encoded).expect("snapshot decodes");
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn foreign_prefixes_are_rejected() {
        assert!(matches!(
            ScenarioSnapshot::decode("terraform:v1:8x8:e30"),
            Err(ScenarioTransferError::InvalidPrefix(_))
        ));
        assert!(matches!(
            ScenarioSnapshot::decode("godhand:v2:8x8:e30"),
            Err(ScenarioTransferError::UnsupportedVersion(_))
        ));
        assert!(matches!(
            ScenarioSnapshot::decode("godhand:v1:8x9:e30"),
            Err(ScenarioTransferError::InvalidDimensions(_))
        ));
        assert!(matches!(
            ScenarioSnapshot::decode("   "),
            Err(ScenarioTransferError::EmptyPayload)
        ));
    }
}
