use std::{fmt, str::FromStr};

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Kinds of units a skirmish map may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    Base,
    Worker,
    Light,
    Heavy,
    Ranged,
}

/// Static properties of a unit kind for a given catalog version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    pub hp: i32,
    pub damage: i32,
    /// Attack range, in cells (Euclidean)
    pub range: i32,
    /// Sight radius, in cells (Euclidean)
    pub sight: i32,
    /// Ticks needed to complete a move
    pub move_time: u64,
    /// Ticks needed to complete an attack
    pub attack_time: u64,
    pub mobile: bool,
}

impl UnitStats {
    pub fn can_attack(&self) -> bool {
        self.damage > 0
    }
}

/// Balance revision of the unit catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogVersion {
    V1,
    #[default]
    V2,
}

impl CatalogVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogVersion::V1 => "v1",
            CatalogVersion::V2 => "v2",
        }
    }
}

impl FromStr for CatalogVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(CatalogVersion::V1),
            "v2" | "2" => Ok(CatalogVersion::V2),
            other => bail!("unknown catalog version '{other}' (expected 'v1' or 'v2')"),
        }
    }
}

impl fmt::Display for CatalogVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How two moves reserving the same cell during the same tick are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Both moves are cancelled.
    #[default]
    CancelBoth,
    /// The move issued first is kept.
    FirstIssued,
    /// Player 0 wins conflicts on even ticks, player 1 on odd ticks.
    Alternate,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::CancelBoth => "cancel-both",
            ConflictPolicy::FirstIssued => "first-issued",
            ConflictPolicy::Alternate => "alternate",
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "cancel-both" => Ok(ConflictPolicy::CancelBoth),
            "first-issued" => Ok(ConflictPolicy::FirstIssued),
            "alternate" => Ok(ConflictPolicy::Alternate),
            other => bail!(
                "unknown conflict policy '{other}' (expected 'cancel-both', 'first-issued' or 'alternate')"
            ),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared description of unit types, referenced by the world and by controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnitTypeCatalog {
    version: CatalogVersion,
    conflict_policy: ConflictPolicy,
}

impl UnitTypeCatalog {
    pub fn new(version: CatalogVersion, conflict_policy: ConflictPolicy) -> Self {
        UnitTypeCatalog {
            version,
            conflict_policy,
        }
    }

    pub fn version(&self) -> CatalogVersion {
        self.version
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.conflict_policy
    }

    pub fn stats(&self, kind: UnitKind) -> UnitStats {
        use CatalogVersion::*;
        use UnitKind::*;

        let (hp, damage, range, sight, move_time, attack_time, mobile) =
            match (self.version, kind) {
                (_, Base) => (10, 0, 0, 5, 0, 0, false),
                (V1, Worker) => (1, 1, 1, 3, 1, 1, true),
                (V2, Worker) => (1, 1, 1, 3, 1, 1, true),
                (V1, Light) => (4, 2, 1, 2, 1, 1, true),
                (V2, Light) => (4, 2, 1, 2, 1, 1, true),
                (V1, Heavy) => (4, 4, 1, 2, 2, 1, true),
                (V2, Heavy) => (8, 4, 1, 2, 2, 1, true),
                (V1, Ranged) => (1, 1, 3, 3, 1, 1, true),
                (V2, Ranged) => (3, 1, 3, 3, 1, 1, true),
            };
        UnitStats {
            hp,
            damage,
            range,
            sight,
            move_time,
            attack_time,
            mobile,
        }
    }
}
