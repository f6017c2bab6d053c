//! Static tables of dance styles and skeleton moves.
//!
//! Both tables are process-wide constants. Lookups never fail: an unknown id
//! resolves to the table's default entry.

use serde::{Deserialize, Serialize};

pub const DEFAULT_STYLE: &str = "afrobeats";

/// Kinematic parameters for one limb-chain dance style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StyleProfile {
    pub speed: f32,
    pub arm_amplitude: f32,
    pub leg_amplitude: f32,
    pub torso_sway: f32,
    pub bounce: f32,
    pub display_color: &'static str,
}

const STYLES: &[(&str, StyleProfile)] = &[
    (
        "afrobeats",
        StyleProfile {
            speed: 3.0,
            arm_amplitude: 0.8,
            leg_amplitude: 0.7,
            torso_sway: 0.25,
            bounce: 0.12,
            display_color: "#FF6B35",
        },
    ),
    (
        "hiphop",
        StyleProfile {
            speed: 2.5,
            arm_amplitude: 1.0,
            leg_amplitude: 0.9,
            torso_sway: 0.18,
            bounce: 0.06,
            display_color: "#004E89",
        },
    ),
    (
        "electro",
        StyleProfile {
            speed: 4.0,
            arm_amplitude: 0.6,
            leg_amplitude: 0.4,
            torso_sway: 0.12,
            bounce: 0.15,
            display_color: "#EF476F",
        },
    ),
    (
        "salsa",
        StyleProfile {
            speed: 2.0,
            arm_amplitude: 1.2,
            leg_amplitude: 1.0,
            torso_sway: 0.35,
            bounce: 0.1,
            display_color: "#06D6A0",
        },
    ),
    (
        "robot",
        StyleProfile {
            speed: 1.5,
            arm_amplitude: 0.3,
            leg_amplitude: 0.25,
            torso_sway: 0.05,
            bounce: 0.02,
            display_color: "#5A189A",
        },
    ),
];

/// Lookup table over the built-in style profiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleCatalog;

impl StyleCatalog {
    /// Resolves `id`, falling back to [`DEFAULT_STYLE`] when it is unknown.
    pub fn lookup(id: &str) -> StyleProfile {
        Self::profile(id).unwrap_or_else(Self::default_profile)
    }

    /// Strict lookup used by the profile query endpoint.
    pub fn profile(id: &str) -> Option<StyleProfile> {
        STYLES
            .iter()
            .find(|(name, _)| *name == id)
            .map(|(_, profile)| *profile)
    }

    pub fn default_profile() -> StyleProfile {
        STYLES[0].1
    }

    pub fn contains(id: &str) -> bool {
        Self::profile(id).is_some()
    }

    /// Style ids in catalog order.
    pub fn list_style_ids() -> Vec<&'static str> {
        STYLES.iter().map(|(name, _)| *name).collect()
    }
}

/// Parameters for a full-skeleton move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoveDefinition {
    pub description: &'static str,
    pub intensity: f32,
    pub speed: f32,
}

/// The choreography a full-skeleton move applies. Each variant touches a
/// fixed subset of joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MoveKind {
    Moonwalk,
    CrotchGrab,
    Spin,
    Kick,
    Lean,
    ArmWave,
}

impl MoveKind {
    pub fn id(self) -> &'static str {
        match self {
            Self::Moonwalk => "moonwalk",
            Self::CrotchGrab => "crotchGrab",
            Self::Spin => "spin",
            Self::Kick => "kick",
            Self::Lean => "lean",
            Self::ArmWave => "armWave",
        }
    }
}

const MOVES: &[(MoveKind, MoveDefinition)] = &[
    (
        MoveKind::Moonwalk,
        MoveDefinition {
            description: "Backward glide with alternating leg slides",
            intensity: 0.8,
            speed: 1.0,
        },
    ),
    (
        MoveKind::CrotchGrab,
        MoveDefinition {
            description: "Sharp hip thrust with both arms pulled in",
            intensity: 0.9,
            speed: 1.5,
        },
    ),
    (
        MoveKind::Spin,
        MoveDefinition {
            description: "Full turn led by the hips",
            intensity: 1.0,
            speed: 2.0,
        },
    ),
    (
        MoveKind::Kick,
        MoveDefinition {
            description: "Right leg kick with a lean back",
            intensity: 0.9,
            speed: 2.0,
        },
    ),
    (
        MoveKind::Lean,
        MoveDefinition {
            description: "Slow forward lean from the ankles",
            intensity: 0.7,
            speed: 0.5,
        },
    ),
    (
        MoveKind::ArmWave,
        MoveDefinition {
            description: "Travelling wave from shoulder to fingertips",
            intensity: 0.8,
            speed: 1.0,
        },
    ),
];

/// Lookup table over the built-in skeleton moves. Catalog order is also the
/// order the sequence timeline cycles through.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveCatalog;

impl MoveCatalog {
    /// Resolves `id`, falling back to the first move when it is unknown.
    pub fn lookup(id: &str) -> (MoveKind, MoveDefinition) {
        Self::find(id).unwrap_or(MOVES[0])
    }

    pub fn find(id: &str) -> Option<(MoveKind, MoveDefinition)> {
        MOVES.iter().copied().find(|(kind, _)| kind.id() == id)
    }

    pub fn definition(kind: MoveKind) -> MoveDefinition {
        MOVES
            .iter()
            .find(|(candidate, _)| *candidate == kind)
            .map(|(_, definition)| *definition)
            .unwrap_or(MOVES[0].1)
    }

    pub fn contains(id: &str) -> bool {
        Self::find(id).is_some()
    }

    pub fn moves() -> &'static [(MoveKind, MoveDefinition)] {
        MOVES
    }

    pub fn list_move_ids() -> Vec<&'static str> {
        MOVES.iter().map(|(kind, _)| kind.id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_style_falls_back_to_default() {
        let profile = StyleCatalog::lookup("polka");
        assert_eq!(profile, StyleCatalog::lookup(DEFAULT_STYLE));
        assert_eq!(profile.display_color, "#FF6B35");
    }

    #[test]
    fn lists_styles_in_catalog_order() {
        assert_eq!(
            StyleCatalog::list_style_ids(),
            vec!["afrobeats", "hiphop", "electro", "salsa", "robot"]
        );
    }

    #[test]
    fn salsa_profile_values() {
        let salsa = StyleCatalog::profile("salsa").unwrap();
        assert_eq!(salsa.speed, 2.0);
        assert_eq!(salsa.arm_amplitude, 1.2);
        assert!(StyleCatalog::profile("waltz").is_none());
    }

    #[test]
    fn move_ids_round_trip_through_lookup() {
        for id in MoveCatalog::list_move_ids() {
            let (kind, _) = MoveCatalog::lookup(id);
            assert_eq!(kind.id(), id);
        }
        assert_eq!(MoveCatalog::lookup("robotDance").0, MoveKind::Moonwalk);
    }
}
