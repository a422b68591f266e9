use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use engine::{Pose, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::gameplay::{
    ControlKind, ItemCategory, Participant, ParticipantRoster, SpawnPoints, SpawnSettings,
    SHOPPING_LIST_LEN,
};

pub const CONFIG_ENV_VAR: &str = "SHOPPER_CONFIG";
pub const SEED_ENV_VAR: &str = "SHOPPER_SEED";
pub const MAX_TICKS_ENV_VAR: &str = "SHOPPER_MAX_TICKS";
pub const REALTIME_ENV_VAR: &str = "SHOPPER_REALTIME";

const ROOT_JSON_PATH: &str = "document root";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read match config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse match config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at {path}: {message}")]
    Invalid { path: String, message: String },
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("invalid value {value:?} for {var}: expected {expected}")]
    InvalidEnvValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl ConfigError {
    fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    pub match_length_seconds: f32,
    pub max_instances_per_grocery_item: usize,
    pub spare_change_respawn_seconds: f32,
    pub mystery_bag_first_spawn_seconds: f32,
    pub mystery_bag_respawn_range_seconds: [f32; 2],
    pub bonus_banner_frames: u32,
    pub starting_cookie_spawn: Vec3,
    pub mystery_bag_spawn: Vec3,
    pub spawn_points: SpawnPointsConfig,
    pub participants: Vec<ParticipantConfig>,
    pub seed: Option<u64>,
    pub sandbox: SandboxConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpawnPointsConfig {
    pub spare_change: Vec<Vec3>,
    pub drinks: Vec<Vec3>,
    pub fruit: Vec<Vec3>,
    pub veggies: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticipantConfig {
    pub name: String,
    pub control: ControlKind,
    pub spawn: Vec3,
    pub shopping_list: Vec<ItemCategory>,
}

/// Tuning for the kinematic stand-in that moves carts and resolves pickups
/// in headless runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SandboxConfig {
    pub cart_speed: f32,
    pub pickup_radius: f32,
    pub bash_radius: f32,
    pub bash_protection_seconds: f32,
    pub grocery_points: u32,
    pub spare_change_points: u32,
    pub mystery_bag_points: u32,
    pub list_completion_points: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_length_seconds: 300.0,
            max_instances_per_grocery_item: 2,
            spare_change_respawn_seconds: 10.0,
            mystery_bag_first_spawn_seconds: 30.0,
            mystery_bag_respawn_range_seconds: [30.0, 60.0],
            bonus_banner_frames: 75,
            starting_cookie_spawn: Vec3::new(0.0, 3.0, 0.0),
            mystery_bag_spawn: Vec3::new(0.0, 3.0, 0.0),
            spawn_points: SpawnPointsConfig::default(),
            participants: default_participants(),
            seed: None,
            sandbox: SandboxConfig::default(),
        }
    }
}

impl Default for SpawnPointsConfig {
    fn default() -> Self {
        Self {
            spare_change: default_spare_change_points(),
            drinks: vec![
                Vec3::new(-48.0, 3.0, 94.0),
                Vec3::new(-132.0, 3.0, 94.0),
                Vec3::new(-13.0, 3.0, 161.0),
                Vec3::new(-109.0, 3.0, 200.0),
                Vec3::new(-220.0, 3.0, 82.0),
                Vec3::new(43.0, 3.0, 237.0),
            ],
            fruit: vec![
                Vec3::new(-45.0, 3.0, -94.0),
                Vec3::new(-130.0, 3.0, -190.0),
                Vec3::new(-155.0, 3.0, -112.0),
                Vec3::new(-220.0, 3.0, -57.0),
                Vec3::new(-35.0, 3.0, -194.0),
                Vec3::new(55.0, 3.0, -217.0),
            ],
            veggies: vec![
                Vec3::new(91.0, 3.0, 0.0),
                Vec3::new(161.0, 3.0, -40.0),
                Vec3::new(161.0, 3.0, 40.0),
                Vec3::new(238.0, 3.0, 0.0),
                Vec3::new(158.0, 3.0, 161.0),
                Vec3::new(158.0, 3.0, -161.0),
            ],
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            cart_speed: 40.0,
            pickup_radius: 6.0,
            bash_radius: 5.0,
            bash_protection_seconds: 3.0,
            grocery_points: 10,
            spare_change_points: 5,
            mystery_bag_points: 30,
            list_completion_points: 50,
        }
    }
}

/// Three aisles of 17 coins: one along the x axis, two on the diagonals
/// running out to the back corners.
fn default_spare_change_points() -> Vec<Vec3> {
    let straight = (0..17).map(|step| Vec3::new(-240.0 + 10.0 * step as f32, 3.0, 0.0));
    let diagonal = |sign: f32| {
        (0..17).map(move |step| {
            let step = step as f32;
            Vec3::new(120.0 - 5.0 * step, 3.0, sign * (207.85 - 8.66 * step))
        })
    };
    straight.chain(diagonal(1.0)).chain(diagonal(-1.0)).collect()
}

fn default_participants() -> Vec<ParticipantConfig> {
    use ItemCategory::*;
    let lists = [
        [Milk, Apple, Carrot],
        [Water, Watermelon, Eggplant],
        [Cola, Banana, Broccoli],
        [Milk, Watermelon, Broccoli],
        [Water, Banana, Carrot],
        [Cola, Apple, Eggplant],
    ];
    let spawns = [
        Vec3::new(-30.0, 3.0, -20.0),
        Vec3::new(-30.0, 3.0, 20.0),
        Vec3::new(0.0, 3.0, -35.0),
        Vec3::new(0.0, 3.0, 35.0),
        Vec3::new(30.0, 3.0, -20.0),
        Vec3::new(30.0, 3.0, 20.0),
    ];

    lists
        .iter()
        .zip(spawns)
        .enumerate()
        .map(|(index, (list, spawn))| {
            let (name, control) = if index == 0 {
                ("Player 1".to_string(), ControlKind::Human)
            } else {
                (format!("Bot {}", index + 1), ControlKind::Bot)
            };
            ParticipantConfig {
                name,
                control,
                spawn,
                shopping_list: list.to_vec(),
            }
        })
        .collect()
}

impl MatchConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config: MatchConfig = serde_path_to_error::deserialize(&mut deserializer).map_err(
            |error| {
                let path = error.path().to_string();
                let path = if path.is_empty() || path == "." {
                    ROOT_JSON_PATH.to_string()
                } else {
                    path
                };
                ConfigError::Parse {
                    path,
                    source: error.into_inner(),
                }
            },
        )?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("match_length_seconds", self.match_length_seconds)?;
        if self.max_instances_per_grocery_item == 0 {
            return Err(ConfigError::invalid(
                "max_instances_per_grocery_item",
                "expected at least 1, got 0",
            ));
        }
        require_non_negative(
            "spare_change_respawn_seconds",
            self.spare_change_respawn_seconds,
        )?;
        require_non_negative(
            "mystery_bag_first_spawn_seconds",
            self.mystery_bag_first_spawn_seconds,
        )?;
        let [min, max] = self.mystery_bag_respawn_range_seconds;
        require_non_negative("mystery_bag_respawn_range_seconds[0]", min)?;
        require_non_negative("mystery_bag_respawn_range_seconds[1]", max)?;
        if min > max {
            return Err(ConfigError::invalid(
                "mystery_bag_respawn_range_seconds",
                format!("expected min <= max, got [{min}, {max}]"),
            ));
        }
        require_finite_point("starting_cookie_spawn", self.starting_cookie_spawn)?;
        require_finite_point("mystery_bag_spawn", self.mystery_bag_spawn)?;

        for (name, points) in [
            ("spare_change", &self.spawn_points.spare_change),
            ("drinks", &self.spawn_points.drinks),
            ("fruit", &self.spawn_points.fruit),
            ("veggies", &self.spawn_points.veggies),
        ] {
            if points.is_empty() {
                return Err(ConfigError::invalid(
                    format!("spawn_points.{name}"),
                    "expected at least one spawn point",
                ));
            }
            for (index, point) in points.iter().enumerate() {
                require_finite_point(&format!("spawn_points.{name}[{index}]"), *point)?;
            }
        }

        if self.participants.is_empty() {
            return Err(ConfigError::invalid(
                "participants",
                "expected at least one participant",
            ));
        }
        for (index, participant) in self.participants.iter().enumerate() {
            if participant.name.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("participants[{index}].name"),
                    "expected a non-empty name",
                ));
            }
            require_finite_point(&format!("participants[{index}].spawn"), participant.spawn)?;
            if participant.shopping_list.len() != SHOPPING_LIST_LEN {
                return Err(ConfigError::invalid(
                    format!("participants[{index}].shopping_list"),
                    format!(
                        "expected {SHOPPING_LIST_LEN} items, got {}",
                        participant.shopping_list.len()
                    ),
                ));
            }
            for (slot, category) in participant.shopping_list.iter().enumerate() {
                if !category.is_grocery() {
                    return Err(ConfigError::invalid(
                        format!("participants[{index}].shopping_list[{slot}]"),
                        format!("expected a grocery item, got {category:?}"),
                    ));
                }
            }
        }

        require_positive("sandbox.cart_speed", self.sandbox.cart_speed)?;
        require_positive("sandbox.pickup_radius", self.sandbox.pickup_radius)?;
        require_positive("sandbox.bash_radius", self.sandbox.bash_radius)?;
        require_non_negative(
            "sandbox.bash_protection_seconds",
            self.sandbox.bash_protection_seconds,
        )?;
        Ok(())
    }

    pub fn spawn_settings(&self) -> SpawnSettings {
        let [min, max] = self.mystery_bag_respawn_range_seconds;
        SpawnSettings {
            max_instances_per_grocery_item: self.max_instances_per_grocery_item,
            spare_change_respawn_seconds: self.spare_change_respawn_seconds,
            mystery_bag_first_spawn_seconds: self.mystery_bag_first_spawn_seconds,
            mystery_bag_respawn_range_seconds: (min, max),
            bonus_banner_frames: self.bonus_banner_frames,
            starting_cookie_spawn: Pose::at(self.starting_cookie_spawn),
            mystery_bag_spawn: Pose::at(self.mystery_bag_spawn),
        }
    }

    pub fn spawn_points(&self) -> SpawnPoints {
        let poses = |points: &[Vec3]| points.iter().copied().map(Pose::at).collect();
        SpawnPoints {
            spare_change: poses(&self.spawn_points.spare_change),
            drinks: poses(&self.spawn_points.drinks),
            fruit: poses(&self.spawn_points.fruit),
            veggies: poses(&self.spawn_points.veggies),
        }
    }

    /// Expects a validated config; list entries beyond the fixed length are
    /// ignored and missing ones fall back to milk.
    pub fn build_roster(&self) -> ParticipantRoster {
        let participants = self
            .participants
            .iter()
            .map(|participant| {
                let list: [ItemCategory; SHOPPING_LIST_LEN] = std::array::from_fn(|slot| {
                    participant
                        .shopping_list
                        .get(slot)
                        .copied()
                        .unwrap_or(ItemCategory::Milk)
                });
                Participant::new(participant.name.clone(), participant.control, list)
            })
            .collect();
        ParticipantRoster::new(participants)
    }
}

fn require_finite_point(path: &str, point: Vec3) -> Result<(), ConfigError> {
    if point.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            path,
            format!("expected finite coordinates, got {point:?}"),
        ))
    }
}

fn require_positive(path: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            path,
            format!("expected a positive finite number, got {value}"),
        ))
    }
}

fn require_non_negative(path: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            path,
            format!("expected a non-negative finite number, got {value}"),
        ))
    }
}

/// Everything the binary needs to start a run, resolved from the
/// environment.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSettings {
    pub match_config: MatchConfig,
    pub config_path: Option<PathBuf>,
    pub seed: u64,
    pub max_ticks: Option<u64>,
    pub realtime: bool,
}

impl LaunchSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(read_env_var)
    }

    /// `lookup` returns the raw value of an environment variable, or `None`
    /// when it is unset.
    pub fn resolve(
        lookup: impl Fn(&'static str) -> Result<Option<String>, ConfigError>,
    ) -> Result<Self, ConfigError> {
        let config_path = lookup(CONFIG_ENV_VAR)?
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);
        let match_config = match &config_path {
            Some(path) => MatchConfig::load(path)?,
            None => {
                let config = MatchConfig::default();
                config.validate()?;
                config
            }
        };

        let seed = match lookup(SEED_ENV_VAR)? {
            Some(raw) => parse_env_u64(SEED_ENV_VAR, &raw)?,
            None => match_config.seed.unwrap_or_else(rand::random),
        };
        let max_ticks = lookup(MAX_TICKS_ENV_VAR)?
            .map(|raw| parse_env_u64(MAX_TICKS_ENV_VAR, &raw))
            .transpose()?;
        let realtime = lookup(REALTIME_ENV_VAR)?
            .map(|raw| parse_env_flag(REALTIME_ENV_VAR, &raw))
            .transpose()?
            .unwrap_or(false);

        Ok(Self {
            match_config,
            config_path,
            seed,
            max_ticks,
            realtime,
        })
    }
}

fn read_env_var(var: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(var) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source) => Err(ConfigError::EnvVar { var, source }),
    }
}

fn parse_env_u64(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidEnvValue {
            var,
            value: raw.to_string(),
            expected: "an unsigned integer",
        })
}

fn parse_env_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnvValue {
            var,
            value: raw.to_string(),
            expected: "a boolean flag",
        }),
    }
}
