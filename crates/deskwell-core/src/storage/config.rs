//! TOML-based application configuration.
//!
//! Holds the timing rules consumed by the tracker and reminder loop, the
//! HTTP listen port, the prompt commands, and the presence endpoint.
//!
//! Stored at `~/.config/deskwell/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::presence::GRAPH_PRESENCE_URL;

/// Timing rules. All values are minutes unless noted otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Daily work target before the end-of-day confirmation fires.
    #[serde(default = "default_work_target_min")]
    pub work_target_min: u32,
    /// How much one "keep going" answer raises the target.
    #[serde(default = "default_extend_block_min")]
    pub extend_block_min: u32,
    #[serde(default = "default_look_far_every_min")]
    pub look_far_every_min: u32,
    #[serde(default = "default_stand_up_every_min")]
    pub stand_up_every_min: u32,
    /// Minutes of continuous idleness that count as having stood up.
    #[serde(default = "default_standup_reset_idle_min")]
    pub standup_reset_idle_min: u32,
    /// Break minutes creditable as work before the rest becomes absence.
    #[serde(default = "default_break_free_min")]
    pub break_free_min: u32,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Prompt collaborator configuration.
///
/// Each command, when set, is run through the shell whenever the matching
/// prompt fires; its run time is recorded as the reaction latency. Unset
/// commands leave the `*_show` event record as the whole prompt.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptsConfig {
    #[serde(default)]
    pub look_far_command: Option<String>,
    #[serde(default)]
    pub stand_up_command: Option<String>,
    /// Yes/no command for the end-of-day question; exit 0 ends the day,
    /// anything else extends it.
    #[serde(default)]
    pub end_of_day_command: Option<String>,
    /// Exported to the prompt command's environment; the collaborator
    /// decides whether to honor it.
    #[serde(default = "default_look_far_uncloseable_s")]
    pub look_far_uncloseable_s: u32,
}

/// Presence probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_graph_presence_url")]
    pub graph_presence_url: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/deskwell/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
}

// Default functions
fn default_work_target_min() -> u32 {
    480
}
fn default_extend_block_min() -> u32 {
    15
}
fn default_look_far_every_min() -> u32 {
    20
}
fn default_stand_up_every_min() -> u32 {
    60
}
fn default_standup_reset_idle_min() -> u32 {
    2
}
fn default_break_free_min() -> u32 {
    30
}
fn default_port() -> u16 {
    5600
}
fn default_look_far_uncloseable_s() -> u32 {
    20
}
fn default_graph_presence_url() -> String {
    GRAPH_PRESENCE_URL.into()
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            work_target_min: default_work_target_min(),
            extend_block_min: default_extend_block_min(),
            look_far_every_min: default_look_far_every_min(),
            stand_up_every_min: default_stand_up_every_min(),
            standup_reset_idle_min: default_standup_reset_idle_min(),
            break_free_min: default_break_free_min(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            graph_presence_url: default_graph_presence_url(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            server: ServerConfig::default(),
            prompts: PromptsConfig::default(),
            presence: PresenceConfig::default(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/deskwell"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, writing the defaults first if no file exists.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// default config cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        Self::load_path(&path)
    }

    fn load_path(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_path(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        self.save_path(&path)
    }

    fn save_path(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        match current {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not persist; call
    /// [`save`](Self::save) afterwards.
    ///
    /// # Errors
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// as the key's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        set_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

fn set_by_path(root: &mut serde_json::Value, key: &str, value: &str) -> Result<(), ConfigError> {
    let unknown = || ConfigError::UnknownKey(key.to_string());
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    };

    let (parent_path, leaf) = match key.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, key),
    };

    let mut current = root;
    if let Some(parent_path) = parent_path {
        for part in parent_path.split('.') {
            current = current.get_mut(part).ok_or_else(unknown)?;
        }
    }
    let obj = current.as_object_mut().ok_or_else(unknown)?;
    let existing = obj.get(leaf).ok_or_else(unknown)?;

    let new_value = match existing {
        serde_json::Value::Bool(_) => serde_json::Value::Bool(
            value
                .parse::<bool>()
                .map_err(|e| invalid(e.to_string()))?,
        ),
        serde_json::Value::Number(_) => {
            let n = value
                .parse::<u64>()
                .map_err(|e| invalid(e.to_string()))?;
            serde_json::Value::Number(n.into())
        }
        serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
            return Err(invalid("cannot set a whole section".into()));
        }
        // Strings and unset optional strings.
        _ => serde_json::Value::String(value.into()),
    };

    obj.insert(leaf.to_string(), new_value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_rules() {
        let cfg = Config::default();
        assert_eq!(cfg.timing.work_target_min, 480);
        assert_eq!(cfg.timing.extend_block_min, 15);
        assert_eq!(cfg.timing.look_far_every_min, 20);
        assert_eq!(cfg.timing.stand_up_every_min, 60);
        assert_eq!(cfg.timing.standup_reset_idle_min, 2);
        assert_eq!(cfg.timing.break_free_min, 30);
        assert_eq!(cfg.server.port, 5600);
        assert!(cfg.prompts.look_far_command.is_none());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: Config = toml::from_str("[timing]\nwork_target_min = 300\n").unwrap();
        assert_eq!(cfg.timing.work_target_min, 300);
        assert_eq!(cfg.timing.break_free_min, 30);
        assert_eq!(cfg.server.port, 5600);
    }

    #[test]
    fn roundtrips_through_toml() {
        let mut cfg = Config::default();
        cfg.timing.look_far_every_min = 25;
        cfg.prompts.look_far_command = Some("notify-send 'look far'".into());
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.timing.look_far_every_min, 25);
        assert_eq!(back.prompts.look_far_command.as_deref(), Some("notify-send 'look far'"));
    }

    #[test]
    fn get_reads_dotted_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timing.work_target_min").as_deref(), Some("480"));
        assert_eq!(cfg.get("server.port").as_deref(), Some("5600"));
        assert!(cfg.get("timing.nope").is_none());
    }

    #[test]
    fn set_updates_numbers_and_strings() {
        let mut cfg = Config::default();
        cfg.set("timing.break_free_min", "20").unwrap();
        assert_eq!(cfg.timing.break_free_min, 20);
        cfg.set("prompts.look_far_command", "zenity --info").unwrap();
        assert_eq!(cfg.prompts.look_far_command.as_deref(), Some("zenity --info"));
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("timing.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("server.port", "not-a-number"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn load_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_path(&path).unwrap();
        assert_eq!(cfg.timing.work_target_min, 480);
        assert!(path.exists());
        let reread = Config::load_path(&path).unwrap();
        assert_eq!(reread.server.port, 5600);
    }
}
