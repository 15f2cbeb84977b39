use crate::error::{MomfitError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level MomFit configuration stored as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomfitConfig {
    pub momfit: MomfitSettings,
    #[serde(default)]
    pub intent: IntentConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomfitSettings {
    /// Path to the SQLite database (roles, assignments, events, messages).
    pub db_path: String,
}

/// Which classifier backs intent detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    /// "keyword" (local regex classifier) or "openai" (OpenAI-compatible API).
    #[serde(default = "default_intent_provider")]
    pub provider: String,
    /// Chat-completions endpoint for the "openai" provider.
    #[serde(default = "default_intent_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_intent_model")]
    pub model: String,
    /// Name of the environment variable holding the API key. The key itself
    /// never lives in the config file.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            provider: default_intent_provider(),
            endpoint: default_intent_endpoint(),
            model: default_intent_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Post an announcement to the community stream after creating an event.
    #[serde(default = "default_announce_events")]
    pub announce_events: bool,
    /// Default cap for upcoming-event listings.
    #[serde(default = "default_upcoming_limit")]
    pub upcoming_limit: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            announce_events: default_announce_events(),
            upcoming_limit: default_upcoming_limit(),
        }
    }
}

fn default_intent_provider() -> String {
    "keyword".to_string()
}

fn default_intent_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_intent_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "MOMFIT_LLM_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_announce_events() -> bool {
    true
}

fn default_upcoming_limit() -> u32 {
    10
}

impl MomfitConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MomfitError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| MomfitError::TomlDe(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| MomfitError::TomlSer(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        match self.intent.provider.as_str() {
            "keyword" | "openai" => {}
            other => {
                return Err(MomfitError::Config(format!(
                    "Invalid intent provider: {other}. Must be one of: keyword, openai"
                )));
            }
        }
        if self.intent.timeout_secs == 0 {
            return Err(MomfitError::Config(
                "intent.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.scheduler.upcoming_limit == 0 {
            return Err(MomfitError::Config(
                "scheduler.upcoming_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Default config for `momfit init`.
    pub fn default_config(base_dir: &Path) -> Self {
        Self {
            momfit: MomfitSettings {
                db_path: base_dir.join("momfit.db").display().to_string(),
            },
            intent: IntentConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }

    /// Resolve the config file path: `<base_dir>/momfit.toml`
    pub fn default_path(base_dir: &Path) -> PathBuf {
        base_dir.join("momfit.toml")
    }

    /// Resolve the default momfit home directory: `~/.momfit`
    pub fn default_base_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|h| h.join(".momfit"))
            .ok_or_else(|| MomfitError::Config("Cannot determine home directory".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn roundtrip_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("momfit.toml");
        let config = MomfitConfig::default_config(tmp.path());
        config.save(&path).unwrap();
        let loaded = MomfitConfig::load(&path).unwrap();
        assert_eq!(loaded.intent.provider, "keyword");
        assert!(loaded.scheduler.announce_events);
        assert!(loaded.momfit.db_path.ends_with("momfit.db"));
    }

    #[test]
    fn load_nonexistent_returns_error() {
        let result = MomfitConfig::load(Path::new("/nonexistent/momfit.toml"));
        assert!(matches!(result, Err(MomfitError::ConfigNotFound(_))));
    }

    #[test]
    fn missing_sections_take_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("momfit.toml");
        std::fs::write(&path, "[momfit]\ndb_path = \"/tmp/momfit.db\"\n").unwrap();
        let loaded = MomfitConfig::load(&path).unwrap();
        assert_eq!(loaded.intent.api_key_env, "MOMFIT_LLM_API_KEY");
        assert_eq!(loaded.intent.timeout_secs, 10);
        assert_eq!(loaded.scheduler.upcoming_limit, 10);
    }

    #[test]
    fn unknown_provider_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("momfit.toml");
        std::fs::write(
            &path,
            "[momfit]\ndb_path = \"/tmp/momfit.db\"\n\n[intent]\nprovider = \"oracle\"\n",
        )
        .unwrap();
        let result = MomfitConfig::load(&path);
        assert!(matches!(result, Err(MomfitError::Config(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("momfit.toml");
        let mut config = MomfitConfig::default_config(tmp.path());
        config.intent.timeout_secs = 0;
        config.save(&path).unwrap();
        assert!(MomfitConfig::load(&path).is_err());
    }
}
