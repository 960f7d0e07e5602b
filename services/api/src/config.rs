//! Service configuration loaded from the environment

use anyhow::Result;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Chat completion endpoint (`AI_API_URL`)
    pub api_url: String,
    /// `AI_API_KEY`; without one every request is answered by the mock spec
    pub api_key: Option<String>,
    /// `AI_MODEL`
    pub model: String,
    /// `AI_TIMEOUT_SECS`
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP listener binds to (`BIND_ADDR`)
    pub bind_addr: String,
    pub ai: AiConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:3001")?
            .set_default("ai_api_url", "https://api.openai.com/v1/chat/completions")?
            .set_default("ai_model", "gpt-4o-mini")?
            .set_default("ai_timeout_secs", 20_i64)?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        let timeout_secs = settings.get_int("ai_timeout_secs")?;
        if timeout_secs <= 0 {
            anyhow::bail!("AI_TIMEOUT_SECS must be positive");
        }

        let api_key = settings
            .get_string("ai_api_key")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(ServiceConfig {
            bind_addr: settings.get_string("bind_addr")?,
            ai: AiConfig {
                api_url: settings.get_string("ai_api_url")?,
                api_key,
                model: settings.get_string("ai_model")?,
                timeout: Duration::from_secs(timeout_secs as u64),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        unsafe {
            for var in [
                "BIND_ADDR",
                "AI_API_URL",
                "AI_API_KEY",
                "AI_MODEL",
                "AI_TIMEOUT_SECS",
            ] {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_without_environment() {
        clear();
        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert_eq!(config.ai.model, "gpt-4o-mini");
        assert!(config.ai.api_key.is_none());
        assert_eq!(config.ai.timeout, Duration::from_secs(20));
    }

    #[test]
    #[serial]
    fn ai_settings_are_read_from_environment() {
        clear();
        unsafe {
            std::env::set_var("AI_API_KEY", "sk-test");
            std::env::set_var("AI_MODEL", "local-model");
            std::env::set_var("AI_TIMEOUT_SECS", "5");
        }
        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.ai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.ai.model, "local-model");
        assert_eq!(config.ai.timeout, Duration::from_secs(5));

        unsafe {
            std::env::set_var("AI_API_KEY", "  ");
            std::env::set_var("AI_TIMEOUT_SECS", "0");
        }
        assert!(ServiceConfig::from_env().is_err());

        unsafe {
            std::env::remove_var("AI_TIMEOUT_SECS");
        }
        assert!(ServiceConfig::from_env().unwrap().ai.api_key.is_none());
        clear();
    }
}
