//! Service configuration loaded from the environment

use anyhow::Result;
use chrono::Duration;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP listener binds to (`BIND_ADDR`)
    pub bind_addr: String,
    /// Lifetime of a freshly issued invite (`INVITE_EXPIRY_HOURS`)
    pub invite_expiry_hours: i64,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:3000")?
            .set_default("invite_expiry_hours", 168_i64)?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        let invite_expiry_hours = settings.get_int("invite_expiry_hours")?;
        if invite_expiry_hours <= 0 {
            anyhow::bail!("INVITE_EXPIRY_HOURS must be positive");
        }

        Ok(ServiceConfig {
            bind_addr: settings.get_string("bind_addr")?,
            invite_expiry_hours,
        })
    }

    pub fn invite_ttl(&self) -> Duration {
        Duration::hours(self.invite_expiry_hours)
    }
}
