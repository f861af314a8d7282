use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

use crate::storage::UserSeed;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Teacher accounts seeded into the users table at startup.
    #[serde(default)]
    pub users: Vec<UserConfig>,
    pub dev_cors_origin: Option<String>,
    pub listen_port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

fn default_role() -> Role {
    Role::Teacher
}

impl UserConfig {
    pub fn to_seed(&self) -> UserSeed {
        UserSeed {
            username: self.username.clone(),
            password: self.password.clone(),
            role: self.role.as_str().to_string(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Yaml(e) => write!(f, "YAML error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(value: serde_yaml::Error) -> Self {
        ConfigError::Yaml(value)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        Self::load_from_path(path)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path)?;
        let cfg: AppConfig = serde_yaml::from_str(&text)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let cfg: AppConfig = serde_yaml::from_str(
            r#"
users:
  - username: mknight
    password: s3cret
    name: "M. Knight"
dev_cors_origin: null
listen_port: 5858
"#,
        )
        .unwrap();
        assert_eq!(cfg.listen_port, Some(5858));
        assert_eq!(cfg.users.len(), 1);
        assert_eq!(cfg.users[0].role, Role::Teacher);
    }
}
