use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumString};
use thiserror::Error;

pub const CONFIG_DIR_ENV: &str = "CHROMACTL_HOME";
pub const CONFIG_DIR: &str = ".chromactl";
pub const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TENANT: &str = "default_tenant";
pub const DEFAULT_DATABASE: &str = "default_database";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Server with alias '{0}' does not exist")]
    ServerNotFound(String),
    #[error("Server with alias '{0}' already exists, use --overwrite to replace it")]
    ServerAlreadyExists(String),
    #[error("No active server. Add one with: chromactl server add <alias>")]
    NoActiveServer,
    #[error("Could not find home directory")]
    HomeDirNotFound,
    #[error("Could not access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Could not save config file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ValueEnum,
    Display,
    EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AuthType {
    #[default]
    None,
    Basic,
    Token,
    XToken,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    pub credential: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerProfile {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub secure: bool,
    pub tenant: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

impl Default for ServerProfile {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            secure: false,
            tenant: DEFAULT_TENANT.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            auth: None,
        }
    }
}

impl ServerProfile {
    pub fn endpoint(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// The server, tenant and database a command talks to.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub alias: String,
    pub profile: ServerProfile,
    pub tenant: String,
    pub database: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_tenant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_database: Option<String>,
    pub servers: BTreeMap<String, ServerProfile>,
}

impl CliConfig {
    pub fn server(&self, alias: &str) -> Result<&ServerProfile, ConfigError> {
        self.servers
            .get(alias)
            .ok_or_else(|| ConfigError::ServerNotFound(alias.to_string()))
    }

    /// Registers a server. The first server added becomes the active one.
    pub fn add_server(
        &mut self,
        alias: &str,
        profile: ServerProfile,
        overwrite: bool,
    ) -> Result<(), ConfigError> {
        if self.servers.contains_key(alias) && !overwrite {
            return Err(ConfigError::ServerAlreadyExists(alias.to_string()));
        }
        self.servers.insert(alias.to_string(), profile);
        if self.active_server.is_none() {
            self.active_server = Some(alias.to_string());
        }
        Ok(())
    }

    pub fn remove_server(&mut self, alias: &str) -> Result<ServerProfile, ConfigError> {
        let profile = self
            .servers
            .remove(alias)
            .ok_or_else(|| ConfigError::ServerNotFound(alias.to_string()))?;
        if self.active_server.as_deref() == Some(alias) {
            self.active_server = None;
            self.active_tenant = None;
            self.active_database = None;
        }
        Ok(profile)
    }

    /// Makes `alias` active. Tenant and database selections not given are cleared so the
    /// profile's own values apply.
    pub fn use_server(
        &mut self,
        alias: &str,
        tenant: Option<String>,
        database: Option<String>,
    ) -> Result<(), ConfigError> {
        self.server(alias)?;
        self.active_server = Some(alias.to_string());
        self.active_tenant = tenant;
        self.active_database = database;
        Ok(())
    }

    /// Resolves the target of a command. An explicit alias beats the active server; the
    /// active tenant and database only apply to the active server.
    pub fn target(&self, alias: Option<&str>) -> Result<Target, ConfigError> {
        let (alias, explicit) = match alias {
            Some(alias) => (alias, true),
            None => (
                self.active_server
                    .as_deref()
                    .ok_or(ConfigError::NoActiveServer)?,
                false,
            ),
        };
        let profile = self.server(alias)?.clone();
        let is_active = !explicit || self.active_server.as_deref() == Some(alias);

        let tenant = self
            .active_tenant
            .clone()
            .filter(|_| is_active)
            .unwrap_or_else(|| profile.tenant.clone());
        let database = self
            .active_database
            .clone()
            .filter(|_| is_active)
            .unwrap_or_else(|| profile.database.clone());

        Ok(Target {
            alias: alias.to_string(),
            profile,
            tenant,
            database,
        })
    }
}

pub trait ConfigStore {
    fn load(&self) -> Result<CliConfig, ConfigError>;
    fn write(&self, config: &CliConfig) -> Result<(), ConfigError>;
}

/// Configuration kept in `$CHROMACTL_HOME/config.toml`, or `~/.chromactl/config.toml`.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CONFIG_FILE),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(Self::new(dir));
        }
        let home_dir = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
        Ok(Self::new(home_dir.join(CONFIG_DIR)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<CliConfig, ConfigError> {
        if !self.path.exists() {
            return Ok(CliConfig::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&contents)?)
    }

    fn write(&self, config: &CliConfig) -> Result<(), ConfigError> {
        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir)?;

        let contents = toml::to_string_pretty(config)?;
        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        file.persist(&self.path)?;
        tracing::debug!(path = %self.path.display(), "Config written");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    pub struct MemoryConfigStore {
        pub config: RefCell<CliConfig>,
        pub writes: RefCell<usize>,
    }

    impl MemoryConfigStore {
        pub fn with(config: CliConfig) -> Self {
            Self {
                config: RefCell::new(config),
                writes: RefCell::new(0),
            }
        }

        pub fn snapshot(&self) -> CliConfig {
            self.config.borrow().clone()
        }
    }

    impl ConfigStore for MemoryConfigStore {
        fn load(&self) -> Result<CliConfig, ConfigError> {
            Ok(self.config.borrow().clone())
        }

        fn write(&self, config: &CliConfig) -> Result<(), ConfigError> {
            *self.config.borrow_mut() = config.clone();
            *self.writes.borrow_mut() += 1;
            Ok(())
        }
    }

    pub fn profile(host: &str) -> ServerProfile {
        ServerProfile {
            host: host.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_server_becomes_active() {
        let mut config = CliConfig::default();
        config.add_server("local", profile("localhost"), false).unwrap();
        config.add_server("remote", profile("10.0.0.1"), false).unwrap();
        assert_eq!(config.active_server.as_deref(), Some("local"));
    }

    #[test]
    fn test_add_existing_alias_requires_overwrite() {
        let mut config = CliConfig::default();
        config.add_server("local", profile("localhost"), false).unwrap();
        let err = config
            .add_server("local", profile("example.com"), false)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ServerAlreadyExists(alias) if alias == "local"));

        config
            .add_server("local", profile("example.com"), true)
            .unwrap();
        assert_eq!(config.server("local").unwrap().host, "example.com");
    }

    #[test]
    fn test_remove_active_server_clears_selection() {
        let mut config = CliConfig::default();
        config.add_server("local", profile("localhost"), false).unwrap();
        config
            .use_server("local", Some("acme".to_string()), None)
            .unwrap();
        config.remove_server("local").unwrap();
        assert_eq!(config.active_server, None);
        assert_eq!(config.active_tenant, None);
        assert!(matches!(
            config.remove_server("local"),
            Err(ConfigError::ServerNotFound(_))
        ));
    }

    #[test]
    fn test_target_resolution() {
        let mut config = CliConfig::default();
        config.add_server("local", profile("localhost"), false).unwrap();
        config.add_server("remote", profile("example.com"), false).unwrap();
        config
            .use_server("local", Some("acme".to_string()), Some("prod".to_string()))
            .unwrap();

        let active = config.target(None).unwrap();
        assert_eq!(active.alias, "local");
        assert_eq!(active.tenant, "acme");
        assert_eq!(active.database, "prod");

        let explicit = config.target(Some("remote")).unwrap();
        assert_eq!(explicit.profile.host, "example.com");
        assert_eq!(explicit.tenant, DEFAULT_TENANT);
        assert_eq!(explicit.database, DEFAULT_DATABASE);

        assert!(matches!(
            config.target(Some("missing")),
            Err(ConfigError::ServerNotFound(_))
        ));
        assert!(matches!(
            CliConfig::default().target(None),
            Err(ConfigError::NoActiveServer)
        ));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("nested"));
        assert_eq!(store.load().unwrap(), CliConfig::default());

        let mut config = CliConfig::default();
        config
            .add_server(
                "cloud",
                ServerProfile {
                    host: "api.trychroma.com".to_string(),
                    port: 443,
                    secure: true,
                    auth: Some(AuthConfig {
                        auth_type: AuthType::XToken,
                        credential: "ck-123".to_string(),
                    }),
                    ..Default::default()
                },
                false,
            )
            .unwrap();
        store.write(&config).unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        assert!(contents.contains("active_server = \"cloud\""));
        assert!(contents.contains("type = \"x-token\""));
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn test_endpoint() {
        let mut server = profile("api.trychroma.com");
        assert_eq!(server.endpoint(), "http://api.trychroma.com:8000");
        server.secure = true;
        server.port = 443;
        assert_eq!(server.endpoint(), "https://api.trychroma.com:443");
    }
}
