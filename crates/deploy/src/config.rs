//! Deployment configuration.
//!
//! Everything that varies between deployments lives in [`DeployConfig`]. It is
//! built once at the entry point and handed down explicitly to the gateway
//! and to the recipe builders.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::DateTime;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{
    gateway::{Actor, CodeId},
    recipe::{
        LockingParams, MigrateParams, PresaleMerkleRootParams, PresaleVestingParams,
        PresaleWithdrawParams, RecipeContext, TokenParams,
    },
};

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "Cosmup.toml";

/// Prefix of environment variables overriding configuration keys.
///
/// Nested keys are separated by a double underscore, e.g.
/// `COSMUP_NETWORK__RPC_URL`.
pub const ENV_PREFIX: &str = "COSMUP_";

/// Unix timestamp in seconds.
///
/// Deserializes from either an integer or an RFC 3339 string such as
/// `"2022-06-13T04:00:00Z"`. Always serializes as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Parse unix seconds or an RFC 3339 date-time.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if let Ok(secs) = input.parse::<u64>() {
            return Ok(Self(secs));
        }

        let parsed = DateTime::parse_from_rfc3339(input)
            .with_context(|| format!("Invalid timestamp: {input}"))?;
        let secs = u64::try_from(parsed.timestamp())
            .with_context(|| format!("Timestamp before the unix epoch: {input}"))?;
        Ok(Self(secs))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimestampVisitor;

        impl de::Visitor<'_> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("unix seconds or an RFC 3339 date-time")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Timestamp, E> {
                Ok(Timestamp(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Timestamp, E> {
                u64::try_from(v)
                    .map(Timestamp)
                    .map_err(|_| E::custom("timestamp must not be negative"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Timestamp, E> {
                Timestamp::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(TimestampVisitor)
    }
}

/// Connection settings for the remote execution client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of the execution client.
    pub rpc_url: String,
    /// Chain the transactions are signed for.
    pub chain_id: String,
    /// Bech32 prefix of account addresses.
    pub address_prefix: String,
    /// Gas price attached to every transaction.
    pub gas_price: String,
    /// Address of the signing account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:26657".to_string(),
            chain_id: "uni-6".to_string(),
            address_prefix: "juno".to_string(),
            gas_price: "0.1ujunox".to_string(),
            sender: None,
            request_timeout_secs: 30,
        }
    }
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Code ids of contracts already stored on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeIds {
    pub presale: CodeId,
    pub vesting: CodeId,
    pub locking: CodeId,
    pub cw20: CodeId,
}

impl Default for CodeIds {
    fn default() -> Self {
        Self {
            presale: CodeId::new(277),
            vesting: CodeId::new(278),
            locking: CodeId::new(279),
            cw20: CodeId::new(280),
        }
    }
}

impl CodeIds {
    pub fn all(&self) -> [CodeId; 4] {
        [self.presale, self.vesting, self.locking, self.cw20]
    }
}

/// Location of the compiled contract artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
    pub presale: String,
    pub vesting: String,
    pub locking: String,
    pub cw20: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            presale: "presale.wasm".to_string(),
            vesting: "vesting.wasm".to_string(),
            locking: "locking.wasm".to_string(),
            cw20: "cw20_base.wasm".to_string(),
        }
    }
}

impl ArtifactsConfig {
    pub fn presale_path(&self) -> PathBuf {
        self.dir.join(&self.presale)
    }

    pub fn vesting_path(&self) -> PathBuf {
        self.dir.join(&self.vesting)
    }

    pub fn locking_path(&self) -> PathBuf {
        self.dir.join(&self.locking)
    }

    pub fn cw20_path(&self) -> PathBuf {
        self.dir.join(&self.cw20)
    }
}

/// Complete configuration of a deployment run.
///
/// Scalar fields come first so that the TOML rendering keeps them above the
/// tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Admin set on instantiated contracts. Without one they cannot be migrated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<String>,
    /// Directory receiving run reports.
    pub outdata: PathBuf,

    pub network: NetworkConfig,
    pub code_ids: CodeIds,
    pub artifacts: ArtifactsConfig,

    pub presale_vesting: PresaleVestingParams,
    pub locking: LockingParams,
    pub token: TokenParams,
    pub presale_withdraw: PresaleWithdrawParams,
    pub presale_merkle_root: PresaleMerkleRootParams,
    pub migrate: MigrateParams,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            admin: None,
            outdata: PathBuf::from("cosmup-data"),
            network: NetworkConfig::default(),
            code_ids: CodeIds::default(),
            artifacts: ArtifactsConfig::default(),
            presale_vesting: PresaleVestingParams::default(),
            locking: LockingParams::default(),
            token: TokenParams::default(),
            presale_withdraw: PresaleWithdrawParams::default(),
            presale_merkle_root: PresaleMerkleRootParams::default(),
            migrate: MigrateParams::default(),
        }
    }
}

impl DeployConfig {
    /// Load the configuration.
    ///
    /// Layers, lowest priority first: built-in defaults, the TOML file,
    /// `COSMUP_*` environment variables. Without an explicit path the file
    /// `Cosmup.toml` in the working directory is used when present. A
    /// directory path resolves to the `Cosmup.toml` inside it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(DeployConfig::default()));

        match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!(
                        "Configuration file or directory not found: {}",
                        path.display()
                    );
                }
                let config_path = if path.is_dir() {
                    path.join(CONFIG_FILENAME)
                } else {
                    path.to_path_buf()
                };
                figment = figment.merge(Toml::file(config_path));
            }
            None => figment = figment.merge(Toml::file(CONFIG_FILENAME)),
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to load deployment configuration")?;

        tracing::debug!(
            rpc_url = %config.network.rpc_url,
            chain_id = %config.network.chain_id,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// The signing account, which must be configured.
    pub fn actor(&self) -> Result<Actor> {
        self.network
            .sender
            .as_deref()
            .filter(|sender| !sender.is_empty())
            .map(Actor::new)
            .context("network.sender must be set (or COSMUP_NETWORK__SENDER)")
    }

    /// Everything a recipe builder needs besides its own parameters.
    pub fn recipe_context(&self, actor: Actor) -> RecipeContext {
        RecipeContext {
            actor,
            admin: self.admin.clone(),
            code_ids: self.code_ids.clone(),
            artifacts: self.artifacts.clone(),
        }
    }

    /// Where the report of a recipe run is stored.
    pub fn report_path(&self, recipe: &str) -> PathBuf {
        self.outdata.join(format!("{recipe}.report.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_timestamp_parse() {
        assert_eq!(
            Timestamp::parse("2022-06-13T04:00:00Z").expect("rfc3339"),
            Timestamp::from_secs(1655092800)
        );
        assert_eq!(
            Timestamp::parse("2022-06-09T05:30:00+02:00").expect("offset"),
            Timestamp::from_secs(1654745400)
        );
        assert_eq!(
            Timestamp::parse("1654830000").expect("secs"),
            Timestamp::from_secs(1654830000)
        );
        assert!(Timestamp::parse("next tuesday").is_err());
    }

    #[test]
    fn test_actor_required() {
        let mut config = DeployConfig::default();
        assert!(config.actor().is_err());

        config.network.sender = Some(String::new());
        assert!(config.actor().is_err());

        config.network.sender = Some("juno1deployer".to_string());
        assert_eq!(config.actor().expect("actor").as_str(), "juno1deployer");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new("cosmup-test").expect("Failed to create temp dir");
        let path = temp_dir.path().join(CONFIG_FILENAME);

        let mut config = DeployConfig::default();
        config.network.sender = Some("juno1deployer".to_string());
        config.admin = Some("juno1admin".to_string());
        config.code_ids.cw20 = CodeId::new(900);

        config.save_to_file(&path).expect("Failed to save config");

        // Loading the directory resolves the default file name.
        let loaded = DeployConfig::load(Some(temp_dir.path())).expect("Failed to load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new("cosmup-test").expect("Failed to create temp dir");
        let path = temp_dir.path().join("partial.toml");
        std::fs::write(
            &path,
            r#"
            [network]
            rpc_url = "https://rpc.uni.junonetwork.io"

            [presale_vesting]
            vesting_start_time = "2022-06-13T04:00:00Z"
            "#,
        )
        .expect("write");

        let loaded = DeployConfig::load(Some(&path)).expect("load");
        assert_eq!(loaded.network.rpc_url, "https://rpc.uni.junonetwork.io");
        assert_eq!(loaded.network.gas_price, "0.1ujunox");
        assert_eq!(loaded.code_ids, CodeIds::default());
        assert_eq!(
            loaded.presale_vesting.vesting_start_time,
            Timestamp::from_secs(1655092800)
        );
    }

    #[test]
    fn test_load_missing_path_fails() {
        let temp_dir = TempDir::new("cosmup-test").expect("Failed to create temp dir");
        let missing = temp_dir.path().join("nope.toml");
        assert!(DeployConfig::load(Some(&missing)).is_err());
    }
}
