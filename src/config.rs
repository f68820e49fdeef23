use std::{
    fs::{create_dir_all, File},
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{
    ca::CaMaterial,
    error::Result,
    issuer::NativeSigner,
    key::DEFAULT_KEY_LENGTH,
    script::{ScriptSigner, DEFAULT_INTERPRETER},
    signer::{CertSigner, DEFAULT_DAYS},
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub ca: CaConfig,
    #[serde(default)]
    pub defaults: IssueDefaults,
    #[serde(default)]
    pub script: ScriptConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IssueDefaults {
    pub key_len: u32,
    pub days: i64,
    pub subject: String,
}

impl Default for IssueDefaults {
    fn default() -> Self {
        Self {
            key_len: DEFAULT_KEY_LENGTH,
            days: DEFAULT_DAYS,
            subject: "/O=org".into(),
        }
    }
}

/// Setting `path` switches signing over to the script.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScriptConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Empty runs the script directly.
    pub interpreter: String,
    pub timeout_secs: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            path: None,
            interpreter: DEFAULT_INTERPRETER.into(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    /// Builds the configured signer. For the native signer this loads the CA
    /// material, which happens once for the life of the signer.
    pub fn signer(&self) -> Result<Box<dyn CertSigner>> {
        if let Some(script) = &self.script.path {
            let interpreter = Some(self.script.interpreter.trim())
                .filter(|interpreter| !interpreter.is_empty())
                .map(PathBuf::from);
            let signer = ScriptSigner::new(script)
                .with_interpreter(interpreter)
                .with_timeout(Duration::from_secs(self.script.timeout_secs));
            return Ok(Box::new(signer));
        }

        let ca = CaMaterial::load(&self.ca.key_path, &self.ca.cert_path)?;
        Ok(Box::new(NativeSigner::new(Arc::new(ca))))
    }
}

pub fn create_default_config(dirs: &ProjectDirs) -> Config {
    let ca_dir = dirs.data_dir().join("ca");
    Config {
        ca: CaConfig {
            cert_path: ca_dir.join("cert.pem"),
            key_path: ca_dir.join("key.pem"),
        },
        defaults: IssueDefaults::default(),
        script: ScriptConfig::default(),
    }
}

pub fn parse_config(data: &str) -> anyhow::Result<Config> {
    Ok(toml::from_str::<Config>(data)?)
}

/// Reads `config.toml` from the platform config dir, writing the defaults
/// there first if it doesn't exist yet.
pub fn read_config(app: &ProjectDirs) -> anyhow::Result<Config> {
    let config_path = app.config_dir().join("config.toml");
    if config_path.exists() {
        return read_config_file(&config_path);
    }

    let config = create_default_config(app);
    create_dir_all(app.config_dir()).context("Can't create config dir")?;
    File::create(&config_path)
        .with_context(|| format!("Can't create file {config_path:?}"))?
        .write_all(toml::to_string_pretty(&config)?.as_bytes())
        .with_context(|| format!("Can't write file {config_path:?}"))?;
    tracing::info!(path = ?config_path, "wrote default config");
    Ok(config)
}

pub fn read_config_file(path: &Path) -> anyhow::Result<Config> {
    anyhow::ensure!(path.exists(), "can't find file {path:?}");
    let mut str = String::new();
    File::open(path)
        .with_context(|| format!("can't open {path:?}"))?
        .read_to_string(&mut str)
        .with_context(|| format!("Can't read {path:?}"))?;
    parse_config(&str).with_context(|| format!("Can't parse file {path:?}"))
}
