use std::{env, fs, net::SocketAddr, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub recording: Recording,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    /// SQLite database file holding the broadcast catalog
    #[serde(default = "default_database")]
    pub database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    /// Directory completed and in-progress recordings are written to
    #[serde(default = "default_recording_dir")]
    pub dir: String,
    /// Container extension of the broadcaster's fragment encoding; the byte
    /// stream itself is opaque to the server
    #[serde(default = "default_recording_ext")]
    pub ext: String,
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("7788"))
    ))
    .expect("invalid listen address")
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: Default::default(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

impl Default for Recording {
    fn default() -> Self {
        Self {
            dir: default_recording_dir(),
            ext: default_recording_ext(),
        }
    }
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

fn default_database() -> String {
    String::from("siaran.db")
}

fn default_recording_dir() -> String {
    String::from("recordings")
}

fn default_recording_ext() -> String {
    String::from("webm")
}

impl Config {
    pub fn parse(path: Option<String>) -> Self {
        let result = fs::read_to_string(path.unwrap_or(String::from("siaran.toml")))
            .or(fs::read_to_string("/etc/siaran/siaran.toml"))
            .unwrap_or("".to_string());
        let cfg: Self = toml::from_str(result.as_str()).expect("config parse error");
        match cfg.validate() {
            Ok(_) => cfg,
            Err(err) => panic!("config validate [{}]", err),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.recording.dir.trim().is_empty() {
            anyhow::bail!("recording.dir cannot be empty");
        }
        if self.recording.ext.trim().is_empty() || self.recording.ext.contains(&['/', '.'][..]) {
            anyhow::bail!("recording.ext must be a bare extension");
        }
        Ok(())
    }
}
