use anyhow::Context;
use chrono::FixedOffset;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Socket.io endpoint announcing new measurement batches, relative to `base_url`.
    #[serde(default = "default_push_path")]
    pub push_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_reconnect_secs")]
    pub reconnect_secs: u64,
    /// Offset used to display backend timestamps, in minutes east of UTC.
    #[serde(default = "default_display_offset")]
    pub display_offset_minutes: i32,
    /// Token for the public views, when the backend requires one.
    #[serde(default)]
    pub service_token: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            push_path: default_push_path(),
            timeout_secs: default_timeout_secs(),
            reconnect_secs: default_reconnect_secs(),
            display_offset_minutes: default_display_offset(),
            service_token: None,
        }
    }
}

impl BackendSettings {
    pub fn display_offset(&self) -> anyhow::Result<FixedOffset> {
        FixedOffset::east_opt(self.display_offset_minutes * 60).with_context(|| {
            format!("invalid display offset of {} minutes", self.display_offset_minutes)
        })
    }

    pub fn push_url(&self) -> String {
        join_url(&self.base_url, &self.push_path)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Anonymous viewers untouched for this long are closed.
    #[serde(default = "default_viewer_idle_secs")]
    pub viewer_idle_secs: u64,
    #[serde(default = "default_viewer_sweep_secs")]
    pub viewer_sweep_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            viewer_idle_secs: default_viewer_idle_secs(),
            viewer_sweep_secs: default_viewer_sweep_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3006".to_string()
}

fn default_push_path() -> String {
    "/socket.io/".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_reconnect_secs() -> u64 {
    5
}

fn default_display_offset() -> i32 {
    -5 * 60
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_viewer_idle_secs() -> u64 {
    30 * 60
}

fn default_viewer_sweep_secs() -> u64 {
    60
}

/// Load `config/observatorio.*` (optional) overlaid with `OBSERVATORIO__*` variables.
pub fn load_config() -> anyhow::Result<DashboardConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/observatorio").required(false))
        .add_source(config::Environment::with_prefix("OBSERVATORIO").separator("__"))
        .build()
        .context("failed to read dashboard configuration")?;

    Ok(settings.try_deserialize()?)
}

const DEFAULT_USER_PICTURE: &str = "USUARIO_ICONO.png";

/// Builds public URLs for images served by the backend.
#[derive(Debug, Clone)]
pub struct AssetUrls {
    root: String,
}

impl AssetUrls {
    pub fn new(base_url: &str) -> Self {
        Self {
            root: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn variable_icon(&self, file: &str) -> String {
        self.image("icons_estaciones", file)
    }

    pub fn microcuenca_picture(&self, file: &str) -> String {
        self.image("microcuencas", file)
    }

    pub fn station_picture(&self, file: &str) -> String {
        self.image("estaciones", file)
    }

    /// Profile picture, falling back to the default user icon.
    pub fn user_picture(&self, file: Option<&str>) -> String {
        self.image("users", file.filter(|f| !f.is_empty()).unwrap_or(DEFAULT_USER_PICTURE))
    }

    fn image(&self, folder: &str, file: &str) -> String {
        if file.starts_with("http://") || file.starts_with("https://") {
            return file.to_string();
        }
        format!("{}/images/{}/{}", self.root, folder, file.trim_start_matches('/'))
    }
}

pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
