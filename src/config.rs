use crate::core::aggregation::{MapDefaults, DEFAULT_CENTER, DEFAULT_ZOOM, ZOOMED_IN};
use crate::core::csv::CSV_EXCLUDED_COLUMNS;
use crate::models::LatLng;
use crate::services::images::{PLACEHOLDER_HEIGHT, PLACEHOLDER_WIDTH};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub tables: TableSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub map: MapSettings,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Hosted data service (REST + object storage share one base URL)
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    pub url: String,
    pub api_key: String,
    pub timeout_secs: Option<u64>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableSettings {
    #[serde(default = "default_properties_table")]
    pub properties: String,
    #[serde(default = "default_interactions_table")]
    pub crm_interactions: String,
    #[serde(default = "default_images_table")]
    pub property_images: String,
    #[serde(default = "default_access_table")]
    pub access_requests: String,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            properties: default_properties_table(),
            crm_interactions: default_interactions_table(),
            property_images: default_images_table(),
            access_requests: default_access_table(),
        }
    }
}

fn default_properties_table() -> String { "properties".to_string() }
fn default_interactions_table() -> String { "crm_interactions".to_string() }
fn default_images_table() -> String { "property_images".to_string() }
fn default_access_table() -> String { "access_requests".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_image_bucket")]
    pub image_bucket: String,
    #[serde(default = "default_avatar_bucket")]
    pub avatar_bucket: String,
    #[serde(default = "default_template_bucket")]
    pub template_bucket: String,
    #[serde(default = "default_template_key")]
    pub template_key: String,
    #[serde(default = "default_placeholder_width")]
    pub placeholder_width: u32,
    #[serde(default = "default_placeholder_height")]
    pub placeholder_height: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            image_bucket: default_image_bucket(),
            avatar_bucket: default_avatar_bucket(),
            template_bucket: default_template_bucket(),
            template_key: default_template_key(),
            placeholder_width: default_placeholder_width(),
            placeholder_height: default_placeholder_height(),
        }
    }
}

fn default_image_bucket() -> String { "property-images".to_string() }
fn default_avatar_bucket() -> String { "avatars".to_string() }
fn default_template_bucket() -> String { "templates".to_string() }
fn default_template_key() -> String { "report_template.pdf".to_string() }
fn default_placeholder_width() -> u32 { PLACEHOLDER_WIDTH }
fn default_placeholder_height() -> u32 { PLACEHOLDER_HEIGHT }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    #[serde(default = "default_audience")]
    pub audience: String,
}

fn default_audience() -> String { "authenticated".to_string() }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// L2 cache; the service runs with the in-process cache alone when unset
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapSettings {
    #[serde(default = "default_center_lat")]
    pub default_lat: f64,
    #[serde(default = "default_center_lng")]
    pub default_lng: f64,
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,
    #[serde(default = "default_zoomed_in")]
    pub zoomed_in: u8,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            default_lat: default_center_lat(),
            default_lng: default_center_lng(),
            default_zoom: default_zoom(),
            zoomed_in: default_zoomed_in(),
        }
    }
}

impl MapSettings {
    pub fn defaults(&self) -> MapDefaults {
        MapDefaults {
            default_center: LatLng {
                lat: self.default_lat,
                lng: self.default_lng,
            },
            default_zoom: self.default_zoom,
            zoomed_in: self.zoomed_in,
        }
    }
}

fn default_center_lat() -> f64 { DEFAULT_CENTER.lat }
fn default_center_lng() -> f64 { DEFAULT_CENTER.lng }
fn default_zoom() -> u8 { DEFAULT_ZOOM }
fn default_zoomed_in() -> u8 { ZOOMED_IN }

#[derive(Debug, Clone, Deserialize)]
pub struct ExportSettings {
    /// Columns left out of CSV exports unless the request asks for everything
    #[serde(default = "default_csv_excluded")]
    pub csv_excluded_columns: Vec<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            csv_excluded_columns: default_csv_excluded(),
        }
    }
}

fn default_csv_excluded() -> Vec<String> {
    CSV_EXCLUDED_COLUMNS.iter().map(|c| c.to_string()).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with ROOFSCOPE__)
    /// 5. The hosted backend's conventional variables (SUPABASE_URL etc.)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., ROOFSCOPE__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("ROOFSCOPE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = substitute_env_vars(settings)?;

        settings.try_deserialize::<Self>()?.validate()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("ROOFSCOPE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = substitute_env_vars(settings)?;

        settings.try_deserialize::<Self>()?.validate()
    }

    /// Reject settings the service must not start with
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "auth.jwt_secret must be set (SUPABASE_JWT_SECRET)".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Apply the backend's own environment variables when present
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("SUPABASE_URL", "gateway.url"),
        ("SUPABASE_SERVICE_KEY", "gateway.api_key"),
        ("SUPABASE_JWT_SECRET", "auth.jwt_secret"),
        ("REDIS_URL", "cache.redis_url"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables() {
        let tables = TableSettings::default();
        assert_eq!(tables.properties, "properties");
        assert_eq!(tables.crm_interactions, "crm_interactions");
        assert_eq!(tables.property_images, "property_images");
        assert_eq!(tables.access_requests, "access_requests");
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_map_defaults() {
        let defaults = MapSettings::default().defaults();
        assert_eq!(defaults.default_center, DEFAULT_CENTER);
        assert_eq!(defaults.zoomed_in, ZOOMED_IN);
    }

    #[test]
    fn test_minimal_config_deserializes() {
        let settings: Settings = Config::builder()
            .set_override("gateway.url", "https://db.example.test")
            .unwrap()
            .set_override("gateway.api_key", "key")
            .unwrap()
            .set_override("auth.jwt_secret", "secret")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.storage.template_key, "report_template.pdf");
        assert_eq!(settings.storage.avatar_bucket, "avatars");
        assert!(settings.cache.redis_url.is_none());
        assert_eq!(settings.export.csv_excluded_columns, vec!["latitude", "longitude"]);
        assert_eq!(settings.storage.placeholder_width, PLACEHOLDER_WIDTH);
    }

    #[test]
    fn test_blank_jwt_secret_rejected() {
        let settings: Settings = Config::builder()
            .set_override("gateway.url", "https://db.example.test")
            .unwrap()
            .set_override("gateway.api_key", "key")
            .unwrap()
            .set_override("auth.jwt_secret", "  ")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("jwt_secret"));
    }

    #[test]
    fn test_shipped_defaults_carry_no_jwt_secret() {
        let settings = Config::builder()
            .add_source(File::with_name("config/default"))
            .build()
            .unwrap();

        assert!(settings.get_string("auth.jwt_secret").is_err());
        assert_eq!(settings.get_string("auth.audience").unwrap(), "authenticated");
    }

    #[test]
    fn test_load_from_file_without_secret_fails() {
        let path = std::env::temp_dir().join(format!("roofscope-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[gateway]\nurl = \"https://db.example.test\"\napi_key = \"k\"\n\n[auth]\njwt_secret = \"\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path);
        std::fs::remove_file(&path).ok();

        assert!(settings.is_err());
    }

    #[test]
    fn test_load_from_file_applies_backend_env_overrides() {
        let path = std::env::temp_dir().join(format!("roofscope-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[gateway]\nurl = \"https://db.example.test\"\napi_key = \"k\"\n\n[auth]\njwt_secret = \"s\"\n",
        )
        .unwrap();

        std::env::set_var("REDIS_URL", "redis://cache.example.test:6379");
        let settings = Settings::load_from(&path);
        std::env::remove_var("REDIS_URL");
        std::fs::remove_file(&path).ok();

        assert_eq!(
            settings.unwrap().cache.redis_url.as_deref(),
            Some("redis://cache.example.test:6379")
        );
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("roofscope-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[server]\nport = 9090\n\n[gateway]\nurl = \"https://db.example.test\"\napi_key = \"k\"\n\n[auth]\njwt_secret = \"s\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path);
        std::fs::remove_file(&path).ok();

        let settings = settings.unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.gateway.url, "https://db.example.test");
        assert_eq!(settings.auth.audience, "authenticated");
    }
}
