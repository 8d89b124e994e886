//! Configuration types for the S3 client
//!
//! [`S3Config`] is what callers fill in; [`ResolvedConfig`] is what the
//! resolver hands back once provider, region, TLS and addressing style are
//! all concrete. Only [`crate::resolver::resolve`] creates a `ResolvedConfig`.

use crate::error::{S3Error, S3Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Region used when none is given, and the only region MinIO accepts
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default DigitalOcean Spaces region
pub const DEFAULT_DO_REGION: &str = "nyc3";

/// S3-compatible storage provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Minio,
    DigitalOcean,
    Custom,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Aws,
        Provider::Minio,
        Provider::DigitalOcean,
        Provider::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Minio => "minio",
            Provider::DigitalOcean => "digitalocean",
            Provider::Custom => "custom",
        }
    }

    /// MinIO and custom endpoints only verify path-style signatures
    pub fn requires_path_style(&self) -> bool {
        matches!(self, Provider::Minio | Provider::Custom)
    }

    /// Parse an optional provider; an empty string means auto-detect
    pub fn parse_optional(value: &str) -> S3Result<Option<Provider>> {
        let value = value.trim();
        if value.is_empty() {
            Ok(None)
        } else {
            value.parse().map(Some)
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = S3Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                S3Error::InvalidConfig(format!(
                    "invalid provider: {}. Valid providers are: aws, minio, digitalocean, custom",
                    s
                ))
            })
    }
}

/// S3 client configuration as supplied by the caller
pub struct S3Config {
    /// Storage provider; `None` detects it from the endpoint
    pub provider: Option<Provider>,

    /// Region (e.g. "us-east-1"); defaulted by the resolver when empty
    pub region: String,

    pub access_key_id: String,

    pub secret_access_key: SecretString,

    /// Endpoint URL; empty for AWS S3
    pub endpoint: String,

    pub bucket_name: String,

    pub use_ssl: bool,

    /// Path-style (`true`) or virtual-hosted-style (`false`) addressing;
    /// `None` lets the resolver decide
    pub use_path_style: Option<bool>,
}

impl S3Config {
    /// Configuration with an explicit provider
    ///
    /// ```
    /// use s3bridge::{Provider, S3Config};
    ///
    /// let config = S3Config::new(
    ///     Some(Provider::Minio),
    ///     "",
    ///     "minioadmin",
    ///     "minioadmin",
    ///     "http://localhost:9000",
    ///     "uploads",
    /// );
    /// assert_eq!(config.use_path_style, None);
    /// ```
    pub fn new(
        provider: Option<Provider>,
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        endpoint: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            region: region.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            endpoint: endpoint.into(),
            bucket_name: bucket_name.into(),
            use_ssl: true,
            use_path_style: None,
        }
    }

    /// Configuration whose provider is detected from the endpoint
    pub fn auto(
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        endpoint: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self::new(
            None,
            region,
            access_key_id,
            secret_access_key,
            endpoint,
            bucket_name,
        )
    }

    /// MinIO over plain HTTP
    pub fn minio(
        endpoint: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> Self {
        let mut config = Self::new(
            Some(Provider::Minio),
            DEFAULT_REGION,
            access_key_id,
            secret_access_key,
            endpoint,
            bucket_name,
        );
        config.use_ssl = false;
        config.use_path_style = Some(true);
        config
    }

    /// MinIO over TLS
    pub fn minio_tls(
        endpoint: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> Self {
        let mut config = Self::minio(endpoint, access_key_id, secret_access_key, bucket_name);
        config.use_ssl = true;
        config
    }

    /// DigitalOcean Spaces; the endpoint is derived from the region
    pub fn digital_ocean(
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        space_name: impl Into<String>,
    ) -> Self {
        let region = region.into();
        let endpoint = format!("https://{}.digitaloceanspaces.com", region);
        let mut config = Self::new(
            Some(Provider::DigitalOcean),
            region,
            access_key_id,
            secret_access_key,
            endpoint,
            space_name,
        );
        config.use_path_style = Some(false);
        config
    }

    /// AWS S3 with virtual-hosted addressing
    pub fn aws(
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> Self {
        let mut config = Self::new(
            Some(Provider::Aws),
            region,
            access_key_id,
            secret_access_key,
            "",
            bucket_name,
        );
        config.use_path_style = Some(false);
        config
    }

    /// Start a builder for the given bucket
    pub fn builder(bucket_name: impl Into<String>) -> S3ConfigBuilder {
        S3ConfigBuilder::new(bucket_name)
    }

    /// Load configuration from process environment variables
    ///
    /// Recognized variables: `S3_PROVIDER`, `S3_REGION`, `S3_ACCESS_KEY_ID`
    /// (or `AWS_ACCESS_KEY_ID`), `S3_SECRET_ACCESS_KEY` (or
    /// `AWS_SECRET_ACCESS_KEY`), `S3_ENDPOINT`, `S3_BUCKET_NAME`, `S3_USE_SSL`
    /// and `S3_USE_PATH_STYLE`.
    pub fn from_env() -> S3Result<Self> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Same as [`S3Config::from_env`] with a custom variable lookup
    pub fn from_env_with<F>(lookup: F) -> S3Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |primary: &str, fallback: Option<&str>| {
            lookup(primary).or_else(|| fallback.and_then(&lookup))
        };

        let provider = match var("S3_PROVIDER", None) {
            Some(value) => Provider::parse_optional(&value)?,
            None => None,
        };

        let mut config = Self::new(
            provider,
            var("S3_REGION", None).unwrap_or_default(),
            var("S3_ACCESS_KEY_ID", Some("AWS_ACCESS_KEY_ID")).unwrap_or_default(),
            var("S3_SECRET_ACCESS_KEY", Some("AWS_SECRET_ACCESS_KEY")).unwrap_or_default(),
            var("S3_ENDPOINT", None).unwrap_or_default(),
            var("S3_BUCKET_NAME", None).unwrap_or_default(),
        );

        if let Some(value) = var("S3_USE_SSL", None) {
            config.use_ssl = parse_bool("S3_USE_SSL", &value)?;
        }
        if let Some(value) = var("S3_USE_PATH_STYLE", None) {
            config.use_path_style = Some(parse_bool("S3_USE_PATH_STYLE", &value)?);
        }

        Ok(config)
    }

    /// Parse a flat TOML table using the field names of this struct
    ///
    /// ```
    /// use s3bridge::{Provider, S3Config};
    ///
    /// let config = S3Config::from_toml_str(r#"
    ///     provider = "minio"
    ///     endpoint = "http://localhost:9000"
    ///     bucket_name = "uploads"
    ///     access_key_id = "minioadmin"
    ///     secret_access_key = "minioadmin"
    /// "#).unwrap();
    /// assert_eq!(config.provider, Some(Provider::Minio));
    /// ```
    pub fn from_toml_str(content: &str) -> S3Result<Self> {
        let file: FileConfig = toml::from_str(content)
            .map_err(|e| S3Error::InvalidConfig(format!("failed to parse TOML config: {}", e)))?;
        file.into_config()
    }

    /// Read and parse a TOML configuration file
    pub fn from_toml_file(path: impl AsRef<Path>) -> S3Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            S3Error::InvalidConfig(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self::new(None, "", "", "", "", "")
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("provider", &self.provider)
            .field("region", &self.region)
            .field("access_key_id", &mask_key(&self.access_key_id))
            .field("secret_access_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("bucket_name", &self.bucket_name)
            .field("use_ssl", &self.use_ssl)
            .field("use_path_style", &self.use_path_style)
            .finish()
    }
}

/// On-disk shape of [`S3Config`]
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    provider: Option<String>,
    region: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    endpoint: Option<String>,
    bucket_name: Option<String>,
    use_ssl: Option<bool>,
    use_path_style: Option<bool>,
}

impl FileConfig {
    fn into_config(self) -> S3Result<S3Config> {
        let provider = match self.provider.as_deref() {
            Some(value) => Provider::parse_optional(value)?,
            None => None,
        };
        let mut config = S3Config::new(
            provider,
            self.region.unwrap_or_default(),
            self.access_key_id.unwrap_or_default(),
            self.secret_access_key.unwrap_or_default(),
            self.endpoint.unwrap_or_default(),
            self.bucket_name.unwrap_or_default(),
        );
        if let Some(use_ssl) = self.use_ssl {
            config.use_ssl = use_ssl;
        }
        config.use_path_style = self.use_path_style;
        Ok(config)
    }
}

fn parse_bool(name: &str, value: &str) -> S3Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(S3Error::InvalidConfig(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

/// Builder for S3Config
pub struct S3ConfigBuilder {
    config: S3Config,
}

impl S3ConfigBuilder {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        let mut config = S3Config::default();
        config.bucket_name = bucket_name.into();
        Self { config }
    }

    pub fn provider(mut self, provider: Provider) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = region.into();
        self
    }

    /// Set custom endpoint (MinIO, Spaces, other S3-compatible services)
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.config.access_key_id = access_key_id.into();
        self.config.secret_access_key = SecretString::from(secret_access_key.into());
        self
    }

    pub fn use_ssl(mut self, use_ssl: bool) -> Self {
        self.config.use_ssl = use_ssl;
        self
    }

    /// Request path-style (`true`) or virtual-hosted (`false`) addressing
    pub fn use_path_style(mut self, path_style: bool) -> Self {
        self.config.use_path_style = Some(path_style);
        self
    }

    pub fn build(self) -> S3Config {
        self.config
    }
}

/// Fully resolved configuration; produced by [`crate::resolver::resolve`]
pub struct ResolvedConfig {
    pub(crate) provider: Provider,
    pub(crate) region: String,
    pub(crate) access_key_id: String,
    pub(crate) secret_access_key: SecretString,
    pub(crate) endpoint: String,
    pub(crate) bucket_name: String,
    pub(crate) use_ssl: bool,
    pub(crate) use_path_style: bool,
}

impl ResolvedConfig {
    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &SecretString {
        &self.secret_access_key
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn use_ssl(&self) -> bool {
        self.use_ssl
    }

    pub fn use_path_style(&self) -> bool {
        self.use_path_style
    }

    /// URL template objects are addressed under, e.g.
    /// `http://localhost:9000/uploads/{object-key}`
    pub fn expected_url_format(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        let endpoint = if self.endpoint.is_empty() {
            format!("https://s3.{}.amazonaws.com", self.region)
        } else if self.endpoint.contains("://") {
            self.endpoint.trim_end_matches('/').to_string()
        } else {
            format!("{}://{}", scheme, self.endpoint.trim_end_matches('/'))
        };

        if self.use_path_style {
            return format!("{}/{}/{{object-key}}", endpoint, self.bucket_name);
        }

        match url::Url::parse(&endpoint) {
            Ok(parsed) => {
                let host = parsed.host_str().unwrap_or_default();
                let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();
                format!(
                    "{}://{}.{}{}/{{object-key}}",
                    parsed.scheme(),
                    self.bucket_name,
                    host,
                    port
                )
            }
            Err(_) => format!("{}/{{object-key}}", endpoint),
        }
    }

    /// Human-readable dump with credentials masked
    pub fn report(&self) -> ConfigReport<'_> {
        ConfigReport { config: self }
    }

    /// Log the non-secret parts of the configuration
    pub fn log_summary(&self) {
        tracing::info!(
            provider = %self.provider,
            region = %self.region,
            endpoint = %self.endpoint,
            bucket = %self.bucket_name,
            use_ssl = self.use_ssl,
            use_path_style = self.use_path_style,
            "S3 configuration resolved"
        );
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("provider", &self.provider)
            .field("region", &self.region)
            .field("access_key_id", &mask_key(&self.access_key_id))
            .field("secret_access_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("bucket_name", &self.bucket_name)
            .field("use_ssl", &self.use_ssl)
            .field("use_path_style", &self.use_path_style)
            .finish()
    }
}

/// Display adapter returned by [`ResolvedConfig::report`]
pub struct ConfigReport<'a> {
    config: &'a ResolvedConfig,
}

impl fmt::Display for ConfigReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.config;
        writeln!(f, "=== S3 Configuration ===")?;
        writeln!(f, "Provider: {}", c.provider)?;
        writeln!(f, "Region: {}", c.region)?;
        writeln!(f, "Endpoint: {}", c.endpoint)?;
        writeln!(f, "BucketName: {}", c.bucket_name)?;
        writeln!(f, "UseSSL: {}", c.use_ssl)?;
        if c.provider.requires_path_style() {
            writeln!(f, "UsePathStyle: {} (forced for {})", c.use_path_style, c.provider)?;
        } else {
            writeln!(f, "UsePathStyle: {}", c.use_path_style)?;
        }
        writeln!(f, "AccessKeyID: {}", mask_key(&c.access_key_id))?;
        writeln!(
            f,
            "SecretAccessKey: {}",
            mask_key(c.secret_access_key.expose_secret())
        )?;
        writeln!(f, "Expected URL format: {}", c.expected_url_format())?;
        write!(f, "========================")
    }
}

/// Keep the first and last four characters of a key, mask the middle
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    // head and tail overlap at eight characters or fewer
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}
