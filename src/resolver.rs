//! Provider-aware configuration resolution
//!
//! Turns a caller's [`S3Config`] into a [`ResolvedConfig`] in which provider,
//! region, TLS flag and addressing style are concrete and mutually
//! consistent. The rules run in a fixed order:
//!
//! 1. provider: explicit value, else detected from the endpoint
//! 2. region default per provider
//! 3. MinIO region forced to [`DEFAULT_REGION`]
//! 4. TLS flag taken from the endpoint scheme (MinIO and custom only)
//! 5. addressing style defaulted per provider, then forced to path-style for
//!    MinIO and custom
//! 6. MinIO endpoint check
//!
//! Endpoint-based detection is a substring heuristic. A custom domain that
//! happens to contain `minio` is classified as MinIO, so set the provider
//! explicitly whenever it is known.

use crate::config::{Provider, ResolvedConfig, S3Config, DEFAULT_DO_REGION, DEFAULT_REGION};
use crate::error::{S3Error, S3Result};
use tracing::{debug, warn};

/// Guess the provider from an endpoint string
pub fn detect_provider(endpoint: &str) -> Provider {
    if endpoint.is_empty() {
        return Provider::Aws;
    }

    let endpoint = endpoint.to_ascii_lowercase();

    if endpoint.contains("digitaloceanspaces.com") {
        return Provider::DigitalOcean;
    }

    if endpoint.contains("localhost")
        || endpoint.contains("127.0.0.1")
        || endpoint.contains(":9000")
        || endpoint.contains("minio")
    {
        return Provider::Minio;
    }

    Provider::Custom
}

fn default_region(provider: Provider) -> &'static str {
    match provider {
        Provider::DigitalOcean => DEFAULT_DO_REGION,
        // the signer needs a region even where the provider ignores it
        Provider::Aws | Provider::Minio | Provider::Custom => DEFAULT_REGION,
    }
}

fn scheme_tls(endpoint: &str) -> Option<bool> {
    let lower = endpoint.to_ascii_lowercase();
    if lower.starts_with("http://") {
        Some(false)
    } else if lower.starts_with("https://") {
        Some(true)
    } else {
        None
    }
}

/// Resolve a configuration for use by the client
///
/// # Example
///
/// ```
/// use s3bridge::{resolve, Provider, S3Config};
///
/// let mut config = S3Config::new(
///     Some(Provider::Minio),
///     "eu-west-1",
///     "minioadmin",
///     "minioadmin",
///     "http://localhost:9000",
///     "uploads",
/// );
/// config.use_path_style = Some(false);
///
/// let resolved = resolve(config).unwrap();
/// assert_eq!(resolved.region(), "us-east-1");
/// assert!(!resolved.use_ssl());
/// assert!(resolved.use_path_style());
/// ```
pub fn resolve(config: S3Config) -> S3Result<ResolvedConfig> {
    let S3Config {
        provider,
        mut region,
        access_key_id,
        secret_access_key,
        endpoint,
        bucket_name,
        mut use_ssl,
        use_path_style,
    } = config;

    let provider = match provider {
        Some(explicit) => explicit,
        None => {
            let detected = detect_provider(&endpoint);
            debug!(
                endpoint = %endpoint,
                provider = %detected,
                "Detected S3 provider from endpoint"
            );
            detected
        }
    };

    if region.is_empty() {
        region = default_region(provider).to_string();
    }

    if provider == Provider::Minio && region != DEFAULT_REGION {
        debug!(
            requested = %region,
            "MinIO signature validation requires {}; overriding region", DEFAULT_REGION
        );
        region = DEFAULT_REGION.to_string();
    }

    if provider.requires_path_style() {
        if let Some(tls) = scheme_tls(&endpoint) {
            use_ssl = tls;
        }
    }

    let mut path_style = use_path_style.unwrap_or(provider.requires_path_style());
    if provider.requires_path_style() {
        path_style = true;
    }

    if provider == Provider::Minio {
        if endpoint.is_empty() {
            return Err(S3Error::InvalidConfig(
                "MinIO requires an endpoint to be specified".to_string(),
            ));
        }
        if use_path_style == Some(false) {
            warn!("MinIO must use path-style addressing; ignoring use_path_style = false");
        }
    }

    Ok(ResolvedConfig {
        provider,
        region,
        access_key_id,
        secret_access_key,
        endpoint,
        bucket_name,
        use_ssl,
        use_path_style: path_style,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: Option<Provider>, region: &str, endpoint: &str) -> S3Config {
        S3Config::new(provider, region, "key", "secret", endpoint, "bucket")
    }

    #[test]
    fn test_detect_provider() {
        assert_eq!(detect_provider(""), Provider::Aws);
        assert_eq!(
            detect_provider("https://nyc3.digitaloceanspaces.com"),
            Provider::DigitalOcean
        );
        assert_eq!(detect_provider("http://localhost:9000"), Provider::Minio);
        assert_eq!(detect_provider("http://127.0.0.1:8080"), Provider::Minio);
        assert_eq!(detect_provider("https://storage.internal:9000"), Provider::Minio);
        assert_eq!(detect_provider("https://MINIO.example.com"), Provider::Minio);
        assert_eq!(
            detect_provider("https://s3.us-west-000.backblazeb2.com"),
            Provider::Custom
        );
    }

    #[test]
    fn test_explicit_provider_wins_over_detection() {
        let resolved =
            resolve(config(Some(Provider::Custom), "", "http://localhost:9000")).unwrap();
        assert_eq!(resolved.provider(), Provider::Custom);
        assert_eq!(resolved.region(), DEFAULT_REGION);
    }

    #[test]
    fn test_minio_scenario() {
        let resolved =
            resolve(config(Some(Provider::Minio), "eu-west-1", "http://localhost:9000")).unwrap();
        assert_eq!(resolved.provider(), Provider::Minio);
        assert_eq!(resolved.region(), "us-east-1");
        assert!(!resolved.use_ssl());
        assert!(resolved.use_path_style());
    }

    #[test]
    fn test_digital_ocean_scenario() {
        let resolved = resolve(config(None, "", "https://nyc3.digitaloceanspaces.com")).unwrap();
        assert_eq!(resolved.provider(), Provider::DigitalOcean);
        assert_eq!(resolved.region(), "nyc3");
        assert!(!resolved.use_path_style());
        assert!(resolved.use_ssl());
    }

    #[test]
    fn test_detected_minio_defaults() {
        for endpoint in [
            "http://minio:9000",
            "https://minio.corp.example",
            "minio.local",
        ] {
            let resolved = resolve(config(None, "", endpoint)).unwrap();
            assert_eq!(resolved.provider(), Provider::Minio, "{}", endpoint);
            assert!(resolved.use_path_style());
            assert_eq!(resolved.region(), DEFAULT_REGION);
        }
    }

    #[test]
    fn test_minio_region_always_forced() {
        for region in ["", "us-east-1", "eu-central-1", "ap-south-1"] {
            let resolved =
                resolve(config(Some(Provider::Minio), region, "http://minio:9000")).unwrap();
            assert_eq!(resolved.region(), DEFAULT_REGION);
        }
    }

    #[test]
    fn test_aws_path_style_respected() {
        let mut cfg = config(Some(Provider::Aws), "us-west-2", "");
        cfg.use_path_style = Some(true);
        let resolved = resolve(cfg).unwrap();
        assert!(resolved.use_path_style());
        assert_eq!(resolved.region(), "us-west-2");

        let resolved = resolve(config(Some(Provider::Aws), "", "")).unwrap();
        assert!(!resolved.use_path_style());
        assert_eq!(resolved.region(), DEFAULT_REGION);
    }

    #[test]
    fn test_aws_and_do_keep_tls_flag() {
        let mut cfg = config(
            Some(Provider::DigitalOcean),
            "",
            "http://nyc3.digitaloceanspaces.com",
        );
        cfg.use_ssl = true;
        assert!(resolve(cfg).unwrap().use_ssl());

        let mut cfg = config(Some(Provider::Aws), "", "");
        cfg.use_ssl = false;
        assert!(!resolve(cfg).unwrap().use_ssl());
    }

    #[test]
    fn test_custom_tls_from_scheme() {
        let mut cfg = config(Some(Provider::Custom), "", "HTTP://storage.example.com");
        cfg.use_ssl = true;
        assert!(!resolve(cfg).unwrap().use_ssl());

        let mut cfg = config(Some(Provider::Custom), "", "https://storage.example.com");
        cfg.use_ssl = false;
        assert!(resolve(cfg).unwrap().use_ssl());

        // no scheme: caller's flag stands
        let mut cfg = config(Some(Provider::Custom), "", "storage.example.com");
        cfg.use_ssl = false;
        assert!(!resolve(cfg).unwrap().use_ssl());
    }

    #[test]
    fn test_custom_forced_to_path_style() {
        let mut cfg = config(Some(Provider::Custom), "auto", "https://r2.example.com");
        cfg.use_path_style = Some(false);
        let resolved = resolve(cfg).unwrap();
        assert!(resolved.use_path_style());
        assert_eq!(resolved.region(), "auto");
    }

    #[test]
    fn test_minio_virtual_hosted_request_overridden() {
        let mut cfg = config(Some(Provider::Minio), "", "http://localhost:9000");
        cfg.use_path_style = Some(false);
        assert!(resolve(cfg).unwrap().use_path_style());
    }

    #[test]
    fn test_minio_requires_endpoint() {
        let err = resolve(config(Some(Provider::Minio), "", "")).unwrap_err();
        assert!(matches!(err, S3Error::InvalidConfig(_)));
    }

    #[test]
    fn test_digital_ocean_region_kept() {
        let resolved = resolve(config(
            Some(Provider::DigitalOcean),
            "fra1",
            "https://fra1.digitaloceanspaces.com",
        ))
        .unwrap();
        assert_eq!(resolved.region(), "fra1");
    }
}
