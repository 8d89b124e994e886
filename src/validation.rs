//! Precondition checks run before any request leaves the process

use crate::config::{S3Config, DEFAULT_REGION};
use crate::error::{S3Error, S3Result};
use secrecy::ExposeSecret;

/// Check identity and bucket; default an empty region
///
/// Strict on bucket and credentials, permissive on region: an empty region
/// is set to [`DEFAULT_REGION`], which is the only change made to `config`.
pub fn validate_configuration(config: Option<&mut S3Config>) -> S3Result<()> {
    let config = config.ok_or_else(|| {
        S3Error::InvalidConfig("configuration must be provided".to_string())
    })?;

    if config.bucket_name.is_empty() {
        return Err(S3Error::EmptyBucketName);
    }

    if config.access_key_id.is_empty() || config.secret_access_key.expose_secret().is_empty() {
        return Err(S3Error::InvalidConfig(
            "access key ID and secret access key are required".to_string(),
        ));
    }

    if config.region.is_empty() {
        config.region = DEFAULT_REGION.to_string();
    }

    Ok(())
}

/// Reject empty object keys
pub fn validate_key(key: &str) -> S3Result<()> {
    if key.is_empty() {
        return Err(S3Error::EmptyKey);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn valid() -> S3Config {
        S3Config::aws("", "AKIA", "secret", "bucket")
    }

    #[test]
    fn test_missing_config() {
        let err = validate_configuration(None).unwrap_err();
        assert!(err.is(ErrorKind::InvalidConfig));
    }

    #[test]
    fn test_empty_bucket() {
        let mut config = valid();
        config.bucket_name.clear();
        let err = validate_configuration(Some(&mut config)).unwrap_err();
        assert!(err.is(ErrorKind::EmptyBucketName));
    }

    #[test]
    fn test_missing_credentials() {
        let mut config = valid();
        config.access_key_id.clear();
        assert!(validate_configuration(Some(&mut config))
            .unwrap_err()
            .is(ErrorKind::InvalidConfig));

        let mut config = S3Config::aws("", "AKIA", "", "bucket");
        assert!(validate_configuration(Some(&mut config))
            .unwrap_err()
            .is(ErrorKind::InvalidConfig));
    }

    #[test]
    fn test_bucket_checked_before_credentials() {
        let mut config = S3Config::default();
        let err = validate_configuration(Some(&mut config)).unwrap_err();
        assert!(err.is(ErrorKind::EmptyBucketName));
    }

    #[test]
    fn test_region_defaulted() {
        let mut config = valid();
        validate_configuration(Some(&mut config)).unwrap();
        assert_eq!(config.region, DEFAULT_REGION);

        let mut config = S3Config::aws("eu-west-3", "AKIA", "secret", "bucket");
        validate_configuration(Some(&mut config)).unwrap();
        assert_eq!(config.region, "eu-west-3");
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("").unwrap_err().is(ErrorKind::EmptyKey));
        for key in ["a", " ", "dir/file.txt", "unicode/ключ", "trailing/"] {
            assert!(validate_key(key).is_ok(), "{:?}", key);
        }
    }
}
