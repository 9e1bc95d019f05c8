//! Store configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Store configuration using a tagged enum for type-safe configuration.
///
/// Supports:
/// - S3 and S3-compatible endpoints (MinIO, Ceph RGW, OSS, etc.)
/// - Azure Blob Storage
/// - Google Cloud Storage
/// - Local filesystem
/// - In-memory (for testing)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StoreConfig {
    /// AWS S3 or an S3-compatible service
    #[serde(rename = "s3")]
    S3 {
        /// Bucket name
        bucket: String,
        /// Region (e.g. "us-east-1")
        #[serde(default)]
        region: Option<String>,
        /// Custom endpoint URL (for S3-compatible services)
        #[serde(default)]
        endpoint: Option<String>,
        /// Access key ID (falls back to AWS_ACCESS_KEY_ID)
        #[serde(default)]
        access_key: Option<String>,
        /// Secret access key (falls back to AWS_SECRET_ACCESS_KEY)
        #[serde(default)]
        secret_key: Option<String>,
        /// Key prefix applied to every location on this remote
        #[serde(default)]
        prefix: Option<String>,
        /// Allow HTTP (insecure) connections
        #[serde(default)]
        allow_http: bool,
    },

    /// Azure Blob Storage
    #[serde(rename = "azure")]
    Azure {
        /// Storage account name
        account_name: String,
        /// Blob container name
        container_name: String,
        /// Account key (falls back to AZURE_STORAGE_KEY)
        #[serde(default)]
        account_key: Option<String>,
        /// Custom endpoint for sovereign clouds
        #[serde(default)]
        endpoint: Option<String>,
        /// Key prefix applied to every location on this remote
        #[serde(default)]
        prefix: Option<String>,
    },

    /// Google Cloud Storage
    #[serde(rename = "gcs")]
    Gcs {
        /// Bucket name
        bucket: String,
        /// Path to a service account JSON key file (falls back to
        /// Application Default Credentials)
        #[serde(default)]
        service_account_path: Option<String>,
        /// Key prefix applied to every location on this remote
        #[serde(default)]
        prefix: Option<String>,
    },

    /// Local filesystem
    #[serde(rename = "filesystem")]
    Filesystem {
        /// Base directory
        path: PathBuf,
    },

    /// In-memory store (for testing)
    #[serde(rename = "memory")]
    Memory,
}

impl StoreConfig {
    /// Parse a location URL into a store configuration plus the key prefix
    /// embedded in its path.
    ///
    /// Supported formats:
    /// - `s3://bucket/prefix?region=us-east-1&endpoint=...&allow_http=true`
    /// - `azure://container@account/prefix`
    /// - `gcs://bucket/prefix`
    /// - `file:///path/to/dir`
    /// - `memory://`
    pub fn from_url(url: &str) -> crate::Result<(Self, String)> {
        let parsed = url::Url::parse(url)
            .map_err(|e| crate::Error::Config(format!("Invalid store URL {}: {}", url, e)))?;
        let path_prefix = parsed.path().trim_matches('/').to_string();

        match parsed.scheme() {
            "s3" | "s3a" => {
                let bucket = parsed.host_str().unwrap_or_default().to_string();
                if bucket.is_empty() {
                    return Err(crate::Error::Config(format!("Missing bucket in {}", url)));
                }
                let query = |name: &str| {
                    parsed
                        .query_pairs()
                        .find(|(k, _)| k == name)
                        .map(|(_, v)| v.to_string())
                };

                Ok((
                    Self::S3 {
                        bucket,
                        region: query("region"),
                        endpoint: query("endpoint"),
                        access_key: std::env::var("AWS_ACCESS_KEY_ID").ok(),
                        secret_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
                        prefix: None,
                        allow_http: query("allow_http").is_some_and(|v| v == "true"),
                    },
                    path_prefix,
                ))
            }
            "azure" | "az" => {
                let container = parsed.username().to_string();
                let account = parsed.host_str().unwrap_or_default().to_string();
                if container.is_empty() || account.is_empty() {
                    return Err(crate::Error::Config(format!(
                        "Expected azure://container@account/prefix, got {}",
                        url
                    )));
                }

                Ok((
                    Self::Azure {
                        account_name: account,
                        container_name: container,
                        account_key: std::env::var("AZURE_STORAGE_KEY").ok(),
                        endpoint: None,
                        prefix: None,
                    },
                    path_prefix,
                ))
            }
            "gcs" | "gs" => {
                let bucket = parsed.host_str().unwrap_or_default().to_string();
                if bucket.is_empty() {
                    return Err(crate::Error::Config(format!("Missing bucket in {}", url)));
                }

                Ok((
                    Self::Gcs {
                        bucket,
                        service_account_path: std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
                        prefix: None,
                    },
                    path_prefix,
                ))
            }
            "file" => Ok((
                Self::Filesystem {
                    path: PathBuf::from(parsed.path()),
                },
                String::new(),
            )),
            "memory" => Ok((Self::Memory, path_prefix)),
            scheme => Err(crate::Error::Config(format!(
                "Unknown store scheme: {}",
                scheme
            ))),
        }
    }

    /// The remote-level key prefix from this configuration.
    pub fn prefix(&self) -> Option<&str> {
        match self {
            Self::S3 { prefix, .. } => prefix.as_deref(),
            Self::Azure { prefix, .. } => prefix.as_deref(),
            Self::Gcs { prefix, .. } => prefix.as_deref(),
            Self::Filesystem { .. } => None,
            Self::Memory => None,
        }
    }
}
