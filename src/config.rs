//! Store configuration, built explicitly from CLI flags and the environment

use aws_credential_types::Credentials;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::cli::StoreArgs;

/// Environment variable holding a static access key id
pub const ACCESS_KEY_ID_ENV: &str = "DBCOPY_ACCESS_KEY_ID";

/// Environment variable holding a static secret access key
pub const SECRET_ACCESS_KEY_ENV: &str = "DBCOPY_SECRET_ACCESS_KEY";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl StoreConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    /// Build from parsed flags, picking static credentials up from the environment.
    pub fn from_args(args: &StoreArgs) -> Self {
        Self {
            bucket: args.bucket.clone(),
            region: non_empty(args.region.as_deref()),
            endpoint_url: args.endpoint_url.as_deref().and_then(normalize_endpoint),
            force_path_style: args.force_path_style,
            access_key_id: non_empty(std::env::var(ACCESS_KEY_ID_ENV).ok().as_deref()),
            secret_access_key: non_empty(std::env::var(SECRET_ACCESS_KEY_ENV).ok().as_deref()),
        }
    }

    /// Static credentials, when both halves are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some(Credentials::new(id, secret, None, None, "dbcopy-static")),
            _ => None,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Accept either a full URL or a bare host; bare hosts default to https.
pub fn normalize_endpoint(raw: &str) -> Option<String> {
    let endpoint = raw.trim().trim_end_matches('/');
    if endpoint.is_empty() {
        return None;
    }
    if endpoint.contains("://") {
        Some(endpoint.to_string())
    } else {
        Some(format!("https://{}", endpoint))
    }
}

/// Load `.env` if there is one and return where it was found. A missing file
/// is fine, a broken one is not. Runs before logging is set up so `.env` can
/// carry `RUST_LOG`.
pub fn load_env() -> io::Result<Option<PathBuf>> {
    env_file_result(dotenv::dotenv())
}

/// Load a specific env file, with the same rules as [`load_env`].
pub fn load_env_from(path: &Path) -> io::Result<Option<PathBuf>> {
    env_file_result(dotenv::from_path(path).map(|()| path.to_path_buf()))
}

fn env_file_result(result: dotenv::Result<PathBuf>) -> io::Result<Option<PathBuf>> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(dotenv::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("load .env: {}", e),
        )),
    }
}
