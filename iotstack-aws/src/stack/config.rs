//! Stack configuration
//!
//! Everything the stack definition needs from the outside world is loaded
//! and validated here, once, before any resource is declared.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::policy::PolicyDocument;

pub const DEFAULT_STACK_NAME: &str = "IoTStack";
pub const DEFAULT_CSR_PATH: &str = "cert.pem";

pub const ENV_SOURCE_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_SOURCE_OWNER: &str = "GITHUB_OWNER";
pub const ENV_SOURCE_REPOSITORY: &str = "GITHUB_REPOSITORY";

static CSR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)^-----BEGIN (NEW )?CERTIFICATE REQUEST-----\r?\n([A-Za-z0-9+/=\r\n]+)-----END (NEW )?CERTIFICATE REQUEST-----\s*$",
    )
    .expect("valid CSR pattern")
});

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read certificate signing request {path}: {source}")]
    CsrUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Certificate signing request {path} is empty")]
    CsrEmpty { path: PathBuf },

    #[error("Certificate signing request {path} is not a PEM-encoded request: {reason}")]
    CsrInvalid { path: PathBuf, reason: String },

    #[error("Environment variable not set: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid policy document: {0}")]
    InvalidPolicy(String),
}

/// PEM-encoded certificate signing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSigningRequest(String);

impl CertificateSigningRequest {
    /// Read and validate a CSR file
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::CsrUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Validate CSR text; `origin` is only used in error messages
    pub fn parse(origin: &Path, content: &str) -> Result<Self, ConfigError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::CsrEmpty {
                path: origin.to_path_buf(),
            });
        }

        let normalized = format!("{}\n", trimmed);
        let Some(captures) = CSR_PATTERN.captures(&normalized) else {
            return Err(ConfigError::CsrInvalid {
                path: origin.to_path_buf(),
                reason: "expected a single CERTIFICATE REQUEST block".to_string(),
            });
        };

        if captures.get(1).is_some() != captures.get(3).is_some() {
            return Err(ConfigError::CsrInvalid {
                path: origin.to_path_buf(),
                reason: "BEGIN and END labels do not match".to_string(),
            });
        }

        let body = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
        if body.trim().is_empty() {
            return Err(ConfigError::CsrInvalid {
                path: origin.to_path_buf(),
                reason: "request body is empty".to_string(),
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Git repository the frontend is built from
#[derive(Clone, PartialEq, Eq)]
pub struct SourceRepository {
    pub owner: String,
    pub repository: String,
    pub access_token: String,
}

impl SourceRepository {
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repository)
    }
}

impl fmt::Debug for SourceRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRepository")
            .field("owner", &self.owner)
            .field("repository", &self.repository)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Validated configuration for the stack definition
#[derive(Debug, Clone)]
pub struct StackConfig {
    pub stack_name: String,
    pub csr: CertificateSigningRequest,
    pub source: SourceRepository,
    /// Permissions granted to the device certificate
    pub device_policy: PolicyDocument,
    /// Branch the frontend tracks
    pub branch: String,
}

impl StackConfig {
    /// Load configuration from a CSR file and the process environment
    pub fn load(stack_name: &str, csr_path: &Path) -> Result<Self, ConfigError> {
        Self::from_sources(stack_name, csr_path, |key| std::env::var(key).ok())
    }

    /// Load configuration from a CSR file and an environment lookup
    pub fn from_sources<F>(stack_name: &str, csr_path: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let csr = CertificateSigningRequest::read(csr_path)?;
        debug!("read certificate signing request from {}", csr_path.display());

        let source = SourceRepository {
            access_token: required_env(&env, ENV_SOURCE_TOKEN)?,
            owner: required_env(&env, ENV_SOURCE_OWNER)?,
            repository: required_env(&env, ENV_SOURCE_REPOSITORY)?,
        };

        Ok(Self {
            stack_name: stack_name.to_string(),
            csr,
            source,
            device_policy: PolicyDocument::iot_full_access(),
            branch: "master".to_string(),
        })
    }

    /// Replace the device policy, rejecting malformed documents
    pub fn with_device_policy(mut self, policy: PolicyDocument) -> Result<Self, ConfigError> {
        policy.validate()?;
        self.device_policy = policy;
        Ok(self)
    }
}

fn required_env<F>(env: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(key)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    pub(crate) const SAMPLE_CSR: &str = "-----BEGIN CERTIFICATE REQUEST-----\n\
MIIBVTCB/AIBADAaMRgwFgYDVQQDDA9jZGstdHRnby1kZXZpY2UwWTATBgcqhkjO\n\
PQIBBggqhkjOPQMBBwNCAAQ2mE5v0uYl3m1tq0c1Q0mC8xS8S5yq6f5o9yq2C8hY\n\
-----END CERTIFICATE REQUEST-----\n";

    pub(crate) fn full_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (ENV_SOURCE_TOKEN, "ghp_example".to_string()),
            (ENV_SOURCE_OWNER, "octo".to_string()),
            (ENV_SOURCE_REPOSITORY, "ttgo-frontend".to_string()),
        ])
    }

    pub(crate) fn csr_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    pub(crate) fn sample_config() -> StackConfig {
        let file = csr_file(SAMPLE_CSR);
        let env = full_env();
        StackConfig::from_sources(DEFAULT_STACK_NAME, file.path(), |k| env.get(k).cloned())
            .unwrap()
    }

    #[test]
    fn loads_complete_configuration() {
        let config = sample_config();
        assert_eq!(config.stack_name, "IoTStack");
        assert!(config.csr.as_str().starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
        assert_eq!(config.source.url(), "https://github.com/octo/ttgo-frontend");
        assert_eq!(config.branch, "master");
        assert_eq!(config.device_policy, PolicyDocument::iot_full_access());
    }

    #[test]
    fn missing_csr_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let env = full_env();
        let err = StackConfig::from_sources(
            DEFAULT_STACK_NAME,
            &dir.path().join("cert.pem"),
            |k| env.get(k).cloned(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::CsrUnreadable { .. }));
    }

    #[test]
    fn empty_csr_is_fatal() {
        let file = csr_file("  \n");
        let env = full_env();
        let err = StackConfig::from_sources(DEFAULT_STACK_NAME, file.path(), |k| {
            env.get(k).cloned()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::CsrEmpty { .. }));
    }

    #[test]
    fn non_pem_csr_is_fatal() {
        let origin = Path::new("cert.pem");
        assert!(matches!(
            CertificateSigningRequest::parse(origin, "not a certificate"),
            Err(ConfigError::CsrInvalid { .. })
        ));
        assert!(matches!(
            CertificateSigningRequest::parse(
                origin,
                "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n"
            ),
            Err(ConfigError::CsrInvalid { .. })
        ));
        assert!(matches!(
            CertificateSigningRequest::parse(
                origin,
                "-----BEGIN NEW CERTIFICATE REQUEST-----\nMIIB\n-----END CERTIFICATE REQUEST-----\n"
            ),
            Err(ConfigError::CsrInvalid { .. })
        ));
    }

    #[test]
    fn accepts_new_certificate_request_label() {
        let csr = "-----BEGIN NEW CERTIFICATE REQUEST-----\nMIIB\n-----END NEW CERTIFICATE REQUEST-----";
        assert!(CertificateSigningRequest::parse(Path::new("cert.pem"), csr).is_ok());
    }

    #[test]
    fn each_repository_variable_is_required() {
        let file = csr_file(SAMPLE_CSR);
        for key in [ENV_SOURCE_TOKEN, ENV_SOURCE_OWNER, ENV_SOURCE_REPOSITORY] {
            let mut env = full_env();
            env.remove(key);
            let err = StackConfig::from_sources(DEFAULT_STACK_NAME, file.path(), |k| {
                env.get(k).cloned()
            })
            .unwrap_err();
            match err {
                ConfigError::MissingEnv(missing) => assert_eq!(missing, key),
                other => panic!("Expected MissingEnv, got {:?}", other),
            }
        }
    }

    #[test]
    fn blank_repository_variable_counts_as_missing() {
        let file = csr_file(SAMPLE_CSR);
        let mut env = full_env();
        env.insert(ENV_SOURCE_OWNER, "   ".to_string());
        let err = StackConfig::from_sources(DEFAULT_STACK_NAME, file.path(), |k| {
            env.get(k).cloned()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ENV_SOURCE_OWNER)));
    }

    #[test]
    fn debug_output_redacts_token() {
        let config = sample_config();
        let debug = format!("{:?}", config.source);
        assert!(!debug.contains("ghp_example"));
        assert!(debug.contains("<redacted>"));
    }
}
