//! Configuration structures for OpenNebula clients.
//!
//! A [`OneConfig`] holds everything needed to reach an OpenNebula front-end: the
//! session token, the endpoint and the transport. It is produced by
//! [`ConfigResolver`], which applies the precedence explicit arguments >
//! environment variables > credentials file > built-in default endpoint.
//!
//! The resolver works on an [`Environment`] snapshot rather than reading the
//! process environment directly, so resolution is a pure function of its inputs.

use crate::error::{Error, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use validator::Validate;

/// Default XML-RPC endpoint.
pub const DEFAULT_XMLRPC_ENDPOINT: &str = "http://localhost:2633/RPC2";

/// Default gRPC endpoint.
pub const DEFAULT_GRPC_ENDPOINT: &str = "localhost:2634";

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Path of the credentials file relative to the home directory.
pub const ONE_AUTH_RELATIVE_PATH: &str = ".one/one_auth";

/// Environment variable naming the credentials file.
pub const ENV_ONE_AUTH: &str = "ONE_AUTH";
/// Environment variable overriding the XML-RPC endpoint.
pub const ENV_ONE_XMLRPC: &str = "ONE_XMLRPC";
/// Environment variable overriding the gRPC endpoint.
pub const ENV_ONE_GRPC: &str = "ONE_GRPC";
/// Environment variable selecting the transport.
pub const ENV_ONEAPI_PROTOCOL: &str = "ONEAPI_PROTOCOL";

/// Wire transport used to reach OpenNebula.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Legacy XML-RPC over HTTP
    #[default]
    XmlRpc,
    /// gRPC over HTTP/2
    Grpc,
}

impl Transport {
    /// Interpret the value of `ONEAPI_PROTOCOL`.
    ///
    /// Only `grpc` (case-insensitive) selects gRPC; anything else falls back to XML-RPC.
    #[must_use]
    pub fn from_protocol(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("grpc") => Self::Grpc,
            _ => Self::XmlRpc,
        }
    }

    /// Built-in endpoint for this transport.
    #[must_use]
    pub const fn default_endpoint(self) -> &'static str {
        match self {
            Self::XmlRpc => DEFAULT_XMLRPC_ENDPOINT,
            Self::Grpc => DEFAULT_GRPC_ENDPOINT,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::XmlRpc => "XML-RPC",
            Self::Grpc => "gRPC",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "xmlrpc" | "xml-rpc" => Ok(Self::XmlRpc),
            "grpc" => Ok(Self::Grpc),
            other => Err(Error::Config(format!("unknown transport: {other}"))),
        }
    }
}

/// Resolved connection parameters.
///
/// Immutable once built; the `with_*` helpers return modified copies.
#[derive(Debug, Clone, Validate)]
pub struct OneConfig {
    token: SecretString,

    #[validate(length(min = 1))]
    endpoint: String,

    transport: Transport,

    #[validate(range(min = 1, max = 3600))]
    request_timeout_secs: u64,

    tls_verify: bool,
}

impl OneConfig {
    /// Build a configuration from explicit values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the token is empty or validation fails.
    pub fn new(
        token: impl Into<String>,
        endpoint: impl Into<String>,
        transport: Transport,
    ) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::Config("session token must not be empty".to_string()));
        }

        let config = Self {
            token: SecretString::from(token),
            endpoint: endpoint.into(),
            transport,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            tls_verify: true,
        };

        config
            .validate()
            .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;

        Ok(config)
    }

    /// Resolve a configuration from the process environment only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no credentials can be found.
    pub fn from_env() -> Result<Self> {
        ConfigResolver::from_process_env().resolve("", "", "")
    }

    /// Session token (`user:password`).
    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.token
    }

    /// Endpoint the transport connects to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Selected transport.
    #[must_use]
    pub const fn transport(&self) -> Transport {
        self.transport
    }

    /// Whether TLS certificates are verified.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Override the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Override the transport, keeping the endpoint.
    #[must_use]
    pub const fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Re-run field validation after builder overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a field is out of range.
    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;
        Ok(self)
    }
}

/// Snapshot of the environment variables consulted during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// `ONE_AUTH`: path to the credentials file
    pub one_auth: Option<PathBuf>,
    /// `HOME`: used for the `~/.one/one_auth` fallback
    pub home: Option<PathBuf>,
    /// `ONE_XMLRPC`: XML-RPC endpoint override
    pub one_xmlrpc: Option<String>,
    /// `ONE_GRPC`: gRPC endpoint override
    pub one_grpc: Option<String>,
    /// `ONEAPI_PROTOCOL`: transport selector
    pub oneapi_protocol: Option<String>,
}

impl Environment {
    /// Capture the current process environment.
    ///
    /// Empty variables are treated as unset. When `HOME` is unset the platform
    /// home directory is used instead.
    #[must_use]
    pub fn from_process() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            one_auth: var(ENV_ONE_AUTH).map(PathBuf::from),
            home: var("HOME").map(PathBuf::from).or_else(dirs::home_dir),
            one_xmlrpc: var(ENV_ONE_XMLRPC),
            one_grpc: var(ENV_ONE_GRPC),
            oneapi_protocol: var(ENV_ONEAPI_PROTOCOL),
        }
    }

    /// Set `ONE_AUTH`.
    #[must_use]
    pub fn with_one_auth(mut self, path: impl Into<PathBuf>) -> Self {
        self.one_auth = Some(path.into());
        self
    }

    /// Set `HOME`.
    #[must_use]
    pub fn with_home(mut self, path: impl Into<PathBuf>) -> Self {
        self.home = Some(path.into());
        self
    }

    /// Set `ONE_XMLRPC`.
    #[must_use]
    pub fn with_xmlrpc_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.one_xmlrpc = Some(endpoint.into());
        self
    }

    /// Set `ONE_GRPC`.
    #[must_use]
    pub fn with_grpc_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.one_grpc = Some(endpoint.into());
        self
    }

    /// Set `ONEAPI_PROTOCOL`.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.oneapi_protocol = Some(protocol.into());
        self
    }
}

/// Resolves a [`OneConfig`] from explicit values and an [`Environment`].
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    env: Environment,
}

impl ConfigResolver {
    /// Create a resolver over an environment snapshot.
    #[must_use]
    pub const fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Create a resolver over the current process environment.
    #[must_use]
    pub fn from_process_env() -> Self {
        Self::new(Environment::from_process())
    }

    /// Transport selected by `ONEAPI_PROTOCOL`.
    #[must_use]
    pub fn transport(&self) -> Transport {
        Transport::from_protocol(self.env.oneapi_protocol.as_deref())
    }

    /// Resolve the full configuration.
    ///
    /// Empty strings count as "not provided". When both `user` and `password`
    /// are empty the token is read from the credentials file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when only one of `user`/`password` is given, or
    /// when the credentials file cannot be read or is malformed.
    pub fn resolve(&self, user: &str, password: &str, endpoint: &str) -> Result<OneConfig> {
        let transport = self.transport();
        let token = self.resolve_token(user, password)?;
        let endpoint = self.resolve_endpoint(transport, endpoint);

        debug!(%transport, %endpoint, "resolved OpenNebula configuration");

        OneConfig::new(token, endpoint, transport)
    }

    /// Resolve only the endpoint for a transport.
    #[must_use]
    pub fn resolve_endpoint(&self, transport: Transport, explicit: &str) -> String {
        if !explicit.is_empty() {
            return explicit.to_string();
        }

        let from_env = match transport {
            Transport::XmlRpc => self.env.one_xmlrpc.as_deref(),
            Transport::Grpc => self.env.one_grpc.as_deref(),
        };

        from_env
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| transport.default_endpoint())
            .to_string()
    }

    fn resolve_token(&self, user: &str, password: &str) -> Result<String> {
        match (user.is_empty(), password.is_empty()) {
            (false, false) => Ok(format!("{user}:{password}")),
            (true, true) => {
                let path = self.credentials_path()?;
                read_credentials(&path)
            }
            _ => Err(Error::Config(
                "both user and password must be provided, or neither".to_string(),
            )),
        }
    }

    /// Location of the credentials file: `$ONE_AUTH`, else `$HOME/.one/one_auth`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when neither variable is available.
    pub fn credentials_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.env.one_auth {
            return Ok(path.clone());
        }

        self.env
            .home
            .as_ref()
            .map(|home| home.join(ONE_AUTH_RELATIVE_PATH))
            .ok_or_else(|| {
                Error::Config(format!(
                    "cannot locate credentials: neither {ENV_ONE_AUTH} nor HOME is set"
                ))
            })
    }
}

/// Read a `user:password` line from a credentials file.
///
/// # Errors
///
/// Returns [`Error::Config`] if the file is unreadable, empty, or the first
/// line is not of the form `user:password`.
pub fn read_credentials(path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "failed to read credentials file {}: {e}",
            path.display()
        ))
    })?;

    let line = contents.lines().next().map(str::trim).unwrap_or_default();
    if line.is_empty() {
        return Err(Error::Config(format!(
            "credentials file {} is empty",
            path.display()
        )));
    }

    match line.split_once(':') {
        Some((user, _)) if !user.is_empty() => Ok(line.to_string()),
        _ => Err(Error::Config(format!(
            "credentials file {} must contain `user:password`",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::fs;
    use tempfile::TempDir;

    fn write_auth(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn home_with_auth(contents: &str) -> TempDir {
        let home = TempDir::new().unwrap();
        fs::create_dir_all(home.path().join(".one")).unwrap();
        fs::write(home.path().join(ONE_AUTH_RELATIVE_PATH), contents).unwrap();
        home
    }

    #[test]
    fn test_explicit_credentials_win() {
        let dir = TempDir::new().unwrap();
        let auth = write_auth(&dir, "auth", "file:secret\n");
        let env = Environment::default()
            .with_one_auth(auth)
            .with_home(dir.path());

        let config = ConfigResolver::new(env).resolve("a", "b", "").unwrap();
        assert_eq!(config.token().expose_secret(), "a:b");
    }

    #[test]
    fn test_token_from_one_auth() {
        let dir = TempDir::new().unwrap();
        let auth = write_auth(&dir, "auth", "oneadmin:opennebula\n");
        let home = home_with_auth("home:user");
        let env = Environment::default()
            .with_one_auth(auth)
            .with_home(home.path());

        let config = ConfigResolver::new(env).resolve("", "", "").unwrap();
        assert_eq!(config.token().expose_secret(), "oneadmin:opennebula");
    }

    #[test]
    fn test_token_from_home_fallback() {
        let home = home_with_auth("serveradmin:pass\nignored:line\n");
        let env = Environment::default().with_home(home.path());

        let config = ConfigResolver::new(env).resolve("", "", "").unwrap();
        assert_eq!(config.token().expose_secret(), "serveradmin:pass");
    }

    #[test]
    fn test_missing_credentials_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let env = Environment::default().with_one_auth(dir.path().join("missing"));

        let err = ConfigResolver::new(env).resolve("", "", "").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_credentials_file() {
        let dir = TempDir::new().unwrap();
        let auth = write_auth(&dir, "auth", "no-colon-here\n");
        let env = Environment::default().with_one_auth(auth);
        assert!(ConfigResolver::new(env).resolve("", "", "").is_err());

        let empty = write_auth(&dir, "empty", "");
        let env = Environment::default().with_one_auth(empty);
        assert!(ConfigResolver::new(env).resolve("", "", "").is_err());
    }

    #[test]
    fn test_partial_credentials_rejected() {
        let resolver = ConfigResolver::new(Environment::default());
        assert!(matches!(
            resolver.resolve("user", "", ""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            resolver.resolve("", "pass", ""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_no_home_and_no_one_auth() {
        let resolver = ConfigResolver::new(Environment::default());
        let err = resolver.resolve("", "", "").unwrap_err();
        assert!(err.to_string().contains("ONE_AUTH"));
    }

    #[test]
    fn test_default_endpoints() {
        let resolver = ConfigResolver::new(Environment::default());
        let config = resolver.resolve("a", "b", "").unwrap();
        assert_eq!(config.transport(), Transport::XmlRpc);
        assert_eq!(config.endpoint(), "http://localhost:2633/RPC2");

        let resolver = ConfigResolver::new(Environment::default().with_protocol("grpc"));
        let config = resolver.resolve("a", "b", "").unwrap();
        assert_eq!(config.transport(), Transport::Grpc);
        assert_eq!(config.endpoint(), "localhost:2634");
    }

    #[test]
    fn test_endpoint_precedence() {
        let env = Environment::default()
            .with_xmlrpc_endpoint("http://one.example.com:2633/RPC2")
            .with_grpc_endpoint("one.example.com:2634");
        let resolver = ConfigResolver::new(env.clone());

        let config = resolver.resolve("a", "b", "").unwrap();
        assert_eq!(config.endpoint(), "http://one.example.com:2633/RPC2");

        let config = resolver
            .resolve("a", "b", "http://explicit:2633/RPC2")
            .unwrap();
        assert_eq!(config.endpoint(), "http://explicit:2633/RPC2");

        let resolver = ConfigResolver::new(env.with_protocol("GRPC"));
        let config = resolver.resolve("a", "b", "").unwrap();
        assert_eq!(config.endpoint(), "one.example.com:2634");
    }

    #[test]
    fn test_protocol_selection() {
        assert_eq!(Transport::from_protocol(None), Transport::XmlRpc);
        assert_eq!(Transport::from_protocol(Some("grpc")), Transport::Grpc);
        assert_eq!(Transport::from_protocol(Some(" gRPC ")), Transport::Grpc);
        assert_eq!(Transport::from_protocol(Some("xmlrpc")), Transport::XmlRpc);
        assert_eq!(Transport::from_protocol(Some("http")), Transport::XmlRpc);
    }

    #[test]
    fn test_transport_from_str() {
        assert_eq!("xml-rpc".parse::<Transport>().unwrap(), Transport::XmlRpc);
        assert_eq!("grpc".parse::<Transport>().unwrap(), Transport::Grpc);
        assert!("soap".parse::<Transport>().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = OneConfig::new("a:b", DEFAULT_XMLRPC_ENDPOINT, Transport::XmlRpc)
            .unwrap()
            .with_timeout(60)
            .with_tls_verify(false);

        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(!config.tls_verify());
    }

    #[test]
    fn test_config_validation_timeout_range() {
        let config = OneConfig::new("a:b", DEFAULT_XMLRPC_ENDPOINT, Transport::XmlRpc).unwrap();
        assert!(config.clone().with_timeout(0).validated().is_err());
        assert!(config.clone().with_timeout(3601).validated().is_err());
        assert!(config.with_timeout(120).validated().is_ok());
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(OneConfig::new("", DEFAULT_XMLRPC_ENDPOINT, Transport::XmlRpc).is_err());
        assert!(OneConfig::new("a:b", "", Transport::XmlRpc).is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = OneConfig::new("oneadmin:secret", DEFAULT_XMLRPC_ENDPOINT, Transport::XmlRpc)
            .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_transport_serialization() {
        let json = serde_json::to_string(&Transport::Grpc).unwrap();
        assert_eq!(json, "\"grpc\"");
        let back: Transport = serde_json::from_str("\"xmlrpc\"").unwrap();
        assert_eq!(back, Transport::XmlRpc);
    }
}
