//! Asynchronous XML-RPC client implementation.

use crate::codec;
use async_trait::async_trait;
use goca_core::{
    CallContext, ClientErrorKind, Error, OneConfig, Response, Result, RpcCaller, Transport, Value,
};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!("goca-xmlrpc/", env!("CARGO_PKG_VERSION"));

/// Default idle timeout for pooled connections, in seconds
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// HTTP connection settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Enable response compression
    pub enable_compression: bool,
}

impl HttpConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            enable_compression: true,
        }
    }

    /// Set connection pool idle timeout.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Enable or disable compression.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`XmlRpcClient`].
#[derive(Debug, Clone)]
pub struct XmlRpcClientBuilder {
    config: OneConfig,
    http: HttpConfig,
}

impl XmlRpcClientBuilder {
    /// Start from a resolved connection configuration.
    #[must_use]
    pub fn new(config: OneConfig) -> Self {
        Self {
            config,
            http: HttpConfig::default(),
        }
    }

    /// Override the HTTP connection settings.
    #[must_use]
    pub fn with_http_config(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unparsable endpoint and a
    /// `RequestBuild` client error when the HTTP client cannot be created.
    pub fn build(self) -> Result<XmlRpcClient> {
        let config = self.config.validated()?;
        let endpoint = Url::parse(config.endpoint())?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .pool_idle_timeout(self.http.pool_idle_timeout)
            .pool_max_idle_per_host(self.http.pool_max_idle_per_host)
            .gzip(self.http.enable_compression)
            .danger_accept_invalid_certs(!config.tls_verify())
            .build()
            .map_err(|e| Error::client(ClientErrorKind::RequestBuild, e.to_string()))?;

        debug!(endpoint = %endpoint, timeout = ?config.timeout(), "XML-RPC client ready");

        Ok(XmlRpcClient {
            http,
            endpoint,
            token: Arc::new(RwLock::new(config.token().clone())),
        })
    }
}

/// Asynchronous XML-RPC client for the OpenNebula API.
///
/// Cloning is cheap: clones share the connection pool and the session token.
#[derive(Clone)]
pub struct XmlRpcClient {
    http: reqwest::Client,
    endpoint: Url,
    token: Arc<RwLock<SecretString>>,
}

impl std::fmt::Debug for XmlRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlRpcClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl XmlRpcClient {
    /// Construct a client with default HTTP settings.
    ///
    /// # Errors
    ///
    /// Same as [`XmlRpcClientBuilder::build`].
    pub fn new(config: OneConfig) -> Result<Self> {
        XmlRpcClientBuilder::new(config).build()
    }

    /// Return the endpoint URL.
    #[must_use]
    pub fn endpoint_url(&self) -> &Url {
        &self.endpoint
    }

    fn session(&self) -> String {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .expose_secret()
            .to_string()
    }

    async fn post(
        &self,
        ctx: &CallContext,
        endpoint: &Url,
        method: &str,
        args: &[Value],
    ) -> Result<Response> {
        let body = codec::encode_call(method, &self.session(), args)?;
        debug!(method, endpoint = %endpoint, args = args.len(), "XML-RPC call");

        let mut request = self
            .http
            .post(endpoint.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("text/xml"))
            .body(body);
        if let Some(remaining) = ctx.remaining() {
            request = request.timeout(remaining);
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                return Err(Error::client(
                    ClientErrorKind::ResponseHttp,
                    format!("HTTP {status}: {text}"),
                ));
            }
            codec::decode_response(&text)
        };

        let result = ctx.run(exchange).await;
        match &result {
            Ok(response) => debug!(method, body_int = response.body_int, "XML-RPC call succeeded"),
            Err(err) => debug!(method, error = %err, "XML-RPC call failed"),
        }
        result
    }
}

#[async_trait]
impl RpcCaller for XmlRpcClient {
    async fn call_with_context(
        &self,
        ctx: &CallContext,
        method: &str,
        args: &[Value],
    ) -> Result<Response> {
        self.post(ctx, &self.endpoint, method, args).await
    }

    async fn endpoint_call(
        &self,
        ctx: &CallContext,
        endpoint: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Response> {
        let url = Url::parse(endpoint).map_err(|e| {
            Error::client(
                ClientErrorKind::RequestBuild,
                format!("invalid endpoint `{endpoint}`: {e}"),
            )
        })?;
        self.post(ctx, &url, method, args).await
    }

    fn transport(&self) -> Transport {
        Transport::XmlRpc
    }

    fn endpoint(&self) -> String {
        self.endpoint.to_string()
    }

    fn set_token(&self, token: &str) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) =
            SecretString::from(token.to_string());
        debug!("XML-RPC session token replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goca_core::ErrorCode;
    use goca_core::CancellationToken;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str) -> OneConfig {
        OneConfig::new("oneadmin:opennebula", endpoint, Transport::XmlRpc).unwrap()
    }

    fn client(server: &MockServer) -> XmlRpcClient {
        XmlRpcClient::new(config(&format!("{}/RPC2", server.uri()))).unwrap()
    }

    fn one_reply(status: bool, body: Value, code: i32) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_string(codec::encode_response(&Value::Array(vec![
            Value::Bool(status),
            body,
            Value::Int(code),
        ])))
    }

    #[tokio::test]
    async fn call_success_with_token_first() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/RPC2"))
            .and(header("content-type", "text/xml"))
            .and(body_string_contains("<methodName>one.vm.info</methodName>"))
            .and(body_string_contains(
                "<params><param><value><string>oneadmin:opennebula</string></value></param>\
                 <param><value><i4>7</i4></value></param>",
            ))
            .respond_with(one_reply(true, Value::from("<VM><ID>7</ID></VM>"), 0))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .call("one.vm.info", &[Value::Int(7)])
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.body(), "<VM><ID>7</ID></VM>");
    }

    #[tokio::test]
    async fn call_returns_object_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(one_reply(true, Value::Int(42), 0))
            .mount(&server)
            .await;

        let response = client(&server)
            .call("one.vm.allocate", &[Value::from("NAME=test"), Value::Bool(false)])
            .await
            .unwrap();
        assert_eq!(response.body_int(), 42);
    }

    #[tokio::test]
    async fn server_rejection_keeps_code_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(one_reply(false, Value::from("message"), 0x0800))
            .mount(&server)
            .await;

        let err = client(&server)
            .call("one.vm.action", &[Value::from("resume"), Value::Int(1)])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::Response {
                code: ErrorCode::Action,
                message: "message".to_string(),
            }
        );
        assert_eq!(err.response_code().map(ErrorCode::as_i32), Some(0x0800));
    }

    #[tokio::test]
    async fn fault_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(codec::encode_fault(-32601, "method not found")),
            )
            .mount(&server)
            .await;

        let err = client(&server).call("one.nope", &[]).await.unwrap_err();
        assert_eq!(err.client_kind(), Some(ClientErrorKind::ResponseXmlRpcFault));
    }

    #[tokio::test]
    async fn http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("proxy failure"))
            .mount(&server)
            .await;

        let err = client(&server)
            .call("one.system.version", &[])
            .await
            .unwrap_err();
        assert_eq!(err.client_kind(), Some(ClientErrorKind::ResponseHttp));
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("proxy failure"));
    }

    #[tokio::test]
    async fn unexpected_payload_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(codec::encode_response(&Value::from("bare string"))),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .call("one.system.version", &[])
            .await
            .unwrap_err();
        assert_eq!(err.client_kind(), Some(ClientErrorKind::ResponseOneParse));
    }

    #[tokio::test]
    async fn expired_context_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(one_reply(true, Value::from("6.10.0"), 0))
            .expect(0)
            .mount(&server)
            .await;

        let ctx = CallContext::background().with_deadline(tokio::time::Instant::now());
        let err = client(&server)
            .call_with_context(&ctx, "one.system.version", &[])
            .await
            .unwrap_err();
        assert_eq!(err.client_kind(), Some(ClientErrorKind::DeadlineExceeded));
    }

    #[tokio::test]
    async fn deadline_interrupts_slow_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                one_reply(true, Value::from("late"), 0).set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let ctx = CallContext::background().with_timeout(Duration::from_millis(100));
        let started = std::time::Instant::now();
        let err = client(&server)
            .call_with_context(&ctx, "one.system.version", &[])
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancellation_interrupts_slow_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                one_reply(true, Value::from("late"), 0).set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let token = CancellationToken::new();
        let ctx = CallContext::background().with_cancellation(token.clone());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let err = client(&server)
            .call_with_context(&ctx, "one.system.version", &[])
            .await
            .unwrap_err();
        assert_eq!(err.client_kind(), Some(ClientErrorKind::Cancelled));
    }

    #[tokio::test]
    async fn endpoint_call_reaches_other_server() {
        let local = MockServer::start().await;
        let master = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(one_reply(true, Value::from("local"), 0))
            .expect(0)
            .mount(&local)
            .await;
        Mock::given(method("POST"))
            .and(path("/RPC2"))
            .and(body_string_contains("<string>oneadmin:opennebula</string>"))
            .respond_with(one_reply(true, Value::from("<ZONE/>"), 0))
            .expect(1)
            .mount(&master)
            .await;

        let response = client(&local)
            .endpoint_call(
                &CallContext::background(),
                &format!("{}/RPC2", master.uri()),
                "one.zone.info",
                &[Value::Int(0)],
            )
            .await
            .unwrap();
        assert_eq!(response.body(), "<ZONE/>");
    }

    #[tokio::test]
    async fn endpoint_call_rejects_bad_url() {
        let server = MockServer::start().await;
        let err = client(&server)
            .endpoint_call(&CallContext::background(), "::", "one.zone.info", &[])
            .await
            .unwrap_err();
        assert_eq!(err.client_kind(), Some(ClientErrorKind::RequestBuild));
    }

    #[tokio::test]
    async fn rotated_token_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("<string>serveradmin:rotated</string>"))
            .respond_with(one_reply(true, Value::from("ok"), 0))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        client.set_token("serveradmin:rotated");
        client.call("one.user.info", &[Value::Int(-1)]).await.unwrap();
    }

    #[test]
    fn http_config_builder() {
        let http = HttpConfig::new()
            .with_pool_idle_timeout(Duration::from_secs(5))
            .with_pool_max_idle(2)
            .with_compression(false);
        assert_eq!(http.pool_idle_timeout, Duration::from_secs(5));
        assert_eq!(http.pool_max_idle_per_host, 2);
        assert!(!http.enable_compression);
    }

    #[test]
    fn rejects_unparsable_endpoint() {
        let err = XmlRpcClient::new(config("not a url")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn token_rotation() {
        let client = XmlRpcClient::new(config("http://localhost:2633/RPC2")).unwrap();
        let clone = client.clone();
        assert_eq!(client.session(), "oneadmin:opennebula");
        client.set_token("serveradmin:other");
        assert_eq!(clone.session(), "serveradmin:other");
        assert_eq!(client.transport(), Transport::XmlRpc);
        assert_eq!(client.endpoint(), "http://localhost:2633/RPC2");
    }
}
