//! Asynchronous gRPC client implementation.

use crate::message::{GrpcReply, GrpcRequest};
use crate::status;
use async_trait::async_trait;
use goca_core::{
    methods, CallContext, ClientErrorKind, Error, OneConfig, Response, Result, RpcCaller,
    Transport, Value,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

const USER_AGENT: &str = concat!("goca-grpc/", env!("CARGO_PKG_VERSION"));

/// Default connection timeout, in seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Asynchronous gRPC client for the OpenNebula API.
///
/// The channel connects lazily on the first call and reconnects on its own;
/// clones share it together with the session token.
#[derive(Clone)]
pub struct GrpcClient {
    channel: Channel,
    endpoint: String,
    timeout: Duration,
    token: Arc<RwLock<SecretString>>,
}

impl std::fmt::Debug for GrpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Prefix `http://` to `host:port` endpoints.
#[must_use]
pub fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

fn channel(endpoint: &str, timeout: Duration) -> Result<Channel> {
    // The lazy channel spawns its connector on the current runtime.
    Handle::try_current().map_err(|e| {
        Error::Config(format!("gRPC client needs a Tokio runtime: {e}"))
    })?;
    let uri = normalize_endpoint(endpoint);
    let channel = Endpoint::from_shared(uri)
        .map_err(|e| Error::Config(format!("invalid gRPC endpoint `{endpoint}`: {e}")))?
        .user_agent(USER_AGENT)
        .map_err(|e| Error::client(ClientErrorKind::RequestBuild, e.to_string()))?
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT))
        .timeout(timeout)
        .connect_lazy();
    Ok(channel)
}

impl GrpcClient {
    /// Construct a client from a resolved configuration.
    ///
    /// No connection is attempted here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid endpoint or when called
    /// outside a Tokio runtime.
    pub fn new(config: OneConfig) -> Result<Self> {
        let config = config.validated()?;
        let channel = channel(config.endpoint(), config.timeout())?;
        debug!(endpoint = config.endpoint(), timeout = ?config.timeout(), "gRPC client ready");

        Ok(Self {
            channel,
            endpoint: config.endpoint().to_string(),
            timeout: config.timeout(),
            token: Arc::new(RwLock::new(config.token().clone())),
        })
    }

    fn session(&self) -> String {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .expose_secret()
            .to_string()
    }

    async fn unary(
        &self,
        ctx: &CallContext,
        channel: Channel,
        method: &str,
        args: &[Value],
    ) -> Result<Response> {
        // Capability gaps fail before any I/O.
        let path = methods::grpc_path(method)?;
        ctx.check()?;

        let path = PathAndQuery::try_from(path.as_str())
            .map_err(|e| Error::client(ClientErrorKind::RequestBuild, e.to_string()))?;
        let mut request = tonic::Request::new(GrpcRequest::new(self.session(), args.to_vec()));
        if let Some(remaining) = ctx.remaining() {
            request.set_timeout(remaining);
        }
        debug!(method, path = path.as_str(), args = args.len(), "gRPC call");

        let exchange = async move {
            let mut grpc = tonic::client::Grpc::new(channel);
            grpc.ready().await.map_err(|e| {
                Error::client(ClientErrorKind::GrpcFault, format!("service not ready: {e}"))
            })?;
            let codec = tonic_prost::ProstCodec::<GrpcRequest, GrpcReply>::default();
            grpc.unary(request, path, codec)
                .await
                .map(|reply| reply.into_inner().into_response())
                .map_err(|s| status::translate(&s, method))
        };

        let result = ctx.run(exchange).await;
        match &result {
            Ok(response) => debug!(method, body_int = response.body_int, "gRPC call succeeded"),
            Err(err) => debug!(method, error = %err, "gRPC call failed"),
        }
        result
    }
}

#[async_trait]
impl RpcCaller for GrpcClient {
    async fn call_with_context(
        &self,
        ctx: &CallContext,
        method: &str,
        args: &[Value],
    ) -> Result<Response> {
        self.unary(ctx, self.channel.clone(), method, args).await
    }

    async fn endpoint_call(
        &self,
        ctx: &CallContext,
        endpoint: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Response> {
        let channel = channel(endpoint, self.timeout)?;
        self.unary(ctx, channel, method, args).await
    }

    fn transport(&self) -> Transport {
        Transport::Grpc
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    fn set_token(&self, token: &str) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) =
            SecretString::from(token.to_string());
        debug!("gRPC session token replaced");
    }
}
