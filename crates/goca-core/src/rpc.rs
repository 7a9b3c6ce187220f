//! The RPC caller capability shared by every transport.
//!
//! Resource controllers only ever see [`RpcCaller`], [`Value`] and
//! [`Response`]. The XML-RPC and gRPC backends implement the trait and prepend
//! the session token themselves.

use crate::config::Transport;
use crate::error::{ClientErrorKind, Error, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
pub use tokio_util::sync::CancellationToken;

/// A positional argument of an OpenNebula call.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 32-bit integer (`i4`)
    Int(i32),
    /// 64-bit integer (`i8`)
    I8(i64),
    /// Boolean
    Bool(bool),
    /// String
    String(String),
    /// Double precision float
    Double(f64),
    /// Array of values
    Array(Vec<Value>),
}

impl Value {
    /// Name of the XML-RPC type tag for this value.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "i4",
            Self::I8(_) => "i8",
            Self::Bool(_) => "boolean",
            Self::String(_) => "string",
            Self::Double(_) => "double",
            Self::Array(_) => "array",
        }
    }

    /// The boolean, if this is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is an `i4`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The string, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I8(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

/// Normalized result of a successful call, identical across transports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Always true for values returned through `Ok`
    pub success: bool,
    /// Text body (usually an XML document); empty when the body was an integer
    pub body: String,
    /// Integer body (usually an object ID); zero when the body was text
    pub body_int: i32,
}

impl Response {
    /// Successful response with a text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            success: true,
            body: body.into(),
            body_int: 0,
        }
    }

    /// Successful response with an integer body.
    #[must_use]
    pub const fn int(body_int: i32) -> Self {
        Self {
            success: true,
            body: String::new(),
            body_int,
        }
    }

    /// Text body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Integer body.
    #[must_use]
    pub const fn body_int(&self) -> i32 {
        self.body_int
    }
}

/// Per-call deadline and cancellation.
///
/// The default context never expires and cannot be cancelled.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl CallContext {
    /// A context without deadline or cancellation.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Expire the call after `timeout`, counted from now.
    ///
    /// An earlier deadline already on the context is kept.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Expire the call at `deadline`.
    ///
    /// An earlier deadline already on the context is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Cancel the call when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `Some(ZERO)` once expired.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// True once the cancellation token fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Fail fast when the context is already cancelled or expired.
    ///
    /// # Errors
    ///
    /// Returns a `Cancelled` or `DeadlineExceeded` client error.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(cancelled_error());
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(deadline_error());
        }
        Ok(())
    }

    /// Drive `fut` until it completes, the deadline passes, or the call is cancelled.
    ///
    /// Losing the race drops `fut`, which aborts any in-flight I/O it owns.
    ///
    /// # Errors
    ///
    /// Returns the future's own error, or a `Cancelled` / `DeadlineExceeded`
    /// client error.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => Err(cancelled_error()),
            () = expired => Err(deadline_error()),
            result = fut => result,
        }
    }
}

fn cancelled_error() -> Error {
    Error::client(ClientErrorKind::Cancelled, "call cancelled by caller")
}

fn deadline_error() -> Error {
    Error::client(ClientErrorKind::DeadlineExceeded, "call deadline exceeded")
}

/// Capability to invoke OpenNebula remote procedures.
///
/// Implementations prepend the session token transparently: as argument 0 for
/// XML-RPC, as the `session_id` field for gRPC.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RpcCaller: Send + Sync {
    /// Invoke `method` with `args`, honoring the context's deadline and cancellation.
    ///
    /// # Errors
    ///
    /// Returns a client error when the call did not produce a valid answer and a
    /// response error when the server rejected it.
    async fn call_with_context(
        &self,
        ctx: &CallContext,
        method: &str,
        args: &[Value],
    ) -> Result<Response>;

    /// Invoke `method` against another endpoint with the same credentials.
    ///
    /// Used to reach the federation master or another zone.
    ///
    /// # Errors
    ///
    /// Same as [`RpcCaller::call_with_context`].
    async fn endpoint_call(
        &self,
        ctx: &CallContext,
        endpoint: &str,
        method: &str,
        args: &[Value],
    ) -> Result<Response>;

    /// Transport implemented by this caller.
    fn transport(&self) -> Transport;

    /// Endpoint this caller talks to.
    fn endpoint(&self) -> String;

    /// Replace the session token used by subsequent calls.
    fn set_token(&self, token: &str);

    /// Invoke `method` with a background context.
    ///
    /// # Errors
    ///
    /// Same as [`RpcCaller::call_with_context`].
    async fn call(&self, method: &str, args: &[Value]) -> Result<Response> {
        self.call_with_context(&CallContext::background(), method, args)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_conversions() {
        assert_eq!(Value::from(7), Value::Int(7));
        assert_eq!(Value::from(7_i64), Value::I8(7));
        assert_eq!(Value::from("x"), Value::String("x".into()));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(3).as_int(), Some(3));
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::from(1.5).type_name(), "double");
    }

    #[test]
    fn response_constructors() {
        let r = Response::text("<VM/>");
        assert!(r.success);
        assert_eq!(r.body(), "<VM/>");
        assert_eq!(r.body_int(), 0);

        let r = Response::int(42);
        assert!(r.success);
        assert!(r.body().is_empty());
        assert_eq!(r.body_int(), 42);
    }

    #[test]
    fn earliest_deadline_wins() {
        let now = Instant::now();
        let ctx = CallContext::background()
            .with_deadline(now + Duration::from_secs(10))
            .with_deadline(now + Duration::from_secs(20));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn expired_deadline_fails_without_polling() {
        let polled = std::sync::atomic::AtomicBool::new(false);
        let ctx = CallContext::background().with_deadline(Instant::now());
        let result: Result<()> = ctx
            .run(async {
                polled.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(
            result.unwrap_err().client_kind(),
            Some(ClientErrorKind::DeadlineExceeded)
        );
    }

    #[tokio::test]
    async fn deadline_interrupts_slow_future() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let result: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;
        assert!(result.unwrap_err().is_cancellation());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancellation_interrupts_future() {
        let token = CancellationToken::new();
        let ctx = CallContext::background().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let result: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;
        canceller.await.unwrap();
        assert_eq!(
            result.unwrap_err().client_kind(),
            Some(ClientErrorKind::Cancelled)
        );
    }

    #[tokio::test]
    async fn completed_future_passes_through() {
        let ctx = CallContext::background().with_timeout(Duration::from_secs(5));
        let value = ctx.run(async { Ok(5) }).await.unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn mock_caller_sees_method_and_context() {
        let mut mock = MockRpcCaller::new();
        mock.expect_call_with_context()
            .withf(|ctx, method, args| {
                ctx.deadline().is_none() && method == "one.system.version" && args.is_empty()
            })
            .times(1)
            .returning(|_, _, _| Ok(Response::text("6.10.0")));

        let caller: &dyn RpcCaller = &mock;
        let response = caller
            .call_with_context(&CallContext::background(), "one.system.version", &[])
            .await
            .unwrap();
        assert_eq!(response.body(), "6.10.0");
    }
}
