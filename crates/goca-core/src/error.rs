//! Error types for OpenNebula operations.
//!
//! Two families are kept apart: client errors, raised when a call never produced
//! a valid application-level answer, and response errors, raised when the
//! OpenNebula server understood the request and rejected it. Response errors
//! carry the server's numeric error code verbatim.

use std::fmt;
use thiserror::Error;

/// Numeric error codes defined by the OpenNebula server.
///
/// The numeric values are part of the wire contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `0x0000`
    Success,
    /// `0x0100`: the session token was rejected
    Authentication,
    /// `0x0200`: the user lacks rights for the operation
    Authorization,
    /// `0x0400`: the object does not exist
    NoExists,
    /// `0x0800`: the object is in the wrong state for the action
    Action,
    /// `0x1000`: a parameter was malformed
    XmlRpcApi,
    /// `0x2000`: internal server error
    Internal,
    /// `0x4000`: allocation failed (quota, capacity)
    Allocate,
    /// `0x8000`: the object is locked
    Locked,
    /// `0x10000`: the request could not be replicated to the federation
    Replication,
    /// Any value not listed above, propagated unchanged
    Other(i32),
}

impl ErrorCode {
    /// Decode a numeric code returned by the server.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        match code {
            0x0000 => Self::Success,
            0x0100 => Self::Authentication,
            0x0200 => Self::Authorization,
            0x0400 => Self::NoExists,
            0x0800 => Self::Action,
            0x1000 => Self::XmlRpcApi,
            0x2000 => Self::Internal,
            0x4000 => Self::Allocate,
            0x8000 => Self::Locked,
            0x10000 => Self::Replication,
            other => Self::Other(other),
        }
    }

    /// The numeric value sent over the wire.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0x0000,
            Self::Authentication => 0x0100,
            Self::Authorization => 0x0200,
            Self::NoExists => 0x0400,
            Self::Action => 0x0800,
            Self::XmlRpcApi => 0x1000,
            Self::Internal => 0x2000,
            Self::Allocate => 0x4000,
            Self::Locked => 0x8000,
            Self::Replication => 0x10000,
            Self::Other(code) => code,
        }
    }

    /// Server-side constant name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Authentication => "AUTHENTICATION",
            Self::Authorization => "AUTHORIZATION",
            Self::NoExists => "NO_EXISTS",
            Self::Action => "ACTION",
            Self::XmlRpcApi => "XML_RPC_API",
            Self::Internal => "INTERNAL",
            Self::Allocate => "ALLOCATE",
            Self::Locked => "LOCKED",
            Self::Replication => "REPLICATION",
            Self::Other(_) => "UNKNOWN",
        }
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        Self::from_i32(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#06x})", self.name(), self.as_i32())
    }
}

/// Kind of a client-side (transport or encoding) failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientErrorKind {
    /// The request could not be built
    RequestBuild,
    /// The HTTP request failed before a response arrived
    RequestHttp,
    /// The HTTP response carried a non-2xx status
    ResponseHttp,
    /// The XML-RPC response was a `<fault>`
    ResponseXmlRpcFault,
    /// The XML-RPC envelope could not be parsed
    ResponseXmlRpcParse,
    /// The payload did not follow the `[bool, body, code]` convention
    ResponseOneParse,
    /// The gRPC call failed without a usable status
    GrpcFault,
    /// The call was cancelled by the caller
    Cancelled,
    /// The call deadline expired
    DeadlineExceeded,
    /// A response body could not be decoded into the requested type
    Unmarshal,
}

impl ClientErrorKind {
    /// Stable label for this kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RequestBuild => "request build",
            Self::RequestHttp => "HTTP request",
            Self::ResponseHttp => "HTTP response",
            Self::ResponseXmlRpcFault => "XML-RPC fault",
            Self::ResponseXmlRpcParse => "XML-RPC parse",
            Self::ResponseOneParse => "OpenNebula response parse",
            Self::GrpcFault => "gRPC fault",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline exceeded",
            Self::Unmarshal => "unmarshal",
        }
    }
}

impl fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Main error type for OpenNebula operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The call never produced a valid application-level answer
    #[error("Client error ({kind}): {message}")]
    Client {
        /// What went wrong
        kind: ClientErrorKind,
        /// Details, including the underlying cause
        message: String,
    },

    /// The server rejected the operation
    #[error("OpenNebula error {code}: {message}")]
    Response {
        /// Server error code
        code: ErrorCode,
        /// Server message, verbatim
        message: String,
    },

    /// Configuration or credential resolution failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The method is not available over the selected transport
    #[error("Operation `{method}` is not supported over {transport}")]
    UnsupportedOperation {
        /// OpenNebula method name
        method: String,
        /// Transport name
        transport: String,
    },

    /// Dynamic template lookup failed
    #[error("Template error: {0}")]
    Template(String),

    /// A client-side argument check failed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Specialized result type for OpenNebula operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a client error.
    pub fn client(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self::Client {
            kind,
            message: message.into(),
        }
    }

    /// Build a response error from a raw server code.
    pub fn response(code: i32, message: impl Into<String>) -> Self {
        Self::Response {
            code: ErrorCode::from_i32(code),
            message: message.into(),
        }
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Client { kind, .. } => match kind {
                ClientErrorKind::RequestBuild => "CLIENT_REQ_BUILD",
                ClientErrorKind::RequestHttp => "CLIENT_REQ_HTTP",
                ClientErrorKind::ResponseHttp => "CLIENT_RESP_HTTP",
                ClientErrorKind::ResponseXmlRpcFault => "CLIENT_RESP_XMLRPC_FAULT",
                ClientErrorKind::ResponseXmlRpcParse => "CLIENT_RESP_XMLRPC_PARSE",
                ClientErrorKind::ResponseOneParse => "CLIENT_RESP_ONE_PARSE",
                ClientErrorKind::GrpcFault => "CLIENT_GRPC_FAULT",
                ClientErrorKind::Cancelled => "CLIENT_CANCELLED",
                ClientErrorKind::DeadlineExceeded => "CLIENT_DEADLINE_EXCEEDED",
                ClientErrorKind::Unmarshal => "CLIENT_UNMARSHAL",
            },
            Self::Response { code, .. } => code.name(),
            Self::Config(_) => "CONFIG_ERROR",
            Self::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
            Self::Template(_) => "TEMPLATE_ERROR",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
        }
    }

    /// Server error code, when the server rejected the call.
    #[must_use]
    pub const fn response_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Response { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Client error kind, when the call failed on the client side.
    #[must_use]
    pub const fn client_kind(&self) -> Option<ClientErrorKind> {
        match self {
            Self::Client { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True for transport and encoding failures.
    #[must_use]
    pub const fn is_client(&self) -> bool {
        matches!(self, Self::Client { .. })
    }

    /// True when the server explicitly rejected the operation.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self, Self::Response { .. })
    }

    /// True when the call was cancelled or its deadline expired.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Self::Client {
                kind: ClientErrorKind::Cancelled | ClientErrorKind::DeadlineExceeded,
                ..
            }
        )
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Client {
                    kind: ClientErrorKind::ResponseOneParse
                        | ClientErrorKind::ResponseXmlRpcParse
                        | ClientErrorKind::GrpcFault,
                    ..
                }
                | Self::Response {
                    code: ErrorCode::Internal,
                    ..
                }
        )
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::client(ClientErrorKind::DeadlineExceeded, err.to_string())
        } else if err.is_builder() {
            Self::client(ClientErrorKind::RequestBuild, err.to_string())
        } else {
            Self::client(ClientErrorKind::RequestHttp, err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("invalid endpoint: {err}"))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Self::client(ClientErrorKind::Unmarshal, err.to_string())
    }
}

impl From<quick_xml::DeError> for Error {
    fn from(err: quick_xml::DeError) -> Self {
        Self::client(ClientErrorKind::Unmarshal, err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}
