//! Translation of gRPC statuses into the OpenNebula error taxonomy.
//!
//! Server-side rejections map onto the same numeric codes the XML-RPC
//! backend reports, so callers cannot tell the transports apart by error.

use goca_core::{ClientErrorKind, Error, ErrorCode, Transport};
use tonic::{Code, Status};

/// OpenNebula error code for a gRPC status code, if it denotes a server rejection.
#[must_use]
pub const fn error_code(code: Code) -> Option<ErrorCode> {
    match code {
        Code::Unauthenticated => Some(ErrorCode::Authentication),
        Code::PermissionDenied => Some(ErrorCode::Authorization),
        Code::NotFound => Some(ErrorCode::NoExists),
        Code::FailedPrecondition => Some(ErrorCode::Action),
        Code::InvalidArgument | Code::OutOfRange => Some(ErrorCode::XmlRpcApi),
        Code::Internal | Code::DataLoss => Some(ErrorCode::Internal),
        Code::ResourceExhausted | Code::AlreadyExists => Some(ErrorCode::Allocate),
        Code::Aborted => Some(ErrorCode::Locked),
        _ => None,
    }
}

/// Convert a failed call's status into an [`Error`].
#[must_use]
pub fn translate(status: &Status, method: &str) -> Error {
    if let Some(code) = error_code(status.code()) {
        return Error::Response {
            code,
            message: status.message().to_string(),
        };
    }

    match status.code() {
        Code::Cancelled => Error::client(ClientErrorKind::Cancelled, status.message()),
        Code::DeadlineExceeded => {
            Error::client(ClientErrorKind::DeadlineExceeded, status.message())
        }
        Code::Unimplemented => Error::UnsupportedOperation {
            method: method.to_string(),
            transport: Transport::Grpc.to_string(),
        },
        // Unavailable, Unknown and friends: the call never reached a handler.
        other => Error::client(
            ClientErrorKind::GrpcFault,
            format!("{other:?}: {}", status.message()),
        ),
    }
}
