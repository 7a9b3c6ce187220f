//! Both transports normalize replies and rejections identically.

use goca::{Error, ErrorCode, Response, Value};
use goca_grpc::message::GrpcReply;
use goca_grpc::status;
use goca_xmlrpc::codec;
use tonic::{Code, Status};

fn xmlrpc(status: bool, body: Value, code: i32) -> goca::Result<Response> {
    let document = codec::encode_response(&Value::Array(vec![
        Value::Bool(status),
        body,
        Value::Int(code),
    ]));
    codec::decode_response(&document)
}

#[test]
fn text_bodies_match() {
    for body in ["<VM><ID>7</ID></VM>", "6.10.0", "", "<T>a &amp; b</T>"] {
        let over_xmlrpc = xmlrpc(true, Value::from(body), 0).unwrap();
        let over_grpc = GrpcReply::xml(body).into_response();
        assert_eq!(over_xmlrpc, over_grpc, "body {body:?}");
        assert_eq!(over_xmlrpc.body_int, 0);
    }
}

#[test]
fn object_ids_match() {
    for id in [0, 42, i32::MAX] {
        let over_xmlrpc = xmlrpc(true, Value::Int(id), 0).unwrap();
        let over_grpc = GrpcReply::oid(id).into_response();
        assert_eq!(over_xmlrpc, over_grpc);
        assert!(over_grpc.body.is_empty());
    }
}

#[test]
fn rejections_match() {
    let cases = [
        (Code::Unauthenticated, ErrorCode::Authentication),
        (Code::PermissionDenied, ErrorCode::Authorization),
        (Code::NotFound, ErrorCode::NoExists),
        (Code::FailedPrecondition, ErrorCode::Action),
        (Code::InvalidArgument, ErrorCode::XmlRpcApi),
        (Code::Internal, ErrorCode::Internal),
    ];
    for (code, expected) in cases {
        let message = "[one.vm.action] Wrong state to perform action";
        let over_xmlrpc = xmlrpc(false, Value::from(message), expected.as_i32()).unwrap_err();
        let over_grpc = status::translate(&Status::new(code, message), "one.vm.action");
        assert_eq!(over_xmlrpc, over_grpc, "{code:?}");
        assert_eq!(over_grpc.response_code(), Some(expected));
    }
}

#[test]
fn action_error_is_0x0800_on_both() {
    let over_xmlrpc = xmlrpc(false, Value::from("message"), 0x0800).unwrap_err();
    assert_eq!(over_xmlrpc, Error::response(0x0800, "message"));
    assert_eq!(over_xmlrpc.response_code().map(ErrorCode::as_i32), Some(0x0800));
    let over_grpc = status::translate(&Status::failed_precondition("message"), "one.vm.deploy");
    assert_eq!(over_grpc, over_xmlrpc);
}
