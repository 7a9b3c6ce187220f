//! XML-RPC envelope encoding and OpenNebula response decoding.
//!
//! Requests are plain `methodCall` documents whose first parameter is the
//! session token. Responses carry a single array value following the
//! `[success, body, error_code]` convention.

use goca_core::xml::XmlElement;
use goca_core::{ClientErrorKind, Error, Response, Result, Value};
use quick_xml::escape::escape;
use std::fmt::Write;
use tracing::warn;

/// Build a `methodCall` document for `method` with `token` as argument 0.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for a NaN or infinite double, which
/// `<double>` cannot carry.
pub fn encode_call(method: &str, token: &str, args: &[Value]) -> Result<String> {
    args.iter().try_for_each(check_encodable)?;

    let mut out = String::with_capacity(256);
    out.push_str("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    push_param(&mut out, &Value::String(token.to_string()));
    for arg in args {
        push_param(&mut out, arg);
    }
    out.push_str("</params></methodCall>");
    Ok(out)
}

fn check_encodable(value: &Value) -> Result<()> {
    match value {
        Value::Double(v) if !v.is_finite() => Err(Error::InvalidArgument(format!(
            "XML-RPC cannot encode double {v}"
        ))),
        Value::Array(items) => items.iter().try_for_each(check_encodable),
        _ => Ok(()),
    }
}

/// Build a `methodResponse` document carrying `value`.
///
/// Used by in-process test servers.
#[must_use]
pub fn encode_response(value: &Value) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodResponse><params>");
    push_param(&mut out, value);
    out.push_str("</params></methodResponse>");
    out
}

/// Build a `<fault>` response document.
#[must_use]
pub fn encode_fault(code: i32, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
         <member><name>faultCode</name><value><int>{code}</int></value></member>\
         <member><name>faultString</name><value><string>{}</string></value></member>\
         </struct></value></fault></methodResponse>",
        escape(message)
    )
}

/// Decode an HTTP body into the OpenNebula response it carries.
///
/// # Errors
///
/// * `ResponseXmlRpcFault` for `<fault>` documents
/// * `ResponseXmlRpcParse` for anything that is not a `methodResponse`
/// * `ResponseOneParse` when the value breaks the 3-tuple convention
/// * [`Error::Response`] when the server reported a failure
pub fn decode_response(body: &str) -> Result<Response> {
    let root = XmlElement::parse(body).map_err(|e| parse_error(&e.to_string()))?;
    if root.name != "methodResponse" {
        return Err(parse_error(&format!("unexpected root element <{}>", root.name)));
    }

    if let Some(fault) = root.child("fault") {
        return Err(decode_fault(fault));
    }

    let value = root
        .child("params")
        .and_then(|p| p.child("param"))
        .and_then(|p| p.child("value"))
        .ok_or_else(|| parse_error("methodResponse has no value"))?;

    into_response(decode_value(value)?)
}

/// Apply the `[bool status, string|int body, int code]` convention.
///
/// Elements past the third are ignored: some calls append the ID of the
/// object that caused a failure.
///
/// # Errors
///
/// `ResponseOneParse` on a shape violation, [`Error::Response`] when
/// `status` is false.
pub fn into_response(value: Value) -> Result<Response> {
    let Value::Array(items) = value else {
        return Err(one_parse(format!("expected array, got {}", value.type_name())));
    };
    let [status, body, code, ..] = items.as_slice() else {
        return Err(one_parse(format!(
            "expected 3 elements, got {}",
            items.len()
        )));
    };

    let status = status
        .as_bool()
        .ok_or_else(|| one_parse(format!("status is {}, not boolean", status.type_name())))?;
    let code = code
        .as_int()
        .ok_or_else(|| one_parse(format!("error code is {}, not int", code.type_name())))?;

    match (status, body) {
        (true, Value::String(text)) => Ok(Response::text(text.clone())),
        (true, Value::Int(id)) => Ok(Response::int(*id)),
        (false, Value::String(message)) => Err(Error::response(code, message.clone())),
        (false, Value::Int(id)) => Err(Error::response(code, id.to_string())),
        (_, other) => Err(one_parse(format!(
            "body is {}, not string or int",
            other.type_name()
        ))),
    }
}

fn push_param(out: &mut String, value: &Value) {
    out.push_str("<param>");
    push_value(out, value);
    out.push_str("</param>");
}

fn push_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(v) => {
            let _ = write!(out, "<i4>{v}</i4>");
        }
        Value::I8(v) => {
            let _ = write!(out, "<i8>{v}</i8>");
        }
        Value::Bool(v) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*v));
        }
        Value::String(v) => {
            let _ = write!(out, "<string>{}</string>", escape(v.as_str()));
        }
        Value::Double(v) => {
            let _ = write!(out, "<double>{v}</double>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                push_value(out, item);
            }
            out.push_str("</data></array>");
        }
    }
    out.push_str("</value>");
}

fn decode_value(value: &XmlElement) -> Result<Value> {
    // A bare <value>text</value> is a string.
    let Some(typed) = value.children.first() else {
        return Ok(Value::String(value.text.clone()));
    };

    let text = typed.text.as_str();
    match typed.name.as_str() {
        "i4" | "int" => text
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|e| parse_error(&format!("bad int `{text}`: {e}"))),
        "i8" => text
            .trim()
            .parse()
            .map(Value::I8)
            .map_err(|e| parse_error(&format!("bad i8 `{text}`: {e}"))),
        "boolean" => match text.trim() {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            other => Err(parse_error(&format!("bad boolean `{other}`"))),
        },
        "double" => text
            .trim()
            .parse()
            .map(Value::Double)
            .map_err(|e| parse_error(&format!("bad double `{text}`: {e}"))),
        "string" | "dateTime.iso8601" | "base64" => Ok(Value::String(text.to_string())),
        "array" => typed
            .child("data")
            .map_or_else(
                || Ok(Vec::new()),
                |data| data.children_named("value").map(decode_value).collect(),
            )
            .map(Value::Array),
        other => Err(parse_error(&format!("unsupported value type <{other}>"))),
    }
}

fn decode_fault(fault: &XmlElement) -> Error {
    let members = fault
        .child("value")
        .and_then(|v| v.child("struct"))
        .map(|s| s.children_named("member").collect::<Vec<_>>())
        .unwrap_or_default();

    let mut code = None;
    let mut message = None;
    for member in members {
        let value = member.child("value").and_then(|v| decode_value(v).ok());
        match member.child_text("name") {
            Some("faultCode") => code = value.and_then(|v| v.as_int()),
            Some("faultString") => message = value.and_then(|v| v.as_str().map(str::to_string)),
            _ => {}
        }
    }

    Error::client(
        ClientErrorKind::ResponseXmlRpcFault,
        format!(
            "fault {}: {}",
            code.map_or_else(|| "?".to_string(), |c| c.to_string()),
            message.unwrap_or_default()
        ),
    )
}

fn parse_error(detail: &str) -> Error {
    warn!(detail, "unparsable XML-RPC response");
    Error::client(ClientErrorKind::ResponseXmlRpcParse, detail)
}

fn one_parse(detail: String) -> Error {
    warn!(%detail, "response breaks the OpenNebula convention");
    Error::client(ClientErrorKind::ResponseOneParse, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use goca_core::ErrorCode;

    fn tuple(status: bool, body: Value, code: i32) -> String {
        encode_response(&Value::Array(vec![
            Value::Bool(status),
            body,
            Value::Int(code),
        ]))
    }

    #[test]
    fn call_puts_token_first() {
        let xml = encode_call(
            "one.vm.action",
            "oneadmin:secret",
            &[Value::from("terminate"), Value::from(42)],
        )
        .unwrap();
        assert!(xml.contains("<methodName>one.vm.action</methodName>"));
        let token = xml.find("<string>oneadmin:secret</string>").unwrap();
        let action = xml.find("<string>terminate</string>").unwrap();
        let id = xml.find("<i4>42</i4>").unwrap();
        assert!(token < action && action < id);
    }

    #[test]
    fn call_escapes_strings() {
        let xml =
            encode_call("one.vm.update", "t", &[Value::from("NAME=\"a<b>&c\"")]).unwrap();
        assert!(xml.contains("<string>NAME=&quot;a&lt;b&gt;&amp;c&quot;</string>"));
    }

    #[test]
    fn call_encodes_every_type() {
        let xml = encode_call(
            "m",
            "t",
            &[
                Value::Bool(true),
                Value::I8(1 << 40),
                Value::Double(1.5),
                Value::Array(vec![Value::Int(1), Value::Int(2)]),
            ],
        )
        .unwrap();
        assert!(xml.contains("<boolean>1</boolean>"));
        assert!(xml.contains("<i8>1099511627776</i8>"));
        assert!(xml.contains("<double>1.5</double>"));
        assert!(xml.contains(
            "<array><data><value><i4>1</i4></value><value><i4>2</i4></value></data></array>"
        ));
    }

    #[test]
    fn call_rejects_non_finite_doubles() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = encode_call("m", "t", &[Value::Double(bad)]).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{bad}");
        }
        let nested = Value::Array(vec![Value::Double(0.5), Value::Double(f64::NAN)]);
        assert!(encode_call("m", "t", &[nested]).is_err());
    }

    #[test]
    fn trailing_elements_are_ignored() {
        let document = encode_response(&Value::Array(vec![
            Value::Bool(false),
            Value::from("[one.vm.allocate] Cannot get IP/MAC lease"),
            Value::Int(0x0800),
            Value::Int(3),
        ]));
        let err = decode_response(&document).unwrap_err();
        assert_eq!(err.response_code(), Some(ErrorCode::Action));
        assert!(err.to_string().contains("Cannot get IP/MAC lease"));
    }

    #[test]
    fn success_with_text_body() {
        let body = tuple(true, Value::from("<VM><ID>1</ID></VM>"), 0);
        let response = decode_response(&body).unwrap();
        assert!(response.success);
        assert_eq!(response.body(), "<VM><ID>1</ID></VM>");
        assert_eq!(response.body_int(), 0);
    }

    #[test]
    fn success_with_int_body() {
        let response = decode_response(&tuple(true, Value::Int(17), 0)).unwrap();
        assert_eq!(response.body_int(), 17);
        assert!(response.body().is_empty());
    }

    #[test]
    fn failure_keeps_code_and_message() {
        let err = decode_response(&tuple(false, Value::from("message"), 0x0800)).unwrap_err();
        assert_eq!(err.response_code(), Some(ErrorCode::Action));
        assert_eq!(err.response_code().unwrap().as_i32(), 0x0800);
        match err {
            Error::Response { message, .. } => assert_eq!(message, "message"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn fault_is_a_client_error() {
        let err = decode_response(&encode_fault(-32601, "unknown method")).unwrap_err();
        assert_eq!(err.client_kind(), Some(ClientErrorKind::ResponseXmlRpcFault));
        assert!(err.to_string().contains("-32601"));
        assert!(err.to_string().contains("unknown method"));
    }

    #[test]
    fn malformed_envelope() {
        for body in ["not xml at all <", "<html><body>oops</body></html>", "<methodResponse/>"] {
            let err = decode_response(body).unwrap_err();
            assert_eq!(
                err.client_kind(),
                Some(ClientErrorKind::ResponseXmlRpcParse),
                "{body}"
            );
        }
    }

    #[test]
    fn shape_violations() {
        let cases = [
            encode_response(&Value::from("plain")),
            encode_response(&Value::Array(vec![Value::Bool(true), Value::from("x")])),
            tuple(true, Value::Bool(false), 0),
            encode_response(&Value::Array(vec![
                Value::from("yes"),
                Value::from("x"),
                Value::Int(0),
            ])),
            encode_response(&Value::Array(vec![
                Value::Bool(true),
                Value::from("x"),
                Value::from("0"),
            ])),
        ];
        for body in cases {
            let err = decode_response(&body).unwrap_err();
            assert_eq!(err.client_kind(), Some(ClientErrorKind::ResponseOneParse));
        }
    }

    #[test]
    fn untyped_value_is_a_string() {
        let body = "<methodResponse><params><param><value><array><data>\
                    <value><boolean>1</boolean></value><value>plain text</value>\
                    <value><int>0</int></value></data></array></value></param></params>\
                    </methodResponse>";
        assert_eq!(decode_response(body).unwrap().body(), "plain text");
    }

    #[test]
    fn text_body_round_trips_markup() {
        let xml = "<ACL_POOL><ACL><STRING>#0 HOST/* USE #0</STRING></ACL></ACL_POOL>";
        let response = decode_response(&tuple(true, Value::from(xml), 0)).unwrap();
        assert_eq!(response.body(), xml);
    }
}
