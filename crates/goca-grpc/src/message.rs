//! Protobuf messages shared by every OpenNebula gRPC method.
//!
//! OpenNebula request messages all start with `string session_id = 1;`
//! followed by the operation's arguments in call order, so a single message
//! type carrying positional [`Value`]s encodes any of them. Replies carry
//! either `string xml = 1;` or `int32 oid = 1;`.

use goca_core::{Response, Value};
use prost::bytes::{Buf, BufMut};
use prost::encoding::{self, DecodeContext, WireType};
use prost::DecodeError;

/// Field number of the session token.
pub const SESSION_TAG: u32 = 1;

/// Field number of the first positional argument.
pub const FIRST_ARG_TAG: u32 = 2;

/// Field number of the reply payload.
pub const REPLY_TAG: u32 = 1;

/// Request message: session token plus positional arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrpcRequest {
    /// Session token (`user:password`)
    pub session_id: String,
    /// Arguments, numbered from [`FIRST_ARG_TAG`]
    pub args: Vec<Value>,
}

impl GrpcRequest {
    /// Build a request.
    pub fn new(session_id: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            session_id: session_id.into(),
            args,
        }
    }
}

fn arg_tag(index: usize) -> u32 {
    u32::try_from(index).map_or(u32::MAX, |i| i.saturating_add(FIRST_ARG_TAG))
}

fn encode_value(tag: u32, value: &Value, buf: &mut impl BufMut) {
    match value {
        Value::Int(v) => encoding::int32::encode(tag, v, buf),
        Value::I8(v) => encoding::int64::encode(tag, v, buf),
        Value::Bool(v) => encoding::bool::encode(tag, v, buf),
        Value::String(v) => encoding::string::encode(tag, v, buf),
        Value::Double(v) => encoding::double::encode(tag, v, buf),
        // Repeated field, one entry per element.
        Value::Array(items) => {
            for item in items {
                encode_value(tag, item, buf);
            }
        }
    }
}

fn value_len(tag: u32, value: &Value) -> usize {
    match value {
        Value::Int(v) => encoding::int32::encoded_len(tag, v),
        Value::I8(v) => encoding::int64::encoded_len(tag, v),
        Value::Bool(v) => encoding::bool::encoded_len(tag, v),
        Value::String(v) => encoding::string::encoded_len(tag, v),
        Value::Double(v) => encoding::double::encoded_len(tag, v),
        Value::Array(items) => items.iter().map(|item| value_len(tag, item)).sum(),
    }
}

impl prost::Message for GrpcRequest {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        encoding::string::encode(SESSION_TAG, &self.session_id, buf);
        for (index, arg) in self.args.iter().enumerate() {
            encode_value(arg_tag(index), arg, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match (tag, wire_type) {
            (SESSION_TAG, WireType::LengthDelimited) => {
                encoding::string::merge(wire_type, &mut self.session_id, buf, ctx)
            }
            // Argument types are only known to the server.
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        encoding::string::encoded_len(SESSION_TAG, &self.session_id)
            + self
                .args
                .iter()
                .enumerate()
                .map(|(index, arg)| value_len(arg_tag(index), arg))
                .sum::<usize>()
    }

    fn clear(&mut self) {
        self.session_id.clear();
        self.args.clear();
    }
}

/// Reply message: an XML document or an object ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrpcReply {
    /// `string xml = 1`
    pub xml: Option<String>,
    /// `int32 oid = 1`
    pub oid: Option<i32>,
}

impl GrpcReply {
    /// Reply carrying an XML document.
    pub fn xml(xml: impl Into<String>) -> Self {
        Self {
            xml: Some(xml.into()),
            oid: None,
        }
    }

    /// Reply carrying an object ID.
    #[must_use]
    pub const fn oid(oid: i32) -> Self {
        Self {
            xml: None,
            oid: Some(oid),
        }
    }

    /// Normalize into the transport-independent [`Response`].
    ///
    /// An empty reply is an `oid` of zero, the protobuf default.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self.xml {
            Some(xml) => Response::text(xml),
            None => Response::int(self.oid.unwrap_or_default()),
        }
    }
}

impl prost::Message for GrpcReply {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        if let Some(xml) = &self.xml {
            encoding::string::encode(REPLY_TAG, xml, buf);
        } else if let Some(oid) = &self.oid {
            encoding::int32::encode(REPLY_TAG, oid, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match (tag, wire_type) {
            (REPLY_TAG, WireType::LengthDelimited) => {
                let xml = self.xml.get_or_insert_with(String::new);
                encoding::string::merge(wire_type, xml, buf, ctx)
            }
            (REPLY_TAG, WireType::Varint) => {
                let oid = self.oid.get_or_insert(0);
                encoding::int32::merge(wire_type, oid, buf, ctx)
            }
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        if let Some(xml) = &self.xml {
            encoding::string::encoded_len(REPLY_TAG, xml)
        } else if let Some(oid) = &self.oid {
            encoding::int32::encoded_len(REPLY_TAG, oid)
        } else {
            0
        }
    }

    fn clear(&mut self) {
        self.xml = None;
        self.oid = None;
    }
}
