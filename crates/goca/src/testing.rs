//! Mock caller shared by the unit tests.

use crate::controller::Controller;
use async_trait::async_trait;
use goca_core::{CallContext, Response, Result, RpcCaller, Transport, Value};
use mockall::mock;
use std::sync::Arc;

mock! {
    pub Caller {}

    #[async_trait]
    impl RpcCaller for Caller {
        async fn call_with_context(
            &self,
            ctx: &CallContext,
            method: &str,
            args: &[Value],
        ) -> Result<Response>;
        async fn endpoint_call(
            &self,
            ctx: &CallContext,
            endpoint: &str,
            method: &str,
            args: &[Value],
        ) -> Result<Response>;
        fn transport(&self) -> Transport;
        fn endpoint(&self) -> String;
        fn set_token(&self, token: &str);
    }
}

/// Controller whose caller expects exactly one call of `method` with `args`.
pub fn expect_call(
    method: &'static str,
    args: Vec<Value>,
    reply: Result<Response>,
) -> Controller {
    let mut caller = MockCaller::new();
    caller
        .expect_call_with_context()
        .withf(move |_, m, a| m == method && a == args.as_slice())
        .times(1)
        .returning(move |_, _, _| reply.clone());
    Controller::new(Arc::new(caller))
}
