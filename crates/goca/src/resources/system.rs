//! Server version and configuration.

use crate::controller::Controller;
use goca_core::template::Template;
use goca_core::Result;

/// System calls.
#[derive(Debug, Clone)]
pub struct SystemController {
    ctrl: Controller,
}

impl SystemController {
    pub(crate) fn new(ctrl: Controller) -> Self {
        Self { ctrl }
    }

    /// Version string of the server, e.g. `6.10.0`.
    ///
    /// # Errors
    ///
    /// Returns the call's error.
    pub async fn version(&self) -> Result<String> {
        let response = self.ctrl.call("one.system.version", &[]).await?;
        Ok(response.body().to_string())
    }

    /// Server configuration (`oned.conf`), with repeated keys preserved.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or an `Unmarshal` client error.
    pub async fn config(&self) -> Result<Template> {
        let response = self.ctrl.call("one.system.config", &[]).await?;
        Template::from_xml(response.body())
    }
}
