use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tars_common::PollPolicy;
use tars_platform::{HttpControlPlane, HttpRuntime, HttpSettings};
use tars_provision::{Invoker, Provisioner};

use crate::args::Args;

/// Gateway settings for the control plane and the runtime.
#[derive(Debug, Clone)]
pub struct Connection {
    control: HttpSettings,
    runtime: HttpSettings,
}

impl Connection {
    pub fn from_args(args: &Args) -> Self {
        let settings = |base_url: &str| {
            HttpSettings::new(base_url)
                .with_token(args.token.clone())
                .with_request_timeout(Duration::from_secs(args.request_timeout_secs))
        };
        let runtime_url = args.runtime_url.as_deref().unwrap_or(&args.control_plane_url);
        Self {
            control: settings(&args.control_plane_url),
            runtime: settings(runtime_url),
        }
    }

    pub fn provisioner(&self, readiness: PollPolicy) -> Result<Provisioner> {
        let control = HttpControlPlane::new(self.control.clone())?;
        let runtime = HttpRuntime::new(self.runtime.clone())?;
        Ok(Provisioner::new(Arc::new(control), Arc::new(runtime)).with_readiness(readiness))
    }

    pub fn invoker(&self, endpoint: &str) -> Result<Invoker> {
        let runtime = HttpRuntime::new(self.runtime.clone())?;
        Ok(Invoker::new(Arc::new(runtime), endpoint))
    }
}
