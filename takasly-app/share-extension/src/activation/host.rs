use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::ActivationAddress;
use crate::error::{Result, ShareError};

/// Capability to wake the host app. Chosen once when the extension is built.
#[async_trait]
pub trait HostActivator: Send + Sync {
    async fn open(&self, address: &ActivationAddress) -> Result<()>;
}

/// Opens the address by running a program with the URL as its final argument,
/// e.g. `xdg-open takasly://share`.
#[derive(Debug, Clone)]
pub struct CommandActivator {
    program: String,
    args: Vec<String>,
}

impl CommandActivator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

#[async_trait]
impl HostActivator for CommandActivator {
    async fn open(&self, address: &ActivationAddress) -> Result<()> {
        let url = address.to_string();
        debug!("Running {} {:?} {}", self.program, self.args, url);

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&url)
            .status()
            .await
            .map_err(|e| ShareError::Activation(format!("could not run {}: {}", self.program, e)))?;

        if !status.success() {
            return Err(ShareError::Activation(format!(
                "{} exited with {}",
                self.program, status
            )));
        }

        info!("Opened {}", url);
        Ok(())
    }
}

/// Used when nothing in this environment can open the address.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableActivator;

#[async_trait]
impl HostActivator for UnavailableActivator {
    async fn open(&self, address: &ActivationAddress) -> Result<()> {
        Err(ShareError::NoActivationHandler(address.to_string()))
    }
}
