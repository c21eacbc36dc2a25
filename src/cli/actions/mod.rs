mod run;

use crate::target::ProbeTarget;
use std::{net::IpAddr, path::PathBuf};

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    Serve {
        listen: Option<IpAddr>,
        port: u16,
        target: ProbeTarget,
        certs_dir: PathBuf,
    },
}

impl Action {
    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails to execute
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
