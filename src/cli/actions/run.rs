use super::Action;
use crate::server::{self, AppState};

/// Execute the action's business logic by delegating to the appropriate module
pub async fn execute(action: Action) -> anyhow::Result<()> {
    match action {
        Action::Serve {
            listen,
            port,
            target,
            certs_dir,
        } => server::start(listen, port, AppState::new(target, certs_dir)).await,
    }
}
