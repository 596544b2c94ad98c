//! Handle to one worker as seen by the coordinator
//!
//! A handle is either remote ([`RemoteWorker`](super::worker_client::RemoteWorker))
//! or an in-process [`WorkerExecutor`](crate::worker::WorkerExecutor).

use crate::common::{Command, Phase, Result};
use async_trait::async_trait;

/// The three phase entry points of a worker.
///
/// `Err` means the call itself failed (transport, timeout). Protocol-level
/// outcomes, including rejected commands, are always `Ok` strings.
#[async_trait]
pub trait WorkerNode: Send + Sync {
    /// Name used in logs and error lines
    fn id(&self) -> &str;

    async fn prepare_command(&self, command: &Command) -> Result<String>;

    async fn commit_command(&self, command: &Command) -> Result<String>;

    async fn rollback_command(&self, command: &Command) -> Result<String>;
}

/// Run `phase` of `command` on `node`
pub async fn invoke(node: &dyn WorkerNode, phase: Phase, command: &Command) -> Result<String> {
    match phase {
        Phase::Prepare => node.prepare_command(command).await,
        Phase::Commit => node.commit_command(command).await,
        Phase::Rollback => node.rollback_command(command).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Phase>>,
    }

    #[async_trait]
    impl WorkerNode for Recorder {
        fn id(&self) -> &str {
            "recorder"
        }

        async fn prepare_command(&self, _command: &Command) -> Result<String> {
            self.calls.lock().unwrap().push(Phase::Prepare);
            Ok("p".into())
        }

        async fn commit_command(&self, _command: &Command) -> Result<String> {
            self.calls.lock().unwrap().push(Phase::Commit);
            Ok("c".into())
        }

        async fn rollback_command(&self, _command: &Command) -> Result<String> {
            self.calls.lock().unwrap().push(Phase::Rollback);
            Ok("r".into())
        }
    }

    #[tokio::test]
    async fn test_invoke_dispatches_by_phase() {
        let node = Recorder::default();
        let cmd = Command::get("k");

        assert_eq!(invoke(&node, Phase::Rollback, &cmd).await.unwrap(), "r");
        assert_eq!(invoke(&node, Phase::Prepare, &cmd).await.unwrap(), "p");
        assert_eq!(invoke(&node, Phase::Commit, &cmd).await.unwrap(), "c");

        assert_eq!(
            *node.calls.lock().unwrap(),
            vec![Phase::Rollback, Phase::Prepare, Phase::Commit]
        );
    }
}
