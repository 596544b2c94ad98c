//! Wire messages shared by the coordinator, the workers and the client

use crate::common::command::Command;
use serde::{Deserialize, Serialize};

/// Header carrying the transaction id from the coordinator to the workers
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Body of every phase call and of the coordinator's command endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// String result of a phase call or of a whole transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReply {
    pub result: String,
}

impl PhaseReply {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReply {
    pub status: String,
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl From<&Command> for PhaseRequest {
    fn from(cmd: &Command) -> Self {
        Self {
            command: cmd.name.clone(),
            args: cmd.args.clone(),
        }
    }
}

impl From<PhaseRequest> for Command {
    fn from(req: PhaseRequest) -> Self {
        Command::new(req.command, req.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_request_wire_shape() {
        let req = PhaseRequest::from(&Command::put("x", "1"));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["command"], "PUT");
        assert_eq!(json["args"], serde_json::json!(["x", "1"]));

        let cmd: Command = req.into();
        assert_eq!(cmd, Command::put("x", "1"));
    }

    #[test]
    fn test_health_reply_omits_missing_workers() {
        let reply = HealthReply {
            status: "ok".into(),
            node: "worker-1".into(),
            workers: None,
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert!(!json.contains("workers"));
    }
}
