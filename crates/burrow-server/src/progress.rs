//! `$/progress` work-done notifications

use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::rpc::Notification;

/// Handle to one work-done progress token. Messages go out on the
/// connection's outbound line channel.
pub struct Progress {
    token: String,
    title: String,
    outbound: UnboundedSender<String>,
}

impl Progress {
    pub fn new(token: &str, title: &str, outbound: UnboundedSender<String>) -> Self {
        Progress {
            token: token.to_string(),
            title: title.to_string(),
            outbound,
        }
    }

    pub fn begin(&self, message: &str) {
        self.notify(json!({
            "token": self.token,
            "value": {
                "kind": "begin",
                "title": self.title,
                "message": message,
                "cancellable": false,
                "percentage": 0
            }
        }));
    }

    pub fn report(&self, message: &str, percentage: u32) {
        self.notify(json!({
            "token": self.token,
            "value": {
                "kind": "report",
                "message": message,
                "cancellable": false,
                "percentage": percentage
            }
        }));
    }

    pub fn end(&self, message: &str) {
        self.notify(json!({
            "token": self.token,
            "value": {
                "kind": "end",
                "message": message
            }
        }));
    }

    fn notify(&self, params: serde_json::Value) {
        let notification = Notification::new("$/progress", params);
        match serde_json::to_string(&notification) {
            Ok(line) => {
                // The receiver is gone when the connection closed mid-scan.
                if self.outbound.send(line).is_err() {
                    debug!("progress notification dropped: connection closed");
                }
            }
            Err(e) => debug!("failed to serialize progress notification: {}", e),
        }
    }
}
