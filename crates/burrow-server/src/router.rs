//! Method dispatch for incoming JSON-RPC lines

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::handlers;
use crate::rpc::{Request, Response, RpcError};
use crate::ServerState;

/// Parse one wire line and dispatch it. Returns the serialized response
/// line, or `None` for notifications.
pub async fn handle_line(
    state: &Arc<ServerState>,
    outbound: &UnboundedSender<String>,
    line: &str,
) -> Option<String> {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!("Unparseable message: {}", e);
            let response =
                Response::failure(Value::Null, RpcError::parse_error(e.to_string()));
            return serialize(response);
        }
    };

    dispatch(state, outbound, request).await.and_then(serialize)
}

/// Route a request by method. Notifications (no id) run their handler
/// and return nothing, even on failure.
pub async fn dispatch(
    state: &Arc<ServerState>,
    outbound: &UnboundedSender<String>,
    request: Request,
) -> Option<Response> {
    debug!("Dispatching method: {}", request.method);
    let params = request.params.clone().unwrap_or(Value::Null);

    let result = match request.method.as_str() {
        "initialize" => handlers::initialize(state, outbound, params).await,
        "initialized" => {
            debug!("Client reports initialization complete");
            return None;
        }
        "shutdown" => handlers::shutdown(state),
        "textDocument/didOpen" => {
            handlers::did_open(state, params).await;
            return None;
        }
        "textDocument/didChange" => {
            handlers::did_change(state, params).await;
            return None;
        }
        "textDocument/didClose" => {
            handlers::did_close(state, params);
            return None;
        }
        "textDocument/didSave" => {
            handlers::did_save(state, params).await;
            return None;
        }
        "textDocument/completion" => handlers::completion(state, params),
        "completionItem/resolve" => handlers::resolve_completion_item(params),
        "workspace/executeCommand" => handlers::execute_command(params),
        "$/cancelRequest" => {
            handlers::cancel_request(params);
            return None;
        }
        method => {
            if request.is_notification() {
                debug!("Ignoring unknown notification: {}", method);
                return None;
            }
            Err(RpcError::method_not_found(method))
        }
    };

    // A response needs an id; a notification gets none even if the
    // handler failed.
    let id = request.id?;
    Some(match result {
        Ok(value) => Response::success(id, value),
        Err(error) => Response::failure(id, error),
    })
}

fn serialize(response: Response) -> Option<String> {
    match serde_json::to_string(&response) {
        Ok(line) => Some(line),
        Err(e) => {
            warn!("Failed to serialize response: {}", e);
            None
        }
    }
}
