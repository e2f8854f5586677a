//! The sandbox side of the protocol: accept a connection, read one request,
//! run it, answer, close.

pub mod python;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::protocol::{read_raw_frame, write_frame, ProtocolError, TestingRequest, TestingResponse};

pub use python::PythonBackend;

/// Executes a validated request.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn execute(&self, request: TestingRequest) -> TestingResponse;
}

/// Checks the shape of a raw request payload. The error is the message sent
/// back to the judge.
pub fn validate(payload: &[u8]) -> Result<TestingRequest, String> {
    let value: Value = serde_json::from_slice(payload).map_err(|e| {
        format!(
            "expected a valid JSON payload, got {} ({})",
            String::from_utf8_lossy(&payload[..payload.len().min(64)]),
            e
        )
    })?;
    let Value::Object(fields) = &value else {
        return Err(format!("expected a dictionary, got {value}"));
    };
    if !fields.contains_key("source") || !fields.contains_key("args") {
        return Err("expected keys 'source' and 'args' in request".into());
    }
    if !fields["args"].is_array() {
        return Err(format!(
            "expected request['args'] to be a list, got {}",
            fields["args"]
        ));
    }
    serde_json::from_value(value).map_err(|e| format!("malformed request: {e}"))
}

/// Handles a single connection. Protocol problems are answered with a
/// `CheckFailed` response when the peer is still there to read it.
pub async fn handle_connection(
    mut stream: TcpStream,
    backend: &dyn ExecutionBackend,
) -> Result<(), ProtocolError> {
    let response = match read_raw_frame(&mut stream).await {
        Ok(payload) => match validate(&payload) {
            Ok(request) => {
                info!(time_limit = request.time_limit, "Received request");
                backend.execute(request).await
            }
            Err(message) => {
                warn!("Request is malformed: {}", message);
                TestingResponse::check_failed(message)
            }
        },
        Err(ProtocolError::TooLarge(len)) => {
            TestingResponse::check_failed(format!("request of {len} bytes is too large"))
        }
        Err(e) => return Err(e),
    };
    info!(verdict = response.verdict.tag(), "Testing complete");
    write_frame(&mut stream, &response).await
}

/// Serves connections one at a time until the listener fails.
pub async fn serve(listener: TcpListener, backend: Arc<dyn ExecutionBackend>) -> std::io::Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    loop {
        let (stream, addr) = listener.accept().await?;
        info!("Connection by {}", addr);
        if let Err(e) = handle_connection(stream, backend.as_ref()).await {
            warn!(peer = %addr, error = %e, "connection dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_name_the_problem() {
        assert!(validate(b"not json").unwrap_err().starts_with("expected a valid JSON payload"));
        assert_eq!(validate(b"[1]").unwrap_err(), "expected a dictionary, got [1]");
        assert_eq!(
            validate(br#"{"source": "x"}"#).unwrap_err(),
            "expected keys 'source' and 'args' in request"
        );
        assert_eq!(
            validate(br#"{"source": "x", "args": 3}"#).unwrap_err(),
            "expected request['args'] to be a list, got 3"
        );
        let ok = validate(br#"{"source": "def f(): pass", "args": [1], "time_limit": 2}"#).unwrap();
        assert_eq!(ok.time_limit, 2.0);
    }
}
