//! Message framing for the LSP base protocol.
//!
//! Content-Length framed messages over a byte stream. The header block
//! terminator depends on the IDE host: `\r\n` line endings for stock LSP
//! clients, bare `\n` for the embedded studio host. Reading tolerates both;
//! writing follows the process-wide host flavor.

use lumen_protocol::{host_flavor, JsonRpcRequest, JsonRpcResponse};
use std::io::{self, BufRead, Write};
use tracing::warn;

/// What one read from the stream produced.
#[derive(Debug)]
pub enum Frame {
    /// A well-formed message.
    Message(JsonRpcRequest),
    /// A frame whose payload was not valid JSON-RPC; the caller answers
    /// with a parse error and keeps reading.
    Malformed,
    /// The input closed.
    Eof,
}

/// Read one framed message. `Err` only for I/O failures.
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Frame> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(Frame::Eof);
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break; // end of headers
        }
        if let Some((key, value)) = line.split_once(':') {
            if key.eq_ignore_ascii_case("Content-Length") {
                content_length = value.trim().parse::<usize>().ok();
            }
        }
    }

    let Some(length) = content_length else {
        warn!("frame without Content-Length header");
        return Ok(Frame::Malformed);
    };
    let mut content = vec![0u8; length];
    reader.read_exact(&mut content)?;

    match serde_json::from_slice(&content) {
        Ok(request) => Ok(Frame::Message(request)),
        Err(err) => {
            // never let a malformed frame kill the stream
            warn!(error = %err, "malformed JSON-RPC frame");
            Ok(Frame::Malformed)
        }
    }
}

/// Write a framed response using the session's host flavor.
pub fn write_message<W: Write>(writer: &mut W, response: &JsonRpcResponse) -> io::Result<()> {
    let content = serde_json::to_string(response)?;
    let terminator = host_flavor().header_terminator();
    write!(writer, "Content-Length: {}{}{}", content.len(), terminator, content)?;
    writer.flush()
}

/// Write a framed notification.
pub fn write_notification<W: Write>(
    writer: &mut W,
    method: &str,
    params: serde_json::Value,
) -> io::Result<()> {
    let notification = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
    });
    let content = serde_json::to_string(&notification)?;
    let terminator = host_flavor().header_terminator();
    write!(writer, "Content-Length: {}{}{}", content.len(), terminator, content)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::BufReader;

    fn frame(body: &str) -> Vec<u8> {
        format!("Content-Length: {}\r\n\r\n{}", body.len(), body).into_bytes()
    }

    fn read_frame(raw: &[u8]) -> Frame {
        let mut reader = BufReader::new(raw);
        read_message(&mut reader).expect("io")
    }

    #[test]
    fn test_read_standard_frame() {
        let raw = frame(r#"{"jsonrpc":"2.0","id":1,"method":"shutdown"}"#);
        let Frame::Message(request) = read_frame(&raw) else {
            panic!("expected a message frame");
        };
        assert_eq!(request.method, "shutdown");
        assert_eq!(request.id, Some(json!(1)));
    }

    #[test]
    fn test_read_tolerates_bare_newline_headers() {
        let body = r#"{"jsonrpc":"2.0","method":"initialized"}"#;
        let raw = format!("Content-Length: {}\n\n{}", body.len(), body).into_bytes();
        let Frame::Message(request) = read_frame(&raw) else {
            panic!("expected a message frame");
        };
        assert_eq!(request.method, "initialized");
    }

    #[test]
    fn test_malformed_json_is_recoverable() {
        let raw = frame("{not json");
        assert!(matches!(read_frame(&raw), Frame::Malformed));
    }

    #[test]
    fn test_eof_is_distinguished_from_malformed() {
        assert!(matches!(read_frame(&[]), Frame::Eof));
    }

    #[test]
    fn test_write_framing_round_trips() {
        let mut out: Vec<u8> = Vec::new();
        let response = JsonRpcResponse::null(Some(json!(7)));
        write_message(&mut out, &response).expect("write");
        let mut reader = BufReader::new(out.as_slice());
        // the response reads back as a request-shaped value with no method;
        // only the framing is under test here
        let mut line = String::new();
        reader.read_line(&mut line).expect("header");
        assert!(line.starts_with("Content-Length: "));
    }
}
