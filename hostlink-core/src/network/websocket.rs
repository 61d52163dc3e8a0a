// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! WebSocket Signaling Transport
//!
//! Real signaling transport using tungstenite. Frames are JSON text
//! messages. Supports ws:// and, with a TLS feature enabled, wss://.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;
use tungstenite::client::IntoClientRequest;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use super::error::NetworkError;
use super::protocol::{decode_signaling, encode_signaling};
use super::signaling::SignalingMessage;
use super::transport::{ConnectionState, SignalingTransport, TransportResult};

/// Read timeout used after the handshake so `receive` acts as a poll.
const POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// WebSocket transport for the signaling stream.
///
/// # Example
///
/// ```ignore
/// use hostlink_core::network::{SignalingTransport, WebSocketSignalingTransport};
///
/// let mut transport = WebSocketSignalingTransport::new();
/// transport.connect("ws://signal.local:8080", Duration::from_secs(5))?;
/// ```
pub struct WebSocketSignalingTransport {
    socket: Option<WebSocket<MaybeTlsStream<TcpStream>>>,
    state: ConnectionState,
}

impl WebSocketSignalingTransport {
    /// Creates a new, disconnected transport.
    pub fn new() -> Self {
        WebSocketSignalingTransport {
            socket: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Parses a WebSocket URL into host, port and TLS flag.
    fn parse_url(url: &str) -> Result<(String, u16, bool), NetworkError> {
        let is_tls = url.starts_with("wss://");
        let rest = url
            .strip_prefix("wss://")
            .or_else(|| url.strip_prefix("ws://"))
            .ok_or_else(|| {
                NetworkError::ConnectionFailed(
                    "Invalid URL scheme (expected ws:// or wss://)".into(),
                )
            })?;

        let host_port = rest.split('/').next().unwrap_or(rest);

        match host_port.rsplit_once(':') {
            Some((host, port)) => {
                let port: u16 = port.parse().map_err(|_| {
                    NetworkError::ConnectionFailed(format!("Invalid port: {}", port))
                })?;
                Ok((host.to_string(), port, is_tls))
            }
            None => Ok((host_port.to_string(), if is_tls { 443 } else { 80 }, is_tls)),
        }
    }

    fn open(&mut self, url: &str, timeout: Duration) -> TransportResult<()> {
        let (host, port, _) = Self::parse_url(url)?;

        let addr = (host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?
            .next()
            .ok_or_else(|| NetworkError::ConnectionFailed(format!("Cannot resolve {}", host)))?;

        let tcp_stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                NetworkError::Timeout
            } else {
                NetworkError::ConnectionFailed(e.to_string())
            }
        })?;

        tcp_stream
            .set_read_timeout(Some(timeout))
            .and_then(|_| tcp_stream.set_write_timeout(Some(timeout)))
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        // Socket options are shared between clones.
        let control = tcp_stream
            .try_clone()
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        let request = url.into_client_request().map_err(|e| {
            NetworkError::ConnectionFailed(format!("Invalid WebSocket request: {}", e))
        })?;

        let (socket, _response) = tungstenite::client_tls(request, tcp_stream).map_err(|e| {
            NetworkError::ConnectionFailed(format!("WebSocket handshake failed: {}", e))
        })?;

        control
            .set_read_timeout(Some(POLL_TIMEOUT))
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        self.socket = Some(socket);
        Ok(())
    }
}

impl Default for WebSocketSignalingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalingTransport for WebSocketSignalingTransport {
    fn connect(&mut self, url: &str, timeout: Duration) -> TransportResult<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        match self.open(url, timeout) {
            Ok(()) => {
                debug!("Signaling connected to {}", url);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    fn disconnect(&mut self) -> TransportResult<()> {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None);
        }
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn send(&mut self, message: &SignalingMessage) -> TransportResult<()> {
        let socket = self.socket.as_mut().ok_or(NetworkError::NotConnected)?;
        let text = encode_signaling(message)?;

        socket.send(Message::Text(text)).map_err(|e| {
            if matches!(
                e,
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed
            ) {
                self.state = ConnectionState::Disconnected;
                NetworkError::ConnectionClosed
            } else {
                NetworkError::SendFailed(e.to_string())
            }
        })
    }

    fn receive(&mut self) -> TransportResult<Option<SignalingMessage>> {
        let socket = self.socket.as_mut().ok_or(NetworkError::NotConnected)?;

        match socket.read() {
            Ok(Message::Text(text)) => decode_signaling(&text).map(Some),
            Ok(Message::Binary(data)) => {
                let text = String::from_utf8(data)
                    .map_err(|e| NetworkError::InvalidMessage(e.to_string()))?;
                decode_signaling(&text).map(Some)
            }
            Ok(Message::Close(_)) => {
                self.state = ConnectionState::Disconnected;
                self.socket = None;
                Err(NetworkError::ConnectionClosed)
            }
            // Pings are answered by tungstenite on the next write/flush.
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => Ok(None),
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                self.state = ConnectionState::Disconnected;
                self.socket = None;
                Err(NetworkError::ConnectionClosed)
            }
            Err(e) => Err(NetworkError::ReceiveFailed(e.to_string())),
        }
    }
}

// INLINE_TEST_REQUIRED: Tests private parse_url function for URL parsing logic
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_ws_with_port() {
        let (host, port, is_tls) =
            WebSocketSignalingTransport::parse_url("ws://signal.local:8080").unwrap();
        assert_eq!(host, "signal.local");
        assert_eq!(port, 8080);
        assert!(!is_tls);
    }

    #[test]
    fn test_parse_url_wss_default_port_and_path() {
        let (host, port, is_tls) =
            WebSocketSignalingTransport::parse_url("wss://signal.example.com/ws").unwrap();
        assert_eq!(host, "signal.example.com");
        assert_eq!(port, 443);
        assert!(is_tls);
    }

    #[test]
    fn test_parse_url_invalid_scheme() {
        assert!(WebSocketSignalingTransport::parse_url("http://example.com").is_err());
    }

    #[test]
    fn test_send_without_connect_fails() {
        let mut transport = WebSocketSignalingTransport::new();
        let message = SignalingMessage::Error {
            message: "x".into(),
            timestamp: 0,
        };
        assert!(matches!(
            transport.send(&message),
            Err(NetworkError::NotConnected)
        ));
        assert!(matches!(transport.receive(), Err(NetworkError::NotConnected)));
    }

    #[test]
    fn test_connect_refused_leaves_disconnected() {
        let mut transport = WebSocketSignalingTransport::new();
        // Port 1 on loopback is reliably closed.
        let result = transport.connect("ws://127.0.0.1:1", Duration::from_millis(200));
        assert!(result.is_err());
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }
}
