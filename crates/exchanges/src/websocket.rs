//! Monoio-native WebSocket client (RFC 6455, client side, `wss://` only)

use crate::errors::{ExchangeError, Result};
use crate::http::{TlsStream, default_tls_config, find_subsequence};
use base64::Engine;
use dexbridge_core::PerfTimer;
use dexbridge_core::id_gen::generate_id_with_length;
use monoio::net::TcpStream;
use sha1::{Digest, Sha1};
use tracing::{debug, info};
use url::Url;

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xa,
}

impl OpCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(OpCode::Continuation),
            0x1 => Some(OpCode::Text),
            0x2 => Some(OpCode::Binary),
            0x8 => Some(OpCode::Close),
            0x9 => Some(OpCode::Ping),
            0xa => Some(OpCode::Pong),
            _ => None,
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: OpCode,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin: true,
            opcode,
            payload,
        }
    }

    pub fn text(data: impl Into<String>) -> Self {
        Self::new(OpCode::Text, data.into().into_bytes())
    }

    pub fn close(code: u16, reason: &str) -> Self {
        let mut payload = Vec::with_capacity(2 + reason.len());
        payload.extend_from_slice(&code.to_be_bytes());
        payload.extend_from_slice(reason.as_bytes());
        Self::new(OpCode::Close, payload)
    }

    /// Encode with the given client mask
    pub fn encode(&self, mask: [u8; 4]) -> Vec<u8> {
        let len = self.payload.len();
        let mut out = Vec::with_capacity(len + 14);

        out.push(if self.fin { 0x80 } else { 0x00 } | self.opcode as u8);

        if len < 126 {
            out.push(0x80 | len as u8);
        } else if len <= u16::MAX as usize {
            out.push(0x80 | 126);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            out.push(0x80 | 127);
            out.extend_from_slice(&(len as u64).to_be_bytes());
        }

        out.extend_from_slice(&mask);
        out.extend(self.payload.iter().enumerate().map(|(i, b)| b ^ mask[i % 4]));
        out
    }

    /// Decode one frame from the front of `data`.
    ///
    /// `Ok(None)` means more bytes are needed; otherwise returns the frame and
    /// how many bytes it occupied.
    pub fn decode(data: &[u8]) -> Result<Option<(Self, usize)>> {
        if data.len() < 2 {
            return Ok(None);
        }

        let fin = data[0] & 0x80 != 0;
        let opcode = OpCode::from_u8(data[0] & 0x0f).ok_or_else(|| {
            ExchangeError::InvalidResponse(format!("Invalid WebSocket opcode {:#x}", data[0] & 0x0f))
        })?;
        let masked = data[1] & 0x80 != 0;

        let mut offset = 2;
        let payload_len = match data[1] & 0x7f {
            126 => {
                let Some(bytes) = data.get(2..4) else { return Ok(None) };
                offset += 2;
                u16::from_be_bytes([bytes[0], bytes[1]]) as usize
            }
            127 => {
                let Some(bytes) = data.get(2..10) else { return Ok(None) };
                offset += 8;
                let mut len = [0u8; 8];
                len.copy_from_slice(bytes);
                usize::try_from(u64::from_be_bytes(len)).map_err(|_| {
                    ExchangeError::InvalidResponse("WebSocket frame too large".to_string())
                })?
            }
            n => n as usize,
        };

        let mask = if masked {
            let Some(bytes) = data.get(offset..offset + 4) else { return Ok(None) };
            offset += 4;
            Some([bytes[0], bytes[1], bytes[2], bytes[3]])
        } else {
            None
        };

        let end = offset
            .checked_add(payload_len)
            .ok_or_else(|| ExchangeError::InvalidResponse("WebSocket frame too large".to_string()))?;
        let Some(payload) = data.get(offset..end) else { return Ok(None) };
        let payload = match mask {
            Some(mask) => payload.iter().enumerate().map(|(i, b)| b ^ mask[i % 4]).collect(),
            None => payload.to_vec(),
        };

        Ok(Some((Frame { fin, opcode, payload }, end)))
    }
}

fn random_mask() -> [u8; 4] {
    let id = generate_id_with_length(4);
    let bytes = id.as_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

/// `Sec-WebSocket-Accept` value for a handshake key
pub fn accept_key(ws_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(ws_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Monoio-native WebSocket connection
pub struct MonoioWebSocket {
    stream: TlsStream,
    buffer: Vec<u8>,
    fragments: Vec<u8>,
    connected: bool,
    close_sent: bool,
}

impl MonoioWebSocket {
    pub async fn connect(url: &Url) -> Result<Self> {
        let timer = PerfTimer::start("websocket_connect");

        if url.scheme() != "wss" {
            return Err(ExchangeError::InvalidUrl(format!("only wss is supported: {url}")));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ExchangeError::InvalidUrl("No host in WebSocket URL".to_string()))?;
        let port = url.port().unwrap_or(443);

        info!("🔗 Connecting to WebSocket: {}", url);

        let tcp_stream = TcpStream::connect(format!("{host}:{port}"))
            .await
            .map_err(|e| ExchangeError::ConnectionFailed(format!("TCP connect to {host}:{port} failed: {e}")))?;

        let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
            .map_err(|e| ExchangeError::NetworkError(format!("Invalid server name: {e}")))?;
        let tls_conn = rustls::ClientConnection::new(default_tls_config(), server_name)
            .map_err(|e| ExchangeError::NetworkError(format!("TLS setup failed: {e}")))?;

        let mut stream = TlsStream::new(tcp_stream, tls_conn);
        stream.complete_handshake().await?;
        debug!("✅ TLS handshake completed with {}", host);

        let mut socket = Self {
            stream,
            buffer: Vec::with_capacity(8192),
            fragments: Vec::new(),
            connected: false,
            close_sent: false,
        };
        socket.upgrade(url, host).await?;

        timer.log_elapsed();
        info!("✅ WebSocket connected to {}", url);
        Ok(socket)
    }

    async fn upgrade(&mut self, url: &Url, host: &str) -> Result<()> {
        let ws_key = base64::engine::general_purpose::STANDARD.encode(generate_id_with_length(16));
        let path = if url.path().is_empty() { "/" } else { url.path() };
        let query = url.query().map(|q| format!("?{q}")).unwrap_or_default();

        let request = format!(
            "GET {path}{query} HTTP/1.1\r\n\
             Host: {host}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {ws_key}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n"
        );
        self.stream.write_all(request.as_bytes()).await?;

        let header_end = loop {
            if let Some(pos) = find_subsequence(&self.buffer, b"\r\n\r\n") {
                break pos;
            }
            self.read_more().await?;
        };

        let response = String::from_utf8_lossy(&self.buffer[..header_end]).to_string();
        // Frames sent right after the 101 stay in the buffer.
        self.buffer.drain(..header_end + 4);

        if !response.starts_with("HTTP/1.1 101") {
            let status = response.lines().next().unwrap_or_default();
            return Err(ExchangeError::ConnectionFailed(format!("WebSocket upgrade refused: {status}")));
        }

        let expected = accept_key(&ws_key);
        let accepted = response.lines().any(|line| {
            line.split_once(':').is_some_and(|(key, value)| {
                key.trim().eq_ignore_ascii_case("sec-websocket-accept") && value.trim() == expected
            })
        });
        if !accepted {
            return Err(ExchangeError::ConnectionFailed("WebSocket upgrade: bad accept key".to_string()));
        }

        self.connected = true;
        Ok(())
    }

    async fn read_more(&mut self) -> Result<()> {
        let mut chunk = vec![0u8; 8192];
        let n = self.stream.read(&mut chunk).await?;
        if n == 0 {
            self.connected = false;
            return Err(ExchangeError::ConnectionFailed("WebSocket closed by peer".to_string()));
        }
        self.buffer.extend_from_slice(&chunk[..n]);
        Ok(())
    }

    pub async fn send_frame(&mut self, frame: Frame) -> Result<()> {
        if !self.connected || self.close_sent {
            return Err(ExchangeError::ConnectionFailed("WebSocket not connected".to_string()));
        }

        self.stream.write_all(&frame.encode(random_mask())).await?;
        if frame.opcode == OpCode::Close {
            self.close_sent = true;
        }
        Ok(())
    }

    pub async fn send_text(&mut self, message: impl Into<String>) -> Result<()> {
        self.send_frame(Frame::text(message)).await
    }

    /// Next complete text message; `Ok(None)` once the peer has closed the socket.
    ///
    /// Pings are answered and fragmented messages are reassembled here.
    pub async fn receive_text(&mut self) -> Result<Option<String>> {
        loop {
            let Some((frame, consumed)) = Frame::decode(&self.buffer)? else {
                if !self.connected {
                    return Ok(None);
                }
                self.read_more().await?;
                continue;
            };
            self.buffer.drain(..consumed);

            match frame.opcode {
                OpCode::Ping => {
                    self.send_frame(Frame::new(OpCode::Pong, frame.payload)).await?;
                }
                OpCode::Pong => {}
                OpCode::Close => {
                    debug!("Received close frame");
                    if !self.close_sent {
                        let _ = self.send_frame(Frame::close(1000, "")).await;
                    }
                    self.connected = false;
                    return Ok(None);
                }
                OpCode::Text | OpCode::Binary | OpCode::Continuation => {
                    self.fragments.extend_from_slice(&frame.payload);
                    if frame.fin {
                        let message = std::mem::take(&mut self.fragments);
                        return String::from_utf8(message).map(Some).map_err(|e| {
                            ExchangeError::InvalidResponse(format!("Invalid UTF-8 in text frame: {e}"))
                        });
                    }
                }
            }
        }
    }

    /// Send a close frame; the peer's reply is not awaited
    pub async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        if !self.connected || self.close_sent {
            return Ok(());
        }
        info!("🔌 Closing WebSocket connection");
        self.send_frame(Frame::close(code, reason)).await?;
        self.connected = false;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected && !self.close_sent
    }
}
