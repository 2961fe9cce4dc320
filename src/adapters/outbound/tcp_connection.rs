use crate::common::{ConnectionError, ConnectionResult};
use crate::domains::connection::{Connection, Connector, DynConnection};
use crate::domains::logger::{DynLogger, LogLevel, ModuleLogger, SdkLogger};
use crate::domains::stream::{BidiStream, StreamEnds};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

/// Messages buffered per direction on an open stream.
pub const STREAM_BUFFER: usize = 32;

/// Split a `host:port` endpoint. IPv6 hosts may be bracketed (`[::1]:5726`).
pub fn parse_endpoint(endpoint: &str) -> ConnectionResult<(String, u16)> {
    let invalid = |reason: &str| ConnectionError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = endpoint.trim();
    let (host, port) = trimmed
        .rsplit_once(':')
        .ok_or_else(|| invalid("expected host:port"))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    let port: u16 = port.parse().map_err(|_| invalid("port is not a number in 1..=65535"))?;
    if port == 0 {
        return Err(invalid("port must not be 0"));
    }
    Ok((host.to_string(), port))
}

/// Length-prefixed request/response framing used by [`TcpConnection`].
///
/// Request: `u32 method_len | method | u32 payload_len | payload`.
/// Response: `u8 status | u32 len | body`, where a non-zero status means the
/// body is a UTF-8 error message. All integers are big-endian.
///
/// A stream runs on its own socket: the client sends one request whose method
/// is `stream:<method>` with an empty payload, the server acknowledges with a
/// response, and from then on both sides exchange `u32 len | body` messages.
/// Shutting down the write side ends the stream in that direction.
pub mod frame {
    use crate::common::{ConnectionError, ConnectionResult};
    use std::io::ErrorKind;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

    pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;
    pub const STREAM_PREFIX: &str = "stream:";

    const STATUS_OK: u8 = 0;
    const STATUS_ERROR: u8 = 1;

    fn block_len(len: usize) -> ConnectionResult<u32> {
        if len > MAX_FRAME_LEN {
            return Err(ConnectionError::Protocol(format!(
                "frame of {} bytes exceeds limit of {}",
                len, MAX_FRAME_LEN
            )));
        }
        Ok(len as u32)
    }

    async fn read_block<R: AsyncRead + Unpin>(reader: &mut R, len: u32) -> ConnectionResult<Vec<u8>> {
        let len = len as usize;
        if len > MAX_FRAME_LEN {
            return Err(ConnectionError::Protocol(format!(
                "frame of {} bytes exceeds limit of {}",
                len, MAX_FRAME_LEN
            )));
        }
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf).await?;
        Ok(buf)
    }

    pub async fn write_request<W: AsyncWrite + Unpin>(
        writer: &mut W,
        method: &str,
        payload: &[u8],
    ) -> ConnectionResult<()> {
        let method = method.as_bytes();
        let mut buf = Vec::with_capacity(8 + method.len() + payload.len());
        buf.extend_from_slice(&block_len(method.len())?.to_be_bytes());
        buf.extend_from_slice(method);
        buf.extend_from_slice(&block_len(payload.len())?.to_be_bytes());
        buf.extend_from_slice(payload);
        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read one request; `None` when the peer closed cleanly between frames.
    pub async fn read_request<R: AsyncRead + Unpin>(
        reader: &mut R,
    ) -> ConnectionResult<Option<(String, Vec<u8>)>> {
        let method_len = match reader.read_u32().await {
            Ok(len) => len,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let method = read_block(reader, method_len).await?;
        let method = String::from_utf8(method)
            .map_err(|_| ConnectionError::Protocol("method name is not UTF-8".to_string()))?;
        let payload_len = reader.read_u32().await?;
        let payload = read_block(reader, payload_len).await?;
        Ok(Some((method, payload)))
    }

    pub async fn write_response<W: AsyncWrite + Unpin>(
        writer: &mut W,
        result: Result<&[u8], &str>,
    ) -> ConnectionResult<()> {
        let (status, body) = match result {
            Ok(body) => (STATUS_OK, body),
            Err(msg) => (STATUS_ERROR, msg.as_bytes()),
        };
        let mut buf = Vec::with_capacity(5 + body.len());
        buf.push(status);
        buf.extend_from_slice(&block_len(body.len())?.to_be_bytes());
        buf.extend_from_slice(body);
        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn read_response<R: AsyncRead + Unpin>(reader: &mut R) -> ConnectionResult<Vec<u8>> {
        let status = reader.read_u8().await?;
        let len = reader.read_u32().await?;
        let body = read_block(reader, len).await?;
        match status {
            STATUS_OK => Ok(body),
            _ => Err(ConnectionError::Remote(String::from_utf8_lossy(&body).into_owned())),
        }
    }

    pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, body: &[u8]) -> ConnectionResult<()> {
        let mut buf = Vec::with_capacity(4 + body.len());
        buf.extend_from_slice(&block_len(body.len())?.to_be_bytes());
        buf.extend_from_slice(body);
        writer.write_all(&buf).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read one stream message; `None` when the peer finished sending.
    pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> ConnectionResult<Option<Vec<u8>>> {
        let len = match reader.read_u32().await {
            Ok(len) => len,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        read_block(reader, len).await.map(Some)
    }
}

/// A connection to one server endpoint. Unary calls share one socket and are
/// serialized; every stream gets a socket of its own.
///
/// The socket leaves its slot for the duration of an exchange. A call that is
/// abandoned half way (cancelled task, timeout) takes the socket down with it,
/// and the next call dials a fresh one, so no reply is ever read by the wrong
/// caller.
pub struct TcpConnection {
    endpoint: String,
    host: String,
    port: u16,
    stream: Mutex<Option<TcpStream>>,
    closed: AtomicBool,
    logger: ModuleLogger,
}

impl TcpConnection {
    pub async fn open(endpoint: &str, logger: ModuleLogger) -> ConnectionResult<Self> {
        let (host, port) = parse_endpoint(endpoint)?;
        let stream = dial(&host, port).await?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            host,
            port,
            stream: Mutex::new(Some(stream)),
            closed: AtomicBool::new(false),
            logger,
        })
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }
}

async fn dial(host: &str, port: u16) -> ConnectionResult<TcpStream> {
    let stream = TcpStream::connect((host, port)).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

async fn exchange(stream: &mut TcpStream, method: &str, request: &[u8]) -> ConnectionResult<Vec<u8>> {
    frame::write_request(stream, method, request).await?;
    frame::read_response(stream).await
}

#[async_trait]
impl Connection for TcpConnection {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, method: &str, request: Vec<u8>) -> ConnectionResult<Vec<u8>> {
        let mut slot = self.stream.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed);
        }

        let mut stream = match slot.take() {
            Some(stream) => stream,
            None => {
                self.logger.debug(&format!("[{}] redialing for {}.", self.endpoint, method));
                dial(&self.host, self.port).await?
            }
        };

        let result = exchange(&mut stream, method, &request).await;
        match &result {
            Ok(_) | Err(ConnectionError::Remote(_)) => *slot = Some(stream),
            // The stream position is unknown after a transport failure.
            Err(e) => self
                .logger
                .warn(&format!("[{}] call {} failed, dropping socket: {}", self.endpoint, method, e)),
        }
        result
    }

    async fn open_stream(&self, method: &str) -> ConnectionResult<BidiStream<Vec<u8>, Vec<u8>>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed);
        }

        let mut socket = dial(&self.host, self.port).await?;
        let open = format!("{}{}", frame::STREAM_PREFIX, method);
        frame::write_request(&mut socket, &open, &[]).await?;
        frame::read_response(&mut socket).await?;

        let name = format!("{} {}", self.endpoint, method);
        let (reader, writer) = socket.into_split();
        let (out_tx, out_rx) = mpsc::channel(STREAM_BUFFER);
        let (in_tx, in_rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(pump_outbound(writer, out_rx, self.logger.clone(), name.clone()));
        tokio::spawn(pump_inbound(reader, in_tx, self.logger.clone(), name.clone()));

        Ok(BidiStream::new(&name, self.logger.clone(), move || {
            Ok(StreamEnds {
                outbound: out_tx,
                inbound: in_rx,
            })
        }))
    }

    async fn close(&self) -> ConnectionResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut slot = self.stream.lock().await;
        if let Some(mut stream) = slot.take() {
            self.logger.debug(&format!("[{}] closing connection.", self.endpoint));
            if let Err(e) = stream.shutdown().await {
                if e.kind() != std::io::ErrorKind::NotConnected {
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}

async fn pump_outbound(mut writer: OwnedWriteHalf, mut outbound: mpsc::Receiver<Vec<u8>>, logger: ModuleLogger, name: String) {
    while let Some(msg) = outbound.recv().await {
        if let Err(e) = frame::write_message(&mut writer, &msg).await {
            logger.warn(&format!("[{}] stream write failed: {}", name, e));
            return;
        }
    }
    // Half-close: the server sees end of input and may still reply.
    let _ = writer.shutdown().await;
}

async fn pump_inbound(mut reader: OwnedReadHalf, inbound: mpsc::Sender<Vec<u8>>, logger: ModuleLogger, name: String) {
    loop {
        match frame::read_message(&mut reader).await {
            Ok(Some(msg)) => {
                if inbound.send(msg).await.is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                logger.warn(&format!("[{}] stream read failed: {}", name, e));
                return;
            }
        }
    }
}

/// Establishes [`TcpConnection`]s.
pub struct TcpConnector {
    logger: DynLogger,
    level: LogLevel,
}

impl TcpConnector {
    pub fn new(logger: DynLogger) -> Self {
        Self {
            logger,
            level: LogLevel::default(),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, endpoint: &str) -> ConnectionResult<DynConnection> {
        let logger = ModuleLogger::new(self.logger.clone(), "connection", self.level);
        let conn = TcpConnection::open(endpoint, logger.clone()).await?;
        logger.info(&format!("connected to {}", endpoint));
        Ok(Arc::new(conn))
    }
}
