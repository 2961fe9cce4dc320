use crate::common::{ConnectionError, ConnectionResult};
use crate::domains::logger::{ModuleLogger, SdkLogger};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use tokio::sync::mpsc;

/// The two channel ends a stream talks through once opened.
pub struct StreamEnds<Req, Resp> {
    pub outbound: mpsc::Sender<Req>,
    pub inbound: mpsc::Receiver<Resp>,
}

/// The far side of an in-process stream created with [`BidiStream::channel`].
pub struct StreamPeer<Req, Resp> {
    pub requests: mpsc::Receiver<Req>,
    pub responses: mpsc::Sender<Resp>,
}

type Opener<Req, Resp> = Box<dyn FnOnce() -> ConnectionResult<StreamEnds<Req, Resp>> + Send>;

/// Bidirectional message stream with read/write state and lifecycle management.
///
/// Scheduling of read and write loops is left to the caller; the stream only
/// tracks whether it was started and whether the write side is still open.
pub struct BidiStream<Req, Resp> {
    name: String,
    opener: Option<Opener<Req, Resp>>,
    outbound: Option<mpsc::Sender<Req>>,
    inbound: Option<mpsc::Receiver<Resp>>,
    running: bool,
    logger: ModuleLogger,
}

impl<Req: Send + 'static, Resp: Send + 'static> BidiStream<Req, Resp> {
    pub fn new<F>(name: &str, logger: ModuleLogger, open: F) -> Self
    where
        F: FnOnce() -> ConnectionResult<StreamEnds<Req, Resp>> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            opener: Some(Box::new(open)),
            outbound: None,
            inbound: None,
            running: false,
            logger,
        }
    }

    /// In-process stream backed by bounded channels; the returned peer plays the server.
    pub fn channel(name: &str, logger: ModuleLogger, capacity: usize) -> (Self, StreamPeer<Req, Resp>) {
        let (req_tx, req_rx) = mpsc::channel(capacity);
        let (resp_tx, resp_rx) = mpsc::channel(capacity);
        let stream = Self::new(name, logger, move || {
            Ok(StreamEnds {
                outbound: req_tx,
                inbound: resp_rx,
            })
        });
        let peer = StreamPeer {
            requests: req_rx,
            responses: resp_tx,
        };
        (stream, peer)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open the underlying call. Must be called before `read`/`write`.
    pub fn start(&mut self) -> ConnectionResult<()> {
        let open = self.opener.take().ok_or(ConnectionError::StreamAlreadyStarted)?;
        let ends = open()?;
        self.outbound = Some(ends.outbound);
        self.inbound = Some(ends.inbound);
        self.running = true;
        self.logger.info(&format!("[{}] Stream started.", self.name));
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Send one message. Returns `Ok(false)` when the peer has gone away.
    pub async fn write(&mut self, req: Req) -> ConnectionResult<bool> {
        if !self.running {
            return Err(ConnectionError::StreamNotStarted);
        }
        let tx = self.outbound.as_ref().ok_or(ConnectionError::StreamNotStarted)?;
        match tx.send(req).await {
            Ok(()) => Ok(true),
            Err(_) => {
                self.logger
                    .warn(&format!("[{}] Write failed: peer closed the stream.", self.name));
                Ok(false)
            }
        }
    }

    /// Read one message; `None` once the peer finished sending.
    pub async fn read(&mut self) -> ConnectionResult<Option<Resp>> {
        let rx = self.inbound.as_mut().ok_or(ConnectionError::StreamNotStarted)?;
        match rx.recv().await {
            Some(resp) => Ok(Some(resp)),
            None => {
                self.running = false;
                self.logger.info(&format!("[{}] Stream exited.", self.name));
                Ok(None)
            }
        }
    }

    /// Close the write side while keeping the read side open.
    pub fn done_writing(&mut self) {
        if self.outbound.take().is_some() {
            self.logger.debug(&format!("[{}] Done writing.", self.name));
        }
        self.running = false;
    }

    pub fn close(&mut self) {
        if self.outbound.is_none() && self.inbound.is_none() {
            return;
        }
        self.logger.debug(&format!("[{}] Closing stream.", self.name));
        self.running = false;
        self.outbound = None;
        if let Some(mut rx) = self.inbound.take() {
            rx.close();
        }
    }
}

/// Converts typed messages to and from the byte frames a stream carries.
pub trait StreamCodec: Send {
    type Outgoing;
    type Incoming;

    fn encode(&self, msg: &Self::Outgoing) -> ConnectionResult<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> ConnectionResult<Self::Incoming>;
}

pub struct JsonCodec<Out, In> {
    _marker: PhantomData<fn(Out) -> In>,
}

impl<Out, In> JsonCodec<Out, In> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<Out, In> Default for JsonCodec<Out, In> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Out: Serialize, In: DeserializeOwned> StreamCodec for JsonCodec<Out, In> {
    type Outgoing = Out;
    type Incoming = In;

    fn encode(&self, msg: &Out) -> ConnectionResult<Vec<u8>> {
        serde_json::to_vec(msg).map_err(|e| ConnectionError::Protocol(format!("encode failed: {}", e)))
    }

    fn decode(&self, bytes: &[u8]) -> ConnectionResult<In> {
        serde_json::from_slice(bytes).map_err(|e| ConnectionError::Protocol(format!("decode failed: {}", e)))
    }
}

/// A byte stream paired with a codec, so callers read and write typed messages.
pub struct TypedStream<C: StreamCodec> {
    stream: BidiStream<Vec<u8>, Vec<u8>>,
    codec: C,
}

impl<C: StreamCodec> TypedStream<C> {
    pub fn new(stream: BidiStream<Vec<u8>, Vec<u8>>, codec: C) -> Self {
        Self { stream, codec }
    }

    pub fn start(&mut self) -> ConnectionResult<()> {
        self.stream.start()
    }

    pub async fn send(&mut self, msg: &C::Outgoing) -> ConnectionResult<bool> {
        let bytes = self.codec.encode(msg)?;
        self.stream.write(bytes).await
    }

    pub async fn recv(&mut self) -> ConnectionResult<Option<C::Incoming>> {
        match self.stream.read().await? {
            Some(bytes) => self.codec.decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    pub fn done(&mut self) {
        self.stream.done_writing();
    }

    pub fn close(&mut self) {
        self.stream.close();
    }

    pub fn into_inner(self) -> BidiStream<Vec<u8>, Vec<u8>> {
        self.stream
    }
}
