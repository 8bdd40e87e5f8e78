// ZeroMQ pub/sub transport
//
// The subscriber wraps the socket's receive in a short timeout so each poll
// returns promptly whether or not a message is waiting. Uses the pure Rust
// zeromq implementation on the tokio runtime.

use super::Transport;
use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use zeromq::{PubSocket, Socket, SocketRecv, SocketSend, SubSocket, ZmqMessage};

/// SUB socket connected to a frame publisher
pub struct ZmqSubscriber {
    socket: SubSocket,
    endpoint: String,
    poll_timeout: Duration,
    received: u64,
}

impl ZmqSubscriber {
    /// Connect and subscribe
    ///
    /// # Arguments
    /// * `endpoint` - e.g. "tcp://127.0.0.1:3335" or "ipc:///tmp/frames.ipc"
    /// * `topic` - subscription prefix; empty subscribes to everything
    /// * `poll_timeout` - longest a single `try_recv` may wait; zero polls once
    pub async fn connect(endpoint: &str, topic: &str, poll_timeout: Duration) -> Result<Self, TransportError> {
        log::info!("Connecting ZMQ SUB socket to {}", endpoint);

        let mut socket = SubSocket::new();
        socket
            .connect(endpoint)
            .await
            .map_err(|e| TransportError::Connect(format!("{}: {}", endpoint, e)))?;
        socket
            .subscribe(topic)
            .await
            .map_err(|e| TransportError::Connect(format!("subscribe to {:?}: {}", topic, e)))?;

        log::info!("ZMQ SUB socket connected to {}", endpoint);

        Ok(Self {
            socket,
            endpoint: endpoint.to_string(),
            poll_timeout,
            received: 0,
        })
    }
}

#[async_trait]
impl Transport for ZmqSubscriber {
    async fn try_recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        let message = match tokio::time::timeout(self.poll_timeout, self.socket.recv()).await {
            Err(_) => return Ok(None),
            Ok(Err(e)) => return Err(TransportError::Socket(e.to_string())),
            Ok(Ok(message)) => message,
        };

        self.received += 1;
        if self.received % 10_000 == 0 {
            log::debug!("Received {} ZMQ messages from {}", self.received, self.endpoint);
        }

        // Frames are single-part; with a topic prefix the payload is the last part
        let mut parts = message.into_vec();
        Ok(parts.pop())
    }

    fn describe(&self) -> String {
        format!("zmq-sub:{}", self.endpoint)
    }
}

/// PUB socket that frame bytes are published on
pub struct ZmqPublisher {
    socket: PubSocket,
    endpoint: String,
}

impl ZmqPublisher {
    /// Bind to `endpoint`; a tcp port of 0 picks a free port
    pub async fn bind(endpoint: &str) -> Result<Self, TransportError> {
        let mut socket = PubSocket::new();
        let bound = socket
            .bind(endpoint)
            .await
            .map_err(|e| TransportError::Connect(format!("bind {}: {}", endpoint, e)))?;

        log::info!("ZMQ PUB socket bound to {}", bound);

        Ok(Self {
            socket,
            endpoint: bound.to_string(),
        })
    }

    /// Endpoint actually bound, with the resolved port
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn publish(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.socket
            .send(ZmqMessage::from(Bytes::from(payload)))
            .await
            .map_err(|e| TransportError::Socket(e.to_string()))
    }
}
