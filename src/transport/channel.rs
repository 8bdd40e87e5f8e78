use super::Transport;
use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

/// In-process transport fed through a crossbeam channel
///
/// Dropping every sender closes the transport once the queue is drained.
pub struct ChannelTransport {
    rx: Receiver<Bytes>,
    name: String,
}

impl ChannelTransport {
    pub fn new(rx: Receiver<Bytes>, name: impl Into<String>) -> Self {
        Self {
            rx,
            name: name.into(),
        }
    }

    /// Unbounded pair; the sender side plays the publisher
    pub fn pair(name: impl Into<String>) -> (Sender<Bytes>, Self) {
        let (tx, rx) = unbounded();
        (tx, Self::new(rx, name))
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn try_recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        match self.rx.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn describe(&self) -> String {
        format!("channel:{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_then_message_then_closed() {
        let (tx, mut transport) = ChannelTransport::pair("test");

        assert!(transport.try_recv().await.unwrap().is_none());

        tx.send(Bytes::from_static(b"abc")).unwrap();
        drop(tx);

        assert_eq!(transport.try_recv().await.unwrap().unwrap(), Bytes::from_static(b"abc"));
        assert!(matches!(transport.try_recv().await, Err(TransportError::Closed)));
    }
}
