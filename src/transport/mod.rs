mod channel;
mod zmq;

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;

pub use channel::ChannelTransport;
pub use zmq::{ZmqPublisher, ZmqSubscriber};

/// Source of already-framed messages
///
/// `try_recv` must return promptly: `Ok(None)` when nothing is waiting,
/// `Err` only when the transport can no longer deliver anything.
#[async_trait]
pub trait Transport: Send {
    /// Receive at most one message without blocking
    async fn try_recv(&mut self) -> Result<Option<Bytes>, TransportError>;

    /// Short description for logs (endpoint, channel name, ...)
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn try_recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        (**self).try_recv().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
