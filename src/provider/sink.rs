//! Producer handle onto a batch's descriptor channel.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::ResolutionError;
use crate::download::ResourceDescriptor;

/// Cloneable sender of [`ResourceDescriptor`]s.
///
/// The channel stays open while any clone is alive. Sending never blocks:
/// the channel is unbounded and the consumer applies back-pressure through
/// its transfer semaphore instead.
#[derive(Debug, Clone)]
pub struct DescriptorSink {
    sender: UnboundedSender<ResourceDescriptor>,
}

impl DescriptorSink {
    /// Creates a sink and the receiver that drains it.
    #[must_use]
    pub fn unbounded() -> (Self, UnboundedReceiver<ResourceDescriptor>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Emits one descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::SinkClosed`] if the receiver was dropped.
    pub fn send(&self, descriptor: ResourceDescriptor) -> Result<(), ResolutionError> {
        self.sender.send(descriptor).map_err(|rejected| {
            ResolutionError::sink_closed(rejected.0.source_page().as_str())
        })
    }

    /// Emits every descriptor of `batch` in order.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::SinkClosed`] if the receiver was dropped.
    pub fn send_all(
        &self,
        batch: impl IntoIterator<Item = ResourceDescriptor>,
    ) -> Result<(), ResolutionError> {
        batch.into_iter().try_for_each(|descriptor| self.send(descriptor))
    }
}
