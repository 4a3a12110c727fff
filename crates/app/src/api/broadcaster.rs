//! Gadget subscriber that turns every update into an outbound
//! `gadget/update` message.

use std::sync::Arc;

use gadgethub_domain::error::HubError;

use crate::api::Route;
use crate::codec::GadgetCodec;
use crate::ports::{BroadcastPublisher, GadgetSubscriber, GadgetUpdate, OutboundMessage};

pub struct ApiBroadcaster<P> {
    codec: Arc<GadgetCodec>,
    publisher: P,
}

impl<P: BroadcastPublisher> ApiBroadcaster<P> {
    pub fn new(codec: Arc<GadgetCodec>, publisher: P) -> Self {
        Self { codec, publisher }
    }
}

impl<P: BroadcastPublisher> GadgetSubscriber for ApiBroadcaster<P> {
    fn name(&self) -> &str {
        "api-broadcaster"
    }

    fn receive_update(&self, update: &GadgetUpdate<'_>) -> Result<(), HubError> {
        let payload = self.codec.encode_update(update.gadget, update.changes)?;
        let listeners = self.publisher.publish(OutboundMessage::new(
            Route::GadgetUpdate.as_path(),
            payload,
        ));
        tracing::trace!(gadget = %update.gadget.id(), listeners, "gadget update broadcast");
        Ok(())
    }
}
