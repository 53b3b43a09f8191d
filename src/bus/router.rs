//! Fan-out of an addressed message to its consumers.

use serde_json::Value;

use crate::protocol::Message;

use super::registry::Registration;

/// Result of delivering one message.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Delivery {
    /// First reply returned, if the message expects one.
    pub(crate) reply: Option<Value>,
    /// Further replies that were discarded.
    pub(crate) suppressed: usize,
    /// Consumers invoked.
    pub(crate) consumers: usize,
}

/// Invokes every consumer in registration order.
///
/// Return values only count when the message carries a reply address.
pub(crate) fn dispatch(registrations: &mut [Registration], message: &Message) -> Delivery {
    let needs_reply = message.needs_reply();
    let mut delivery = Delivery::default();

    for registration in registrations.iter_mut() {
        delivery.consumers += 1;
        let Some(reply) = registration.invoke(message) else {
            continue;
        };
        if !needs_reply {
            continue;
        }
        if delivery.reply.is_none() {
            delivery.reply = Some(reply);
        } else {
            delivery.suppressed += 1;
        }
    }

    delivery
}
