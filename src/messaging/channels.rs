// Communication channels lock-free

use crate::messaging::notification::PlayerNotification;
use ringbuf::{
    HeapRb,
    traits::{Consumer, Producer, Split},
};

/// Default capacity of the notification ring buffer
pub const NOTIFICATION_CAPACITY: usize = 1024;

pub type NotificationProducer = ringbuf::HeapProd<PlayerNotification>;
pub type NotificationConsumer = ringbuf::HeapCons<PlayerNotification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<PlayerNotification>::new(capacity);
    rb.split()
}

/// Push a notification, dropping it if the owner is not keeping up
pub fn notify(producer: &mut NotificationProducer, notification: PlayerNotification) {
    if producer.try_push(notification).is_err() {
        tracing::warn!(?notification, "Notification queue full, dropping");
    }
}

/// Take every queued notification, oldest first
pub fn drain_notifications(consumer: &mut NotificationConsumer) -> Vec<PlayerNotification> {
    let mut drained = Vec::new();
    while let Some(notification) = consumer.try_pop() {
        drained.push(notification);
    }
    drained
}
