pub mod channels;
pub mod notification;

pub use channels::{
    NOTIFICATION_CAPACITY, NotificationConsumer, NotificationProducer,
    create_notification_channel, drain_notifications, notify,
};
pub use notification::PlayerNotification;
