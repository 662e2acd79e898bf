//! Per-user change broadcast.
//!
//! Each connected session subscribes to a channel keyed by its user id;
//! mutations publish into the acting user's channel only, so no session
//! ever observes another user's events. Delivery is fire-and-forget: no
//! backlog, no replay, and a publish with nobody listening is a no-op.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::api::events::ChangeEvent;

pub struct Notifier {
    capacity: usize,
    channels: Mutex<HashMap<i32, broadcast::Sender<ChangeEvent>>>,
}

impl Notifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe a session to a user's channel, creating it on first use.
    /// Membership is transient; the registry starts empty on every boot.
    pub fn subscribe(&self, user_id: i32) -> broadcast::Receiver<ChangeEvent> {
        let mut channels = self.channels.lock().expect("notifier registry poisoned");
        channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Push an event to the user's sessions. Channels whose last receiver
    /// has disconnected are pruned here rather than on disconnect.
    pub fn publish(&self, user_id: i32, event: ChangeEvent) {
        let mut channels = self.channels.lock().expect("notifier registry poisoned");
        if let Some(sender) = channels.get(&user_id) {
            if sender.send(event).is_err() {
                channels.remove(&user_id);
            }
        }
    }

    /// Number of users with at least one live channel.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.lock().expect("notifier registry poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let notifier = Notifier::new(16);
        let mut rx = notifier.subscribe(1);

        notifier.publish(1, ChangeEvent::HabitDeleted { id: 7 });

        match rx.recv().await.unwrap() {
            ChangeEvent::HabitDeleted { id } => assert_eq!(id, 7),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_cross_user_delivery() {
        let notifier = Notifier::new(16);
        let mut rx_a = notifier.subscribe(1);
        let _rx_b = notifier.subscribe(2);

        notifier.publish(2, ChangeEvent::HabitDeleted { id: 9 });

        assert!(matches!(
            rx_a.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let notifier = Notifier::new(16);
        notifier.publish(5, ChangeEvent::HabitDeleted { id: 1 });
        assert_eq!(notifier.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_channel_pruned_on_publish() {
        let notifier = Notifier::new(16);
        let rx = notifier.subscribe(3);
        drop(rx);
        assert_eq!(notifier.channel_count(), 1);

        notifier.publish(3, ChangeEvent::HabitDeleted { id: 1 });
        assert_eq!(notifier.channel_count(), 0);
    }
}
