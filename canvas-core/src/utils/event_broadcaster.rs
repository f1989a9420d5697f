use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

/// Keyed pub/sub fan-out used for document store change notifications.
///
/// Channels are created lazily on first subscribe. A channel keeps
/// its last `buffer_size` events; lagging subscribers lose the oldest ones,
/// which suits snapshot-style events where only the latest matters.
///
/// ```rust
/// use canvas::utils::EventBroadcaster;
///
/// # async fn example() {
/// let broadcaster = EventBroadcaster::<String, u32>::new(16);
/// let mut rx = broadcaster.subscribe("canvas-1".to_string());
/// broadcaster.publish("canvas-1".to_string(), 7);
/// assert_eq!(rx.recv().await.unwrap(), 7);
/// # }
/// ```
pub struct EventBroadcaster<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    channels: Arc<DashMap<K, broadcast::Sender<V>>>,
    buffer_size: usize,
}

impl<K, V> EventBroadcaster<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            buffer_size: buffer_size.max(1),
        }
    }

    pub fn subscribe(&self, key: K) -> broadcast::Receiver<V> {
        self.sender(key).subscribe()
    }

    /// Returns the number of receivers the event reached; zero is not an error.
    pub fn publish(&self, key: K, event: V) -> usize {
        match self.channels.get(&key) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    pub fn receiver_count(&self, key: &K) -> usize {
        self.channels
            .get(key)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Drop the channel for a key; current subscribers observe a closed channel.
    pub fn close(&self, key: &K) {
        self.channels.remove(key);
    }

    /// Remove channels nobody listens to; returns how many were removed.
    pub fn cleanup_idle(&self) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
        before - self.channels.len()
    }

    fn sender(&self, key: K) -> broadcast::Sender<V> {
        self.channels
            .entry(key)
            .or_insert_with(|| broadcast::channel(self.buffer_size).0)
            .clone()
    }
}

impl<K, V> Clone for EventBroadcaster<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
            buffer_size: self.buffer_size,
        }
    }
}
