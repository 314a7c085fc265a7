// urraca is a disk intelligence and cleanup tool
// Copyright (C) 2025  Javier Lancha Vázquez <javier.lancha@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Initializing,
    Scanning,
    Completed,
}

/// One progress update emitted by the scanner. Delivered at least once per
/// scan and at least every 500 files while scanning.
#[derive(Debug, Clone, Serialize)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub files_scanned: u64,
    pub bytes_scanned: u64,
    pub current_path: Option<PathBuf>,
    pub dirs_visited: u64,
}

/// Callbacks must be safe to invoke from any thread.
pub type ProgressCallback = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// Cooperative cancellation signal. Long operations check it between units
/// of work: the scanner after each directory, the duplicate detector after
/// each hashing chunk, the cleanup engine between items.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

struct SubscriberQueue {
    capacity: usize,
    queue: Mutex<VecDeque<ScanProgress>>,
}

impl SubscriberQueue {
    // Drop-oldest: a slow consumer loses history, never blocks a worker.
    fn push(&self, update: ScanProgress) {
        let mut queue = self.queue.lock();
        if queue.len() == self.capacity {
            queue.pop_front();
        }
        queue.push_back(update);
    }
}

/// Consumer handle returned by [`ProgressHub::subscribe`].
pub struct ProgressSubscriber {
    queue: Arc<SubscriberQueue>,
}

impl ProgressSubscriber {
    /// Take all pending updates, oldest first.
    pub fn drain(&self) -> Vec<ScanProgress> {
        self.queue.queue.lock().drain(..).collect()
    }

    /// Discard everything but the most recent update.
    pub fn latest(&self) -> Option<ScanProgress> {
        self.drain().pop()
    }
}

/// Fans progress updates out to any number of subscribers.
///
/// Workers send through a channel and never observe subscribers directly;
/// a dedicated fan-out thread owns the subscriber set and applies the
/// drop-oldest policy per subscriber queue.
pub struct ProgressHub {
    tx: Option<Sender<ScanProgress>>,
    subscribers: Arc<Mutex<Vec<Arc<SubscriberQueue>>>>,
    worker: Option<JoinHandle<()>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded::<ScanProgress>();
        let subscribers: Arc<Mutex<Vec<Arc<SubscriberQueue>>>> = Arc::new(Mutex::new(Vec::new()));

        let fanout_subscribers = subscribers.clone();
        let worker = std::thread::spawn(move || {
            for update in rx {
                for subscriber in fanout_subscribers.lock().iter() {
                    subscriber.push(update.clone());
                }
            }
        });

        Self {
            tx: Some(tx),
            subscribers,
            worker: Some(worker),
        }
    }

    /// Register a subscriber with a bounded queue of `capacity` updates.
    pub fn subscribe(&self, capacity: usize) -> ProgressSubscriber {
        let queue = Arc::new(SubscriberQueue {
            capacity: capacity.max(1),
            queue: Mutex::new(VecDeque::new()),
        });
        self.subscribers.lock().push(queue.clone());
        ProgressSubscriber { queue }
    }

    /// A callback handed to workers. Clones of it may outlive the hub; the
    /// fan-out thread drains them until the last clone is dropped.
    pub fn callback(&self) -> ProgressCallback {
        let tx = self
            .tx
            .clone()
            .expect("The hub channel lives as long as the hub");
        Arc::new(move |update| {
            let _ = tx.send(update);
        })
    }

    /// Stop accepting updates and wait for pending ones to be delivered.
    /// Requires all worker callbacks to have been dropped.
    pub fn close(mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProgressHub {
    fn drop(&mut self) {
        // Detach the fan-out thread. It terminates once every callback
        // clone has been dropped.
        self.tx.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(files: u64) -> ScanProgress {
        ScanProgress {
            phase: ScanPhase::Scanning,
            files_scanned: files,
            bytes_scanned: files * 100,
            current_path: None,
            dirs_visited: 1,
        }
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_fan_out_to_all_subscribers() {
        let hub = ProgressHub::new();
        let first = hub.subscribe(16);
        let second = hub.subscribe(16);

        let callback = hub.callback();
        for i in 0..4 {
            callback(update(i));
        }

        drop(callback);
        hub.close();

        assert_eq!(first.drain().len(), 4);
        assert_eq!(second.drain().len(), 4);
    }

    #[test]
    fn test_drop_oldest_per_subscriber() {
        let hub = ProgressHub::new();
        let subscriber = hub.subscribe(2);

        let callback = hub.callback();
        for i in 0..5 {
            callback(update(i));
        }

        drop(callback);
        hub.close();

        let pending = subscriber.drain();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].files_scanned, 3);
        assert_eq!(pending[1].files_scanned, 4);
    }

    #[test]
    fn test_latest_discards_history() {
        let hub = ProgressHub::new();
        let subscriber = hub.subscribe(8);

        let callback = hub.callback();
        callback(update(1));
        callback(update(2));

        drop(callback);
        hub.close();

        assert_eq!(subscriber.latest().unwrap().files_scanned, 2);
        assert!(subscriber.drain().is_empty());
    }
}
