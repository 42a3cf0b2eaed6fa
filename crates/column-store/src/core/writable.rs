//! Subscribable value cell.
//!
//! Listeners run synchronously on every write, in registration order, and
//! receive the current value once on registration. Async consumers can use
//! [`Writable::watch`] instead.
//!
//! Writes are queued and delivered one at a time by whichever caller is
//! draining, so every listener sees the same sequence of values in the
//! order they were written, even when writes come from several threads or
//! from inside a listener.

use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, Weak,
};

use tokio::sync::watch;

use crate::core::lock;

pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct Writable<T> {
    tx: watch::Sender<T>,
    listeners: Mutex<Vec<(u64, Listener<T>)>>,
    next_id: AtomicU64,
    pending: Mutex<VecDeque<T>>,
    draining: AtomicBool,
}

impl<T: Clone + Send + Sync + 'static> Writable<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            pending: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn set(&self, value: T) {
        self.stage(value);
        self.flush();
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.stage_update(f);
        self.flush();
    }

    /// Stores `value` and queues it for listeners without running them.
    /// Pair with [`Writable::flush`] once no caller lock is held.
    pub fn stage(&self, value: T) {
        let mut pending = lock(&self.pending);
        self.tx.send_replace(value.clone());
        pending.push_back(value);
    }

    pub fn stage_update(&self, f: impl FnOnce(&mut T)) {
        let mut pending = lock(&self.pending);
        self.tx.send_modify(f);
        pending.push_back(self.tx.borrow().clone());
    }

    /// Delivers queued values to listeners. Returns at once if another call
    /// is already draining; that call picks up whatever was queued.
    pub fn flush(&self) {
        loop {
            if self.draining.swap(true, Ordering::AcqRel) {
                return;
            }
            loop {
                let next = lock(&self.pending).pop_front();
                let Some(value) = next else { break };
                let listeners: Vec<Listener<T>> = lock(&self.listeners).iter().map(|(_, l)| l.clone()).collect();
                for listener in listeners {
                    listener(&value);
                }
            }
            self.draining.store(false, Ordering::Release);
            // A write may have been queued after the last pop but before the flag dropped.
            if lock(&self.pending).is_empty() {
                return;
            }
        }
    }

    pub fn watch(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn subscribe(self: &Arc<Self>, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener<T> = Arc::new(listener);
        lock(&self.listeners).push((id, listener.clone()));
        listener(&self.get());
        Subscription {
            store: Arc::downgrade(self),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    pub fn clear(&self) {
        lock(&self.listeners).clear();
    }

    fn remove(&self, id: u64) -> bool {
        let mut guard = lock(&self.listeners);
        let before = guard.len();
        guard.retain(|(lid, _)| *lid != id);
        guard.len() != before
    }
}

/// Handle returned by [`Writable::subscribe`]. Dropping it does not
/// unsubscribe.
pub struct Subscription<T> {
    store: Weak<Writable<T>>,
    id: u64,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    pub fn unsubscribe(self) -> bool {
        match self.store.upgrade() {
            Some(store) => store.remove(self.id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_delivers_current_value_immediately() {
        let w = Arc::new(Writable::new(1));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = w.subscribe(move |v| s.lock().unwrap().push(*v));
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn listeners_observe_same_order() {
        let w = Arc::new(Writable::new(0));
        let a = Arc::new(Mutex::new(Vec::new()));
        let b = Arc::new(Mutex::new(Vec::new()));
        let (a2, b2) = (a.clone(), b.clone());
        let _sa = w.subscribe(move |v| a2.lock().unwrap().push(*v));
        let _sb = w.subscribe(move |v| b2.lock().unwrap().push(*v));
        w.set(5);
        w.update(|v| *v += 1);
        assert_eq!(*a.lock().unwrap(), vec![0, 5, 6]);
        assert_eq!(*a.lock().unwrap(), *b.lock().unwrap());
    }

    #[test]
    fn write_from_listener_is_delivered_after_current_value() {
        let w = Arc::new(Writable::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::downgrade(&w);
        let _bump = w.subscribe(move |v| {
            if *v == 1 {
                if let Some(w) = inner.upgrade() {
                    w.set(2);
                }
            }
        });
        let s = seen.clone();
        let _log = w.subscribe(move |v| s.lock().unwrap().push(*v));

        w.set(1);

        // Both listeners see 1 before anyone sees 2.
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(w.get(), 2);
    }

    #[test]
    fn concurrent_writers_deliver_every_value_in_one_order() {
        let w = Arc::new(Writable::new(0u64));
        let a = Arc::new(Mutex::new(Vec::new()));
        let b = Arc::new(Mutex::new(Vec::new()));
        let (a2, b2) = (a.clone(), b.clone());
        let _sa = w.subscribe(move |v| a2.lock().unwrap().push(*v));
        let _sb = w.subscribe(move |v| b2.lock().unwrap().push(*v));

        let writers: Vec<_> = (0..4u64)
            .map(|t| {
                let w = w.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        w.set(t * 1000 + i + 1);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let a = a.lock().unwrap().clone();
        assert_eq!(a.len(), 401);
        assert_eq!(a, *b.lock().unwrap());
        assert_eq!(a.last().copied(), Some(w.get()));
        let mut distinct = a.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 401);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let w = Arc::new(Writable::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let sub = w.subscribe(move |v| s.lock().unwrap().push(*v));
        assert!(sub.unsubscribe());
        w.set(3);
        assert_eq!(*seen.lock().unwrap(), vec![0]);
        assert_eq!(w.listener_count(), 0);
    }

    #[test]
    fn poisoned_listener_lock_is_recovered() {
        let w = Arc::new(Writable::new(0));
        let poison = w.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poison.listeners.lock().unwrap();
            panic!("poison the listener list");
        })
        .join();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = w.subscribe(move |v| s.lock().unwrap().push(*v));
        w.set(4);
        assert_eq!(*seen.lock().unwrap(), vec![0, 4]);
        assert_eq!(w.listener_count(), 1);
    }

    #[tokio::test]
    async fn watch_sees_latest_value() {
        let w = Writable::new("a".to_string());
        let mut rx = w.watch();
        w.set("b".to_string());
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), "b");
    }
}
