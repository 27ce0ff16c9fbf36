//! Edge sources and per-pin watch callbacks.

use crate::record::EdgeRecord;
use crate::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Called with `(pin, raw_level, tick)` for every edge on a watched pin.
pub type EdgeCallback = Arc<dyn Fn(u8, u32, u32) + Send + Sync>;

/// Anything that can report level changes on numbered input pins.
pub trait EdgeSource {
    /// Switch `pin` to a plain input.
    fn set_input(&self, pin: u8) -> Result<()>;

    /// Register `callback` for edges on `pin` until the returned watch is
    /// cancelled or dropped.
    fn watch(&self, pin: u8, callback: EdgeCallback) -> Result<Watch>;
}

struct Entry {
    id: u64,
    pin: u8,
    callback: EdgeCallback,
}

/// Routes edge records to the callbacks registered for their pin.
#[derive(Default)]
pub struct EdgeDispatcher {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl EdgeDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(self: &Arc<Self>, pin: u8, callback: EdgeCallback) -> Watch {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push(Entry { id, pin, callback });
        log::debug!("watch #{id} on pin {pin}");
        Watch {
            id,
            pin,
            dispatcher: Arc::downgrade(self),
            on_cancel: None,
        }
    }

    /// Deliver `record` to every watch on its pin. Returns the number of
    /// callbacks invoked.
    ///
    /// Callbacks run under the registry lock, so once [`Watch::cancel`]
    /// returns its callback is never entered again.
    pub fn dispatch(&self, record: &EdgeRecord) -> usize {
        let entries = self.entries.lock();
        let mut delivered = 0;
        for entry in entries.iter().filter(|e| e.pin == record.pin) {
            (entry.callback)(record.pin, record.level, record.tick);
            delivered += 1;
        }
        delivered
    }

    pub fn watched_pins(&self) -> Vec<u8> {
        let mut pins: Vec<u8> = self.entries.lock().iter().map(|e| e.pin).collect();
        pins.sort_unstable();
        pins.dedup();
        pins
    }

    fn unregister(&self, id: u64) {
        self.entries.lock().retain(|e| e.id != id);
    }
}

/// Handle for a registered callback.
pub struct Watch {
    id: u64,
    pin: u8,
    dispatcher: Weak<EdgeDispatcher>,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Watch {
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Run `hook` once the callback has been unregistered. Sources use this
    /// to tell the hardware side to stop reporting the pin.
    pub fn on_cancel(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    pub fn cancel(self) {}
}

impl Drop for Watch {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.unregister(self.id);
            log::debug!("watch #{} on pin {} cancelled", self.id, self.pin);
        }
        if let Some(hook) = self.on_cancel.take() {
            hook();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, EdgeCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, Arc::new(move |_: u8, _: u32, _: u32| {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_dispatch_by_pin() {
        let dispatcher = EdgeDispatcher::new();
        let (scl, scl_cb) = counter();
        let (sda, sda_cb) = counter();
        let _w1 = dispatcher.register(3, scl_cb);
        let _w2 = dispatcher.register(2, sda_cb);

        assert_eq!(dispatcher.dispatch(&EdgeRecord::new(3, 0, 1)), 1);
        assert_eq!(dispatcher.dispatch(&EdgeRecord::new(2, 1, 2)), 1);
        assert_eq!(dispatcher.dispatch(&EdgeRecord::new(3, 1, 3)), 1);
        assert_eq!(dispatcher.dispatch(&EdgeRecord::new(9, 1, 4)), 0);
        assert_eq!(scl.load(Ordering::SeqCst), 2);
        assert_eq!(sda.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.watched_pins(), vec![2, 3]);
    }

    #[test]
    fn test_cancel_stops_delivery() {
        let dispatcher = EdgeDispatcher::new();
        let (count, cb) = counter();
        let watch = dispatcher.register(4, cb);
        dispatcher.dispatch(&EdgeRecord::new(4, 0, 1));
        watch.cancel();
        dispatcher.dispatch(&EdgeRecord::new(4, 1, 2));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(dispatcher.watched_pins().is_empty());
    }

    #[test]
    fn test_watch_outlives_dispatcher() {
        let dispatcher = EdgeDispatcher::new();
        let (_, cb) = counter();
        let watch = dispatcher.register(1, cb);
        drop(dispatcher);
        watch.cancel();
    }

    #[test]
    fn test_cancel_hook_runs_after_unregister() {
        let dispatcher = EdgeDispatcher::new();
        let (_, cb) = counter();
        let seen = Arc::new(Mutex::new(None));
        let (d, s) = (dispatcher.clone(), seen.clone());
        let watch = dispatcher
            .register(5, cb)
            .on_cancel(move || *s.lock() = Some(d.watched_pins()));

        assert!(seen.lock().is_none());
        watch.cancel();
        assert_eq!(*seen.lock(), Some(vec![]));
    }
}
