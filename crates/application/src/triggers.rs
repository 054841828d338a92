use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;

/// Queue depth between the hotkey thread and the UI loop. A press that
/// arrives while one is already waiting is dropped.
pub const TRIGGER_QUEUE_CAPACITY: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger;

#[derive(Debug, Clone)]
pub struct TriggerSender {
    sender: SyncSender<Trigger>,
    dropped: Arc<AtomicU64>,
}

#[derive(Debug)]
pub struct TriggerReceiver {
    receiver: Receiver<Trigger>,
    dropped: Arc<AtomicU64>,
}

pub fn trigger_channel() -> (TriggerSender, TriggerReceiver) {
    let (sender, receiver) = mpsc::sync_channel(TRIGGER_QUEUE_CAPACITY);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        TriggerSender {
            sender,
            dropped: Arc::clone(&dropped),
        },
        TriggerReceiver { receiver, dropped },
    )
}

impl TriggerSender {
    /// Never blocks. Returns `false` when the trigger was dropped.
    pub fn fire(&self) -> bool {
        match self.sender.try_send(Trigger) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("capture already pending, dropping hotkey press");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl TriggerReceiver {
    pub fn next(&self) -> Option<Trigger> {
        match self.receiver.try_recv() {
            Ok(trigger) => Some(trigger),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Discards everything queued; returns how many triggers were discarded.
    pub fn drain(&self) -> usize {
        let mut drained = 0;
        while self.receiver.try_recv().is_ok() {
            drained += 1;
        }
        if drained > 0 {
            self.dropped.fetch_add(drained as u64, Ordering::Relaxed);
        }
        drained
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
