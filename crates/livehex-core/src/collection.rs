//! Local record collection and its change notifications.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::record::blank_record;
use crate::version::RecordFormat;

/// A box slot, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub box_index: u8,
    pub slot: u8,
}

impl SlotRef {
    pub fn new(box_index: u8, slot: u8) -> Self {
        Self { box_index, slot }
    }
}

impl fmt::Display for SlotRef {
    /// One-based, the way the game numbers boxes and slots.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "box {} slot {}",
            u16::from(self.box_index) + 1,
            u16::from(self.slot) + 1
        )
    }
}

/// Where a touched record lives in the local editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLocation {
    Box(SlotRef),
    Party(u8),
}

/// What happened to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Slot was viewed or selected; contents untouched
    Select,
    Set,
    Delete,
    Swap,
    /// Contents replaced from the remote process
    External,
}

impl ChangeKind {
    /// Only operator edits count; remote-sourced replacements must not echo back.
    pub fn is_content_change(&self) -> bool {
        matches!(self, ChangeKind::Set | ChangeKind::Delete | ChangeKind::Swap)
    }
}

/// All slots of one box, in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxSnapshot {
    pub box_index: u8,
    pub slots: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub trait SlotListener: Send + Sync {
    fn on_slot_changed(&self, location: SlotLocation, kind: ChangeKind);
}

/// Publisher side of the local record collection.
pub trait SlotPublisher: Send + Sync {
    fn subscribe(&self, listener: Arc<dyn SlotListener>) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId);

    fn record_format(&self) -> RecordFormat;
    fn current_box(&self) -> u8;

    /// Current bytes of a slot, if the collection has it.
    fn slot_data(&self, slot: SlotRef) -> Option<Vec<u8>>;

    /// Replace a whole box with data read from the remote.
    fn replace_box(&self, snapshot: &BoxSnapshot);

    /// Replace a single slot with data read from the remote.
    fn replace_slot(&self, slot: SlotRef, data: &[u8]);
}

/// Capability of a host editor that owns a record collection.
pub trait SlotPublisherSource {
    fn slot_publisher(&self) -> Arc<dyn SlotPublisher>;
}

struct Boxes {
    slots: Vec<Vec<Vec<u8>>>,
    current_box: u8,
}

/// In-memory box storage with change notification.
pub struct BoxCollection {
    format: RecordFormat,
    boxes: RwLock<Boxes>,
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn SlotListener>)>>,
    next_id: AtomicU64,
}

impl BoxCollection {
    pub fn new(format: RecordFormat, box_count: usize, slots_per_box: usize) -> Self {
        let empty = blank_record(format);
        Self {
            format,
            boxes: RwLock::new(Boxes {
                slots: vec![vec![empty; slots_per_box]; box_count],
                current_box: 0,
            }),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn box_count(&self) -> usize {
        self.boxes.read().map(|b| b.slots.len()).unwrap_or(0)
    }

    /// Operator edit of a box slot.
    pub fn set_slot(&self, slot: SlotRef, data: Vec<u8>) {
        if self.store(slot, data) {
            self.notify(SlotLocation::Box(slot), ChangeKind::Set);
        }
    }

    /// Operator cleared a box slot. The slot is left holding an encrypted blank record.
    pub fn delete_slot(&self, slot: SlotRef) {
        if self.store(slot, blank_record(self.format)) {
            self.notify(SlotLocation::Box(slot), ChangeKind::Delete);
        }
    }

    /// Operator focused a slot without changing it.
    pub fn select_slot(&self, slot: SlotRef) {
        self.notify(SlotLocation::Box(slot), ChangeKind::Select);
    }

    pub fn set_current_box(&self, box_index: u8) {
        if let Ok(mut boxes) = self.boxes.write()
            && usize::from(box_index) < boxes.slots.len()
        {
            boxes.current_box = box_index;
        }
    }

    pub fn box_snapshot(&self, box_index: u8) -> Option<BoxSnapshot> {
        let boxes = self.boxes.read().ok()?;
        boxes.slots.get(usize::from(box_index)).map(|slots| BoxSnapshot {
            box_index,
            slots: slots.clone(),
        })
    }

    fn store(&self, slot: SlotRef, data: Vec<u8>) -> bool {
        let Ok(mut boxes) = self.boxes.write() else {
            return false;
        };
        match boxes
            .slots
            .get_mut(usize::from(slot.box_index))
            .and_then(|b| b.get_mut(usize::from(slot.slot)))
        {
            Some(target) => {
                *target = data;
                true
            }
            None => false,
        }
    }

    fn notify(&self, location: SlotLocation, kind: ChangeKind) {
        // Listeners run without any collection lock held so they may call back in.
        let listeners: Vec<_> = match self.listeners.lock() {
            Ok(l) => l.iter().map(|(_, l)| l.clone()).collect(),
            Err(_) => return,
        };
        trace!("{:?} {:?} -> {} listeners", location, kind, listeners.len());
        for listener in listeners {
            listener.on_slot_changed(location, kind);
        }
    }
}

impl SlotPublisher for BoxCollection {
    fn subscribe(&self, listener: Arc<dyn SlotListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, listener));
        }
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|(existing, _)| *existing != id);
        }
    }

    fn record_format(&self) -> RecordFormat {
        self.format
    }

    fn current_box(&self) -> u8 {
        self.boxes.read().map(|b| b.current_box).unwrap_or(0)
    }

    fn slot_data(&self, slot: SlotRef) -> Option<Vec<u8>> {
        let boxes = self.boxes.read().ok()?;
        boxes
            .slots
            .get(usize::from(slot.box_index))?
            .get(usize::from(slot.slot))
            .cloned()
    }

    fn replace_box(&self, snapshot: &BoxSnapshot) {
        let mut changed = Vec::new();
        if let Ok(mut boxes) = self.boxes.write()
            && let Some(target) = boxes.slots.get_mut(usize::from(snapshot.box_index))
        {
            for (i, (dst, src)) in target.iter_mut().zip(&snapshot.slots).enumerate() {
                dst.clone_from(src);
                changed.push(SlotRef::new(snapshot.box_index, i as u8));
            }
        }
        for slot in changed {
            self.notify(SlotLocation::Box(slot), ChangeKind::External);
        }
    }

    fn replace_slot(&self, slot: SlotRef, data: &[u8]) {
        if self.store(slot, data.to_vec()) {
            self.notify(SlotLocation::Box(slot), ChangeKind::External);
        }
    }
}
