//! Fixed registry of tuner descriptors and their active flags.

use parking_lot::Mutex;

use tunerd_protocol::TunerStatus;

/// Static description of one tuner, built once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunerDescriptor {
    /// Identity shown in status output.
    pub name: String,
    /// Device name understood by the remote-control service.
    pub device: String,
    /// Address of the tuner's transport stream.
    pub url: String,
}

impl TunerDescriptor {
    pub fn new(name: impl Into<String>, device: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device: device.into(),
            url: url.into(),
        }
    }
}

/// Point-in-time copy of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunerSnapshot {
    pub index: usize,
    pub descriptor: TunerDescriptor,
    pub active: bool,
}

impl From<TunerSnapshot> for TunerStatus {
    fn from(snapshot: TunerSnapshot) -> Self {
        TunerStatus {
            name: snapshot.descriptor.name,
            url: snapshot.descriptor.url,
            active: snapshot.active,
        }
    }
}

/// Fixed-order set of tuner slots addressed by index.
///
/// Descriptors never change after construction. The `active` flags live
/// behind one lock that is only ever held for flag reads and writes, never
/// across an await point.
pub struct TunerRegistry {
    descriptors: Vec<TunerDescriptor>,
    active: Mutex<Vec<bool>>,
}

impl TunerRegistry {
    pub fn new(descriptors: Vec<TunerDescriptor>) -> Self {
        let active = Mutex::new(vec![false; descriptors.len()]);
        Self {
            descriptors,
            active,
        }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn descriptor(&self, index: usize) -> Option<&TunerDescriptor> {
        self.descriptors.get(index)
    }

    /// Copy of every slot in declaration order, taken under the lock.
    pub fn snapshot(&self) -> Vec<TunerSnapshot> {
        let flags = self.active.lock();
        self.descriptors
            .iter()
            .zip(flags.iter())
            .enumerate()
            .map(|(index, (descriptor, &active))| TunerSnapshot {
                index,
                descriptor: descriptor.clone(),
                active,
            })
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().iter().filter(|a| **a).count()
    }

    pub(crate) fn is_active(&self, index: usize) -> bool {
        self.active.lock().get(index).copied().unwrap_or(false)
    }

    /// Indices of idle slots in declaration order.
    pub(crate) fn idle_slots(&self) -> Vec<usize> {
        self.active
            .lock()
            .iter()
            .enumerate()
            .filter(|(_, active)| !**active)
            .map(|(index, _)| index)
            .collect()
    }

    pub(crate) fn mark_active(&self, index: usize) {
        if let Some(flag) = self.active.lock().get_mut(index) {
            *flag = true;
        }
    }

    pub(crate) fn release(&self, index: usize) {
        if let Some(flag) = self.active.lock().get_mut(index) {
            *flag = false;
        }
    }
}
