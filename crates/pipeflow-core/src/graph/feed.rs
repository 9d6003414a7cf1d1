use std::fmt;

/// What part of the model a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Loaded,
    Structure,
    Record,
    Assets,
    Status,
    Layout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    pub version: u64,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&Change) + Send>;

/// A monotonically increasing version counter with change listeners.
#[derive(Default)]
pub struct ChangeFeed {
    version: u64,
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("version", &self.version)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ChangeFeed {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Change) + Send + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        before != self.listeners.len()
    }

    pub(crate) fn bump(&mut self, kind: ChangeKind) -> u64 {
        self.version += 1;
        let change = Change {
            version: self.version,
            kind,
        };
        for (_, listener) in &mut self.listeners {
            listener(&change);
        }
        self.version
    }
}
