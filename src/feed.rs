//! The chat feed: entries ordered newest-first, with at most one live AI
//! entry accumulating streamed text.

/// Text shown in a live entry before its first fragment lands.
pub const WAITING_PLACEHOLDER: &str = "⏳ Waiting for response...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Ai,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Ai => "AI · Zephyr",
            Role::User => "You",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Monotonic id, stable while newer entries push this one down.
    pub id: u64,
    pub role: Role,
    pub text: String,
    pub live: bool,
}

#[derive(Debug, Default)]
pub struct Feed {
    /// Newest first.
    entries: Vec<Entry>,
    next_id: u64,
    /// Id of the live entry, if any.
    live: Option<u64>,
    buffer: String,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry at the top and return its id.
    pub fn append_entry(&mut self, role: Role, text: impl Into<String>, live: bool) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            0,
            Entry {
                id,
                role,
                text: text.into(),
                live,
            },
        );
        id
    }

    /// Append a streamed fragment to the live entry, creating it first if
    /// needed. The entry text is replaced with the whole buffer.
    pub fn push_fragment(&mut self, fragment: &str) -> &Entry {
        let idx = match self.live.and_then(|id| self.position(id)) {
            Some(idx) => idx,
            None => {
                let id = self.append_entry(Role::Ai, WAITING_PLACEHOLDER, true);
                self.live = Some(id);
                0
            }
        };
        self.buffer.push_str(fragment);

        let entry = &mut self.entries[idx];
        entry.text.clone_from(&self.buffer);
        entry
    }

    /// Stop treating the live entry as live and reset the buffer.
    ///
    /// Returns the finalized entry id, or `None` if nothing was live. The
    /// entry keeps its accumulated text.
    pub fn finalize_live(&mut self) -> Option<u64> {
        let id = self.live.take()?;
        if let Some(idx) = self.position(id) {
            self.entries[idx].live = false;
        }
        self.buffer.clear();
        Some(id)
    }

    pub fn live_entry(&self) -> Option<&Entry> {
        self.live.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: u64) -> Option<&Entry> {
        self.position(id).map(|idx| &self.entries[idx])
    }

    /// Newest first.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: u64) -> Option<usize> {
        // Ids are assigned in insertion order and entries are newest-first.
        let newest = self.entries.first()?.id;
        let idx = newest.checked_sub(id)? as usize;
        (self.entries.get(idx)?.id == id).then_some(idx)
    }
}
