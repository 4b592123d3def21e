use serde::Serialize;

/// What indicators show: connectivity and outstanding writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SyncStatus {
    pub online: bool,
    pub pending: u64,
}

impl SyncStatus {
    /// Nothing to show when online with an empty queue.
    pub fn is_idle(&self) -> bool {
        self.online && self.pending == 0
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.online, self.pending) {
            (false, _) => write!(f, "Offline mode ({} pending)", self.pending),
            (true, 0) => write!(f, "Online, all data synced"),
            (true, n) => write!(f, "Syncing {} item{}...", n, if n == 1 { "" } else { "s" }),
        }
    }
}
