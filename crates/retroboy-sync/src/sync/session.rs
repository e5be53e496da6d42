use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn next(self) -> SessionId {
        SessionId(self.0.wrapping_add(1))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        SessionId(1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
}

/// One play -> (pause/resume)* -> reset lifecycle.
///
/// Idle is represented by the controller holding no session at all.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub(crate) id: SessionId,
    pub(crate) status: PlaybackStatus,
    pub(crate) pending_reset: bool,
}

impl PlaybackSession {
    pub(crate) fn start(id: SessionId) -> Self {
        Self {
            id,
            status: PlaybackStatus::Playing,
            pending_reset: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn pending_reset(&self) -> bool {
        self.pending_reset
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }
}
