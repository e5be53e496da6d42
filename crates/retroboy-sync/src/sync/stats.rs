/// Running counters for diagnostics overlays and logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub steps_requested: u64,
    pub buffers_scheduled: u64,
    pub empty_buffers: u64,
    /// Buffers whose start time had already passed when scheduled
    pub late_buffers: u64,
    pub stale_timers: u64,
    pub resets_applied: u64,
    pub halts: u64,
}
