use retroboy_sync::prelude::*;

/// Requests from the front end to the scheduler thread
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Load {
        rom: Vec<u8>,
        settings: EmulatorSettings,
    },
    Play,
    Pause,
    Resume,
    Reset,
    Shutdown,
}
