use crate::audio::driver::AudioDriver;
use crate::audio::sink::CpalSink;
use crate::command::HostCommand;
use crate::config::HostConfig;
use crate::event::HostEvent;
use crate::timers::DeadlineTimers;
use anyhow::Context;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use retroboy_sync::prelude::*;
use std::thread::JoinHandle;
use std::time::Instant;

/// The scheduler thread: owns the controller, its sink and its timers.
///
/// Commands and timer deadlines are handled on this one thread, so the
/// controller never sees concurrent calls.
pub struct HostRuntime<C, S> {
    controller: PlaybackController<C, S, DeadlineTimers>,
    command_rx: Receiver<HostCommand>,
    event_tx: Sender<HostEvent>,
    device_rate: Option<u32>,
    last_status: PlaybackStatus,
}

impl<C, S> HostRuntime<C, S>
where
    C: EmulationCore,
    S: AudioSink,
{
    pub fn new(
        controller: PlaybackController<C, S, DeadlineTimers>,
        command_rx: Receiver<HostCommand>,
        event_tx: Sender<HostEvent>,
    ) -> Self {
        let last_status = controller.status();
        Self {
            controller,
            command_rx,
            event_tx,
            device_rate: None,
            last_status,
        }
    }

    /// Cores get loaded at the output device's rate instead of the configured
    /// one, so buffer durations match the clock they are scheduled on.
    pub fn with_device_rate(mut self, rate: Option<u32>) -> Self {
        self.device_rate = rate;
        self
    }

    /// Block until a command arrives or the next timer is due, until shutdown
    pub fn run(mut self) {
        log::info!("Scheduler thread running");
        loop {
            let received = match self.controller.timers().next_deadline() {
                Some(deadline) => self.command_rx.recv_deadline(deadline),
                None => self
                    .command_rx
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(HostCommand::Shutdown) => break,
                Ok(command) => self.handle_command(command),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("Command channel closed");
                    break;
                }
            }

            self.fire_due(Instant::now());
        }

        log::info!("Scheduler thread stopped: {:?}", self.controller.stats());
        self.emit(HostEvent::Stopped(self.controller.stats()));
    }

    /// Handle every command already queued, without blocking
    pub fn process_commands(&mut self) -> bool {
        while let Ok(command) = self.command_rx.try_recv() {
            if command == HostCommand::Shutdown {
                return false;
            }
            self.handle_command(command);
        }
        true
    }

    /// Deliver every timer due at `now` to the controller
    pub fn fire_due(&mut self, now: Instant) {
        while let Some(timer) = self.controller.timers_mut().pop_due(now) {
            let result = self.controller.on_timer(timer);
            self.report(result);
        }
    }

    pub fn controller(&self) -> &PlaybackController<C, S, DeadlineTimers> {
        &self.controller
    }

    fn handle_command(&mut self, command: HostCommand) {
        log::debug!("Command: {:?}", CommandName(&command));
        let result = match command {
            HostCommand::Load { rom, mut settings } => {
                if let Some(rate) = self.device_rate
                    && rate != settings.audio_sample_rate
                {
                    log::info!(
                        "Using the output device rate of {} Hz instead of {} Hz",
                        rate,
                        settings.audio_sample_rate
                    );
                    settings.audio_sample_rate = rate;
                }
                self.controller
                    .load(&rom, &settings)
                    .map(|metadata| self.emit(HostEvent::Loaded(metadata)))
            }
            HostCommand::Play => self.controller.play(),
            HostCommand::Pause => self.controller.pause(),
            HostCommand::Resume => self.controller.resume(),
            HostCommand::Reset => self.controller.reset().map(|outcome| {
                if outcome == ResetOutcome::Deferred {
                    self.emit(HostEvent::ResetDeferred);
                }
            }),
            HostCommand::Shutdown => Ok(()),
        };
        self.report(result);
    }

    fn report(&mut self, result: Result<(), PlaybackError>) {
        match result {
            Ok(()) => {}
            Err(PlaybackError::Halted(error)) => {
                log::error!("Playback halted: {}", error);
                self.emit(HostEvent::Halted(error.to_string()));
            }
            Err(error) => {
                log::warn!("{}", error);
                self.emit(HostEvent::Rejected(error.to_string()));
            }
        }

        let status = self.controller.status();
        if status != self.last_status {
            self.last_status = status;
            self.emit(HostEvent::StatusChanged(status));
        }
    }

    fn emit(&self, event: HostEvent) {
        // The front end may already be gone
        self.event_tx.send(event).ok();
    }
}

/// Debug view of a command that leaves out the ROM bytes
struct CommandName<'a>(&'a HostCommand);

impl std::fmt::Debug for CommandName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            HostCommand::Load { rom, settings } => f
                .debug_struct("Load")
                .field("rom_bytes", &rom.len())
                .field("settings", settings)
                .finish(),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Front-end side of a spawned scheduler thread
pub struct HostHandle {
    command_tx: Sender<HostCommand>,
    event_rx: Receiver<HostEvent>,
    thread: Option<JoinHandle<()>>,
}

impl HostHandle {
    pub fn send(&self, command: HostCommand) {
        let _ = self.command_tx.send(command);
    }

    pub fn try_recv(&self) -> Option<HostEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Another receiver for the event stream
    pub fn events(&self) -> Receiver<HostEvent> {
        self.event_rx.clone()
    }

    /// Stop the scheduler thread and wait for it
    pub fn shutdown(mut self) -> anyhow::Result<()> {
        self.send(HostCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| anyhow::anyhow!("Scheduler thread panicked"))?;
        }
        Ok(())
    }
}

/// Start the scheduler thread with the default output device.
///
/// `make_core` runs on the new thread, so the core itself need not be `Send`.
/// The output device is opened on the first `Play`.
pub fn spawn<C, F>(make_core: F, config: &HostConfig) -> anyhow::Result<HostHandle>
where
    C: EmulationCore + 'static,
    F: FnOnce() -> C + Send + 'static,
{
    config.validate()?;
    let sync = config.sync;

    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    let (event_tx, event_rx) = crossbeam_channel::unbounded();

    let thread = std::thread::Builder::new()
        .name("retroboy-scheduler".into())
        .spawn(move || {
            let driver = match AudioDriver::init() {
                Ok(driver) => Some(driver),
                Err(e) => {
                    log::error!("Audio output unavailable: {:#}", e);
                    None
                }
            };
            let device_rate = driver.as_ref().map(AudioDriver::sample_rate);

            let open_sink = move || match driver.as_ref() {
                Some(driver) => CpalSink::open(driver)
                    .map_err(|e| SinkError::Unavailable(format!("{e:#}"))),
                None => Err(SinkError::Unavailable("no output device".into())),
            };

            match PlaybackController::new(make_core(), DeadlineTimers::new(), open_sink, sync) {
                Ok(controller) => HostRuntime::new(controller, command_rx, event_tx)
                    .with_device_rate(device_rate)
                    .run(),
                Err(e) => {
                    log::error!("Failed to start the scheduler: {}", e);
                    event_tx.send(HostEvent::Rejected(e.to_string())).ok();
                }
            }
        })
        .context("Failed to spawn the scheduler thread")?;

    Ok(HostHandle {
        command_tx,
        event_rx,
        thread: Some(thread),
    })
}
