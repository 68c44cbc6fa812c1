//! The control loop: one [`Controller::tick`] per scheduler pass.

use embedded_io::{Read, ReadReady, Write};

use crate::{
    config::ControllerConfig,
    error::{CommandError, Error, Result},
    hal::Board,
    input::{ButtonEvent, ButtonInputs, Command, LineDecoder, Selection},
    state_machine::ModeStateMachine,
    status::{StatusReporter, StatusSnapshot},
    storage::ModeStore,
    types::Instant,
};

/// Reply sent for any line that is not a command.
pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown command";

/// Owns every piece of controller state and the three collaborators.
///
/// Constructed once at power-up and ticked until power-off. Nothing in here blocks: settle
/// windows, the alarm and debouncing are all deadline checks against `now`.
pub struct Controller<B, S, L>
where
    B: Board,
    S: ModeStore,
    L: Read + ReadReady + Write,
{
    machine: ModeStateMachine<B, S>,
    buttons: ButtonInputs,
    decoder: LineDecoder,
    reporter: StatusReporter,
    link: L,
}

impl<B, S, L> Controller<B, S, L>
where
    B: Board,
    S: ModeStore,
    L: Read + ReadReady + Write,
{
    pub fn new(
        board: B,
        store: S,
        link: L,
        config: ControllerConfig,
        now: Instant,
    ) -> Result<Self, L::Error> {
        config.validate::<L::Error>()?;
        let machine = ModeStateMachine::new(board, store, &config, now);
        Ok(Self {
            machine,
            buttons: ButtonInputs::new(config.debounce),
            decoder: LineDecoder::new(),
            reporter: StatusReporter::new(config.status_interval),
            link,
        })
    }

    /// Run one pass of the control loop.
    ///
    /// The whole pass always runs; the first I/O error met on the way is returned at the end.
    pub fn tick(&mut self, now: Instant) -> Result<(), L::Error> {
        let buttons = self.handle_buttons(now);
        self.machine.tick_alarm(now);
        let commands = self.receive(now);

        self.machine.expire_failures(now);
        self.machine.supervise(now);
        self.machine.run(now);

        let status = self
            .reporter
            .poll(self.machine.board(), &mut self.link, now);

        buttons.and(commands).and(status.map(|_| ()))
    }

    /// Current indicator state.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.reporter.snapshot(self.machine.board())
    }

    pub fn machine(&self) -> &ModeStateMachine<B, S> {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut ModeStateMachine<B, S> {
        &mut self.machine
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Act on every accepted press, returning the first storage error.
    fn handle_buttons(&mut self, now: Instant) -> Result<(), L::Error> {
        let events = self.buttons.poll(self.machine.board_mut(), now);
        let mut outcome: Result<(), L::Error> = Ok(());
        for event in events {
            let handled = match event {
                ButtonEvent::Menu => {
                    let next = self.machine.operating_mode().next();
                    self.machine.select_operating_mode(next, now)
                }
                ButtonEvent::Select => {
                    if self.machine.operating_mode().accepts_source_selection() {
                        let next = self.machine.control_mode().next();
                        self.machine.select_control_mode(next, now)
                    } else {
                        Ok(())
                    }
                }
            };
            outcome = outcome.and(handled.map_err(Error::from));
        }
        outcome
    }

    /// Drain whatever the link has buffered without waiting for more.
    ///
    /// Every complete line is handled even when an earlier one failed; the first error is
    /// returned.
    fn receive(&mut self, now: Instant) -> Result<(), L::Error> {
        let mut chunk = [0u8; 16];
        let mut outcome: Result<(), L::Error> = Ok(());
        loop {
            let count = match self.read_chunk(&mut chunk) {
                Ok(0) => break,
                Ok(count) => count,
                Err(err) => return outcome.and(Err(err)),
            };
            for &byte in &chunk[..count] {
                if let Some(decoded) = self.decoder.push(byte) {
                    let handled = self.dispatch(decoded, now);
                    outcome = outcome.and(handled);
                }
            }
        }
        outcome
    }

    /// Read what is buffered, or nothing if the link has no data.
    fn read_chunk(&mut self, chunk: &mut [u8]) -> Result<usize, L::Error> {
        if !self.link.read_ready().map_err(Error::SerialError)? {
            return Ok(0);
        }
        self.link.read(chunk).map_err(Error::SerialError)
    }

    /// Apply a decoded line, then answer it. The selection never depends on the reply.
    fn dispatch(
        &mut self,
        decoded: core::result::Result<Command, CommandError>,
        now: Instant,
    ) -> Result<(), L::Error> {
        let command = match decoded {
            Ok(command) => command,
            Err(err) => {
                tracing::warn!("rejected serial line: {}", err);
                return self.reply(UNKNOWN_COMMAND_REPLY);
            }
        };

        match command.selection() {
            Selection::Operating(mode) => {
                self.machine.select_operating_mode(mode, now)?;
            }
            Selection::Control(mode) => {
                if !self.machine.operating_mode().accepts_source_selection() {
                    tracing::debug!("{:?} ignored in fully automatic mode", command);
                    return Ok(());
                }
                self.machine.select_control_mode(mode, now)?;
            }
        }
        self.reply(command.acknowledgement())
    }

    fn reply(&mut self, text: &str) -> Result<(), L::Error> {
        self.link
            .write_all(text.as_bytes())
            .and_then(|()| self.link.write_all(b"\n"))
            .map_err(Error::SerialError)
    }
}
