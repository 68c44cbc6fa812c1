//! Runs the controller on the host against a simulated board.
//!
//! The companion app link is a real serial port. The board's health inputs and buttons are
//! driven from an interactive prompt.

use std::{env, sync::mpsc, thread, time};

use inquire::Select;
use light3phase_ats::{
    config::ControllerConfig,
    controller::Controller,
    hal::{Board, Input, Level, Output},
    storage::ModeStore,
    types::{Duration, Instant},
};
use serialport::SerialPort;

// Configuration constants - adjust these for your setup
const BAUD_RATE: u32 = 9600;
const SERIAL_TIMEOUT_MS: u64 = 50;
const TICK_MS: u64 = 10;
// How long a simulated button press is held.
const PRESS_MS: u32 = 100;

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::ReadReady for PortWrapper {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        self.0
            .bytes_to_read()
            .map(|pending| pending > 0)
            .map_err(|err| IoError(err.into()))
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

/// Pin levels kept in memory, indexed by pin number.
#[derive(Default)]
struct SimulatedBoard {
    pins: [Level; 32],
}

impl Board for SimulatedBoard {
    fn set_output(&mut self, output: Output, level: Level) {
        let pin = output.pin() as usize;
        if self.pins[pin] != level {
            println!("  {:?} -> {:?}", output, level);
        }
        self.pins[pin] = level;
    }

    fn output_level(&self, output: Output) -> Level {
        self.pins[output.pin() as usize]
    }

    fn input_level(&mut self, input: Input) -> Level {
        self.pins[input.pin() as usize]
    }
}

impl SimulatedBoard {
    fn toggle(&mut self, input: Input) {
        let pin = input.pin() as usize;
        self.pins[pin] = (!bool::from(self.pins[pin])).into();
        println!("  {:?} is now {:?}", input, self.pins[pin]);
    }

    fn set(&mut self, input: Input, level: Level) {
        self.pins[input.pin() as usize] = level;
    }
}

/// Stands in for the EEPROM. Starts erased, like a fresh part.
struct RamStore([u8; 2]);

impl ModeStore for RamStore {
    type Error = embedded_io::ErrorKind;

    fn read_byte(&mut self, address: u16) -> Result<u8, Self::Error> {
        self.0
            .get(address as usize)
            .copied()
            .ok_or(embedded_io::ErrorKind::InvalidInput)
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), Self::Error> {
        let cell = self
            .0
            .get_mut(address as usize)
            .ok_or(embedded_io::ErrorKind::InvalidInput)?;
        *cell = value;
        Ok(())
    }
}

enum Action {
    Toggle(Input),
    Press(Input),
}

const ACTIONS: [(&str, Option<Action>); 6] = [
    ("Toggle grid health", Some(Action::Toggle(Input::GridCheck))),
    ("Toggle generator health", Some(Action::Toggle(Input::GeneratorCheck))),
    ("Toggle load health", Some(Action::Toggle(Input::LoadCheck))),
    ("Press menu button", Some(Action::Press(Input::MenuButton))),
    ("Press select button", Some(Action::Press(Input::SelectButton))),
    ("Quit", None),
];

fn prompt(actions: mpsc::Sender<Action>) {
    let labels: Vec<&str> = ACTIONS.iter().map(|(label, _)| *label).collect();
    loop {
        let Ok(choice) = Select::new("Board:", labels.clone()).prompt() else {
            return;
        };
        let action = match ACTIONS.iter().find(|(label, _)| *label == choice) {
            Some((_, Some(Action::Toggle(input)))) => Action::Toggle(*input),
            Some((_, Some(Action::Press(input)))) => Action::Press(*input),
            _ => return,
        };
        if actions.send(action).is_err() {
            return;
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select the companion app port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let port = serialport::new(&port_name, BAUD_RATE)
        .timeout(time::Duration::from_millis(SERIAL_TIMEOUT_MS))
        .open()
        .expect("Failed to open serial port");

    let started = time::Instant::now();
    let clock = || Instant::from_ticks(started.elapsed().as_millis() as u32);

    let mut controller = Controller::new(
        SimulatedBoard::default(),
        RamStore([0xFF; 2]),
        PortWrapper(port),
        ControllerConfig::default(),
        clock(),
    )
    .expect("Failed to start the controller");

    let (sender, receiver) = mpsc::channel();
    let prompt_thread = thread::spawn(move || prompt(sender));

    let mut release: Option<(Input, Instant)> = None;
    loop {
        let now = clock();

        match receiver.try_recv() {
            Ok(Action::Toggle(input)) => controller.machine_mut().board_mut().toggle(input),
            Ok(Action::Press(input)) => {
                controller.machine_mut().board_mut().set(input, Level::High);
                release = Some((input, now + Duration::millis(PRESS_MS)));
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => break,
        }
        if let Some((input, at)) = release
            && now >= at
        {
            controller.machine_mut().board_mut().set(input, Level::Low);
            release = None;
        }

        if let Err(err) = controller.tick(now) {
            eprintln!("Tick failed: {}", err);
        }
        thread::sleep(time::Duration::from_millis(TICK_MS));
    }

    let _ = prompt_thread.join();
    println!("Final status: {:#?}", controller.snapshot());
}
