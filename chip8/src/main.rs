use std::ffi::OsString;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{value_parser, Parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use emu8_core::constants::{CPU_CYCLES_PER_TIMER_CYCLE, MAX_SAVED_STATES};
use emu8_core::{Chip8, CLOCK_SPEED};
use emu8_display::Display;

use crate::input::SdlInput;
use crate::keymap::Keymap;
use crate::run::run;
use crate::speaker::Speaker;

mod input;
mod keymap;
mod run;
mod speaker;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// A Chip-8 emulator
///
/// Keypad: 1234/QWER/ASDF/ZXCV. Hold Space to fast-forward and Escape to rewind.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the ROM file to run
    rom: PathBuf,

    /// Instructions executed per second
    #[arg(long, default_value_t = NANOS_PER_SECOND / CLOCK_SPEED, value_parser = value_parser!(u64).range(1..))]
    clock_hz: u64,

    /// Instructions executed per timer tick
    #[arg(long, default_value_t = CPU_CYCLES_PER_TIMER_CYCLE, value_parser = value_parser!(u32).range(1..))]
    timer_divider: u32,

    /// Window pixels per Chip-8 pixel
    #[arg(long, default_value_t = 10, value_parser = value_parser!(u32).range(1..))]
    scale: u32,

    /// Number of past states kept for rewinding; 0 disables rewinding
    #[arg(long, default_value_t = MAX_SAVED_STATES)]
    rewind_depth: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => {
            let code = usage_exit_code(&e);
            let _ = e.print();
            process::exit(code);
        }
    };

    if let Err(e) = emulate(&args) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn parse_args<I, T>(args: I) -> Result<Args, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(args)
}

/// Usage errors exit with 1 like every other startup failure; help and version are not errors
fn usage_exit_code(e: &clap::Error) -> i32 {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

/// Builds a Chip8 from the command line and loads its ROM
fn load(args: &Args) -> anyhow::Result<Chip8> {
    let mut chip8 = Chip8::new()
        .with_rewind_depth(args.rewind_depth)
        .with_timer_divider(args.timer_divider);

    let file = File::open(&args.rom)
        .with_context(|| format!("unable to open {}", args.rom.display()))?;
    let mut reader = BufReader::new(file);
    chip8
        .load_rom(&mut reader)
        .with_context(|| format!("unable to load {}", args.rom.display()))?;
    Ok(chip8)
}

fn emulate(args: &Args) -> anyhow::Result<()> {
    let mut chip8 = load(args)?;
    info!(rom = %args.rom.display(), clock_hz = args.clock_hz, "starting");

    // Get SDL2 context
    let sdl: sdl2::Sdl = sdl2::init().map_err(anyhow::Error::msg)?;
    let mut display = Display::new(&sdl, args.scale)?;
    let events = sdl.event_pump().map_err(anyhow::Error::msg)?;
    let mut input = SdlInput::new(events, Keymap::default());
    let mut speaker = Speaker::default();

    let cycle_time = Duration::from_nanos(NANOS_PER_SECOND / args.clock_hz);
    let exit = run(&mut chip8, &mut input, &mut display, &mut speaker, cycle_time)?;
    if speaker.is_playing() {
        speaker.stop();
    }
    info!(?exit, "stopped");
    Ok(())
}
