//! gfxterm - framebuffer terminal viewer
//!
//! Runs the terminal core against an in-memory framebuffer and shows the
//! pixels in the console. Input comes from a file, from stdin or from the
//! keyboard.
//!
//! # Quick Start
//!
//! ```text
//! gfxterm                    # Interactive, type into the framebuffer
//! gfxterm -f session.ans     # Replay a captured byte stream
//! gfxterm --dump < out.txt   # Print the recognized text instead
//! ```
//!
//! # Keys (interactive mode)
//!
//! | Key | Action |
//! |-----|--------|
//! | Esc | Quit |
//! | Enter | CR LF |
//! | Ctrl+letter | Control code (Ctrl+G rings the bell) |

use std::env;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gfxterm::config::{self, Config};
use gfxterm::ui::{DebugRenderer, Renderer};
use gfxterm::{CursorBlinker, SharedTerminal, Terminal};

/// Command line options
#[derive(Debug, Default)]
struct Args {
    /// Config file overriding ~/.gfxterm/config.toml
    config: Option<PathBuf>,
    /// Byte stream to feed before going interactive
    input: Option<PathBuf>,
    /// Print the recognized text and exit
    dump: bool,
    verbose: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

const BANNER: &str = concat!(
    "\x1b[2J\x1b[1;1H",
    "\x1b[38;5;15mgfxterm\x1b[0m framebuffer terminal\r\n",
    "\r\n",
    "Colors: \x1b[31mRed\x1b[0m \x1b[32mGreen\x1b[0m \x1b[34mBlue\x1b[0m ",
    "\x1b[93mBright\x1b[0m \x1b[7mInverse\x1b[27m\r\n",
    "Tabs:\tone\ttwo\tthree\r\n",
    "\r\n",
    "Type to write into the framebuffer, Esc quits.\r\n",
    "\r\n",
);

fn print_version() {
    eprintln!("gfxterm {}", VERSION);
}

fn print_help() {
    eprintln!("gfxterm {} - framebuffer terminal viewer", VERSION);
    eprintln!();
    eprintln!("Usage: gfxterm [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <PATH>   Read configuration from PATH");
    eprintln!("  -f, --file <PATH>     Feed the bytes of PATH to the terminal");
    eprintln!("  -d, --dump            Print the screen as text and exit");
    eprintln!("                        (reads stdin when no file is given)");
    eprintln!("      --verbose         Log escape sequences that were ignored");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.gfxterm/config.toml");
    eprintln!("Log file:      ~/.gfxterm/gfxterm.log");
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                let path = args.get(i).ok_or("Missing config path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "-f" | "--file" => {
                i += 1;
                let path = args.get(i).ok_or("Missing input file")?;
                parsed.input = Some(PathBuf::from(path));
            }
            "-d" | "--dump" => {
                parsed.dump = true;
            }
            "--verbose" => {
                parsed.verbose = true;
            }
            arg if !arg.starts_with('-') && parsed.input.is_none() => {
                parsed.input = Some(PathBuf::from(arg));
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

fn init_logging(verbose: bool) {
    let log_path = config::config_dir()
        .map(|dir| dir.join("gfxterm.log"))
        .unwrap_or_else(|| PathBuf::from("gfxterm.log"));

    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let level = if verbose { Level::DEBUG } else { Level::INFO };
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging(args.verbose);
    info!("gfxterm starting...");

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    let mut input = Vec::new();
    if let Some(path) = &args.input {
        input = fs::read(path)?;
    } else if args.dump && !io::stdin().is_terminal() {
        io::stdin().read_to_end(&mut input)?;
    }

    let mut terminal = Terminal::in_memory(config.terminal_options())?;

    if args.dump {
        terminal.put_string(&input);
        print!("{}", DebugRenderer::render(terminal.state()));
        return Ok(());
    }

    if input.is_empty() {
        terminal.put_string(BANNER.as_bytes());
    } else {
        terminal.put_string(&input);
    }
    run_viewer(SharedTerminal::new(terminal), &config)
}

/// Show the framebuffer and echo keys into the terminal until Esc
fn run_viewer(terminal: SharedTerminal, config: &Config) -> anyhow::Result<()> {
    // `ESC[?25b` may turn blinking on at any time; ticks are no-ops until then
    let mut blinker = CursorBlinker::start(terminal.clone(), Duration::from_millis(config.blink_interval_ms));

    let mut renderer = Renderer::new(config.get_palette());
    renderer.init()?;
    let result = run_main_loop(&terminal, &mut renderer);
    renderer.cleanup()?;

    blinker.stop();
    info!("gfxterm exiting");
    result
}

fn run_main_loop(terminal: &SharedTerminal, renderer: &mut Renderer) -> anyhow::Result<()> {
    let poll_timeout = Duration::from_millis(20);

    loop {
        {
            let mut term = terminal.lock();
            if term.take_dirty() {
                renderer.render(term.surface())?;
            }
        }

        if !event::poll(poll_timeout)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.code == KeyCode::Esc {
                    break;
                }
                if let Some(bytes) = key_to_bytes(&key) {
                    terminal.put_string(&bytes);
                }
            }
            Event::Resize(..) => {
                renderer.invalidate();
                renderer.render(terminal.lock().surface())?;
            }
            _ => {}
        }
    }

    Ok(())
}

/// Bytes a key press sends to the terminal. Characters outside Latin-1
/// have no glyph and are dropped.
fn key_to_bytes(key: &KeyEvent) -> Option<Vec<u8>> {
    match key.code {
        KeyCode::Enter => Some(b"\r\n".to_vec()),
        KeyCode::Backspace => Some(vec![0x08]),
        KeyCode::Tab => Some(vec![0x09]),
        KeyCode::Delete => Some(vec![0x7F]),
        KeyCode::Up => Some(b"\x1b[1A".to_vec()),
        KeyCode::Down => Some(b"\x1b[1B".to_vec()),
        KeyCode::Right => Some(b"\x1b[1C".to_vec()),
        KeyCode::Left => Some(b"\x1b[1D".to_vec()),
        KeyCode::Home => Some(b"\x1b[H".to_vec()),
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) && c.is_ascii_alphabetic() => {
            Some(vec![(c.to_ascii_lowercase() as u8) & 0x1F])
        }
        KeyCode::Char(c) => u8::try_from(u32::from(c)).ok().map(|b| vec![b]),
        _ => None,
    }
}
