//! Mock MPLAB debugger binary for integration testing
//!
//! Speaks the subset of the debugger's console the harness uses. The
//! "firmware" is a list of addresses executed in order; `run`/`continue`
//! followed by `wait` halts at the next one that carries a breakpoint.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "mock_mdb")]
struct Args {
    /// Addresses the firmware passes through, comma separated
    #[arg(long, value_delimiter = ',')]
    trace: Vec<String>,

    /// Variable values as name=value, repeatable
    #[arg(long = "var")]
    vars: Vec<String>,

    /// Cycles spent per address executed
    #[arg(long, default_value_t = 100)]
    cycles_per_step: u64,

    /// Exit abruptly when this command is received
    #[arg(long)]
    crash_on: Option<String>,

    /// Never report readiness on stderr
    #[arg(long)]
    silent: bool,

    /// Exit before reporting readiness, closing stderr
    #[arg(long)]
    exit_immediately: bool,

    /// Append every received command except sentinel echoes to this file
    #[arg(long)]
    transcript: Option<PathBuf>,
}

struct MockState {
    trace: Vec<String>,
    vars: HashMap<String, String>,
    cycles_per_step: u64,
    breakpoints: Vec<String>,
    /// Index into the trace of the next address to execute
    position: usize,
    running: bool,
    cycles: u64,
    watchpoints: usize,
}

impl MockState {
    fn new(args: &Args) -> Self {
        let vars = args
            .vars
            .iter()
            .filter_map(|v| v.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        Self {
            trace: args.trace.iter().map(|a| normalize(a)).collect(),
            vars,
            cycles_per_step: args.cycles_per_step,
            breakpoints: Vec::new(),
            position: 0,
            running: false,
            cycles: 0,
            watchpoints: 0,
        }
    }

    fn process(&mut self, command: &str) -> Vec<String> {
        let (verb, rest) = command.split_once(' ').unwrap_or((command, ""));
        let rest = rest.trim();

        match verb {
            "echo" => vec![format!(">/*{}*/", rest)],
            "device" | "hwtool" | "set" => Vec::new(),
            "program" => {
                let path = rest.trim_matches('"');
                if Path::new(path).exists() {
                    vec![
                        "Programming target...".to_string(),
                        "Program succeeded.".to_string(),
                    ]
                } else {
                    vec![format!("Error: file {} not found", path)]
                }
            }
            "run" => {
                self.position = 0;
                self.cycles = 0;
                self.running = true;
                vec!["Running".to_string()]
            }
            "continue" => {
                self.running = true;
                vec!["Running".to_string()]
            }
            "wait" => self.wait(),
            "break" => {
                let address = normalize(rest.trim_start_matches('*'));
                let reply = format!(
                    "Breakpoint {} at 0x{}.",
                    self.breakpoints.len() + 1,
                    address.to_lowercase()
                );
                self.breakpoints.push(address);
                vec![reply]
            }
            "delete" => {
                self.breakpoints.clear();
                Vec::new()
            }
            "print" => {
                let name = rest.rsplit(' ').next().unwrap_or_default();
                match self.vars.get(name) {
                    Some(value) => vec![format!("{} = {}", name, value)],
                    None => vec![format!("{} = Symbol does not exist", name)],
                }
            }
            "watch" => {
                let target = rest.split(' ').next().unwrap_or_default();
                if self.vars.contains_key(target) {
                    self.watchpoints += 1;
                    vec![format!("Watchpoint {} at {}", self.watchpoints, target)]
                } else {
                    vec![format!(">Error: Unknown symbol {}", target)]
                }
            }
            "stim" if rest.is_empty() => Vec::new(),
            "stim" => {
                if Path::new(rest.trim_matches('"')).exists() {
                    vec!["Stimulus file loaded.".to_string()]
                } else {
                    vec!["Invalid stimulus file".to_string()]
                }
            }
            "halt" => {
                self.running = false;
                Vec::new()
            }
            "reset" => {
                self.position = 0;
                self.cycles = 0;
                self.running = false;
                vec!["Resetting target".to_string()]
            }
            "step" | "next" => self.advance(1),
            "stepi" => self.advance(rest.parse().unwrap_or(1)),
            "stopwatch" => vec![format!(
                "Stopwatch cycle count = {} ({} us)",
                self.cycles,
                self.cycles / 10
            )],
            _ => vec![format!("Unknown command: {}", command)],
        }
    }

    /// Halt at the next traced address with a breakpoint, if any
    fn wait(&mut self) -> Vec<String> {
        if !self.running {
            return Vec::new();
        }

        let hit = self.trace[self.position.min(self.trace.len())..]
            .iter()
            .position(|address| self.breakpoints.contains(address));

        match hit {
            Some(offset) => {
                let index = self.position + offset;
                self.cycles += (offset as u64 + 1) * self.cycles_per_step;
                self.position = index + 1;
                self.running = false;
                vec![
                    "Stop at".to_string(),
                    format!("\taddress:0x{}", self.trace[index].to_lowercase()),
                    "\tfile:main.s".to_string(),
                    format!("\tsource line:{}", index + 1),
                ]
            }
            None => Vec::new(),
        }
    }

    fn advance(&mut self, count: u64) -> Vec<String> {
        self.position = (self.position + count as usize).min(self.trace.len());
        self.cycles += count * self.cycles_per_step;
        vec!["Single step".to_string()]
    }
}

fn normalize(address: &str) -> String {
    let address = address.trim();
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address)
        .to_uppercase()
}

fn main() {
    let args = Args::parse();
    if args.exit_immediately {
        eprintln!("mock_mdb: no license found");
        std::process::exit(1);
    }
    let mut state = MockState::new(&args);

    if !args.silent {
        eprintln!("WARNING: Unable to create a system terminal, creating a dumb terminal");
    }

    let mut transcript = args.transcript.as_ref().and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut writer = stdout.lock();

    for line in BufReader::new(stdin.lock()).lines() {
        let Ok(line) = line else { break };
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        if let Some(file) = transcript.as_mut().filter(|_| !command.starts_with("echo ")) {
            writeln!(file, "{}", command).ok();
        }

        if command == "quit" {
            break;
        }
        if args.crash_on.as_deref() == Some(command) {
            std::process::exit(3);
        }

        for reply in state.process(command) {
            writeln!(writer, "{}", reply).ok();
        }
        writer.flush().ok();
    }
}
