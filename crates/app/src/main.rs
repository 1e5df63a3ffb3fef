use std::{
    cell::RefCell,
    io::BufRead,
    path::PathBuf,
    rc::Rc,
    sync::mpsc::{self, Sender},
    thread,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use matrix_host_core::{
    ButtonEvent, ChannelRemote, Command, Host, HostConfig, LedMatrix, PluginLoader,
    PluginRegistry, RemoteMessage, TracingBroadcast,
};
use tracing_subscriber::EnvFilter;

/// Upper bound on a single idle sleep so stdin input stays responsive.
const MAX_SLEEP_MS: u64 = 10;

fn main() -> matrix_host_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Plugins => {
            for name in PluginRegistry::with_builtins().names() {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> matrix_host_core::Result<()> {
    let config = args.to_config()?;
    tracing::info!(autostart = ?config.autostart, size = config.matrix_size, "starting host");

    let display = Rc::new(RefCell::new(LedMatrix::new(config.matrix_size)));
    let mut host = Host::init(
        &config,
        display,
        PluginRegistry::with_builtins(),
        TracingBroadcast::new(),
    )?;

    let (button_tx, button_rx) = mpsc::channel();
    let (command_tx, command_rx) = mpsc::channel();
    spawn_stdin_reader(button_tx, command_tx);
    let mut remote = ChannelRemote::new(button_rx);

    let started = Instant::now();
    loop {
        host.poll_remote(&mut remote);
        while let Ok(command) = command_rx.try_recv() {
            host.send(command);
        }
        if let Err(err) = host.dispatch() {
            tracing::error!(%err, "command failed");
        }

        let now = started.elapsed().as_millis() as u64;
        host.advance_to(now);

        if args.run_for_ms.is_some_and(|limit| now >= limit) {
            tracing::info!(now, "run time elapsed, shutting down");
            host.control_mut().stop();
            return Ok(());
        }

        let wait = host.next_deadline().saturating_sub(now).clamp(1, MAX_SLEEP_MS);
        thread::sleep(Duration::from_millis(wait));
    }
}

/// Reads JSON lines from stdin: button events or direct commands.
fn spawn_stdin_reader(buttons: Sender<ButtonEvent>, commands: Sender<Command>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!(%err, "stdin closed");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let delivered = match serde_json::from_str::<RemoteMessage>(&line) {
                Ok(RemoteMessage::Button(event)) => buttons.send(event).is_ok(),
                Ok(RemoteMessage::Command(command)) => commands.send(command).is_ok(),
                Err(err) => {
                    tracing::warn!(%err, line = %line, "ignoring malformed remote line");
                    true
                }
            };
            if !delivered {
                break;
            }
        }
    });
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Plugin host for LED matrix displays", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to the matrix and run the control and render loops.
    Run(RunArgs),
    /// List the plugins that can be started by name.
    Plugins,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Display endpoint: tcp://host:port, file://path or stdout.
    /// Overrides MATRIX_URL.
    #[arg(long)]
    matrix_url: Option<String>,
    /// Plugin to launch once the loops are running. Overrides
    /// PLUGIN_AUTOSTART.
    #[arg(long)]
    autostart: Option<String>,
    /// JSON file with host settings; flags and environment take precedence.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Edge length of the square matrix.
    #[arg(long)]
    size: Option<usize>,
    /// Initial delay between updates in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Stop after this many milliseconds instead of running forever.
    #[arg(long)]
    run_for_ms: Option<u64>,
}

impl RunArgs {
    fn to_config(&self) -> matrix_host_core::Result<HostConfig> {
        // Defaults, then the file, then the environment, then flags.
        let mut config = match &self.config {
            Some(path) => HostConfig::from_json_file(path)?,
            None => HostConfig::default(),
        };
        config.apply_env();
        if let Some(url) = &self.matrix_url {
            config.matrix_url = Some(url.clone());
        }
        if let Some(plugin) = &self.autostart {
            config.autostart = Some(plugin.clone());
        }
        if let Some(size) = self.size {
            config.matrix_size = size;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_ms = tick_ms;
        }
        Ok(config)
    }
}
