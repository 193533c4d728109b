mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use racers::{Feature, MenuState};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "racers")]
#[command(about = "Instrument a running LEGO Racers process")]
#[command(version)]
struct Args {
    /// Process id of the running game
    #[arg(long, env = "RACERS_PID")]
    pid: u32,

    /// Layout file describing the game build
    #[arg(short, long, default_value = "layout.json")]
    layout: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log session events and the player position until Ctrl+C
    Watch {
        /// Seconds between position reports
        #[arg(short, long, default_value = "1")]
        interval: u64,
    },
    /// Take one step in the front end
    Menu {
        /// Target screen, e.g. MainMenu or SingleRace
        target: MenuState,
    },
    /// Switch a feature on or off
    Toggle {
        /// run-in-background, ai-pathing or ai-power-ups
        feature: Feature,
        #[arg(value_enum)]
        state: Switch,
    },
    /// Select a race and continue to racer selection
    Race {
        #[arg(long)]
        circuit: i32,
        #[arg(long)]
        race: i32,
    },
    /// Set the AI driver count for the next race
    Drivers {
        count: i32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("racers=info".parse()?))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Watch { interval } => commands::watch::run(args.pid, &args.layout, interval),
        Command::Menu { target } => commands::menu::run(args.pid, &args.layout, target),
        Command::Toggle { feature, state } => commands::toggle::run(
            args.pid,
            &args.layout,
            feature,
            matches!(state, Switch::On),
        ),
        Command::Race { circuit, race } => {
            commands::race::run(args.pid, &args.layout, circuit, race)
        }
        Command::Drivers { count } => commands::drivers::run(args.pid, &args.layout, count),
    }
}
