//! `player`: load one audio source and drive it through a [`PlaybackController`].
//!
//! The source is prepared on the engine's worker thread; transport commands are read
//! from stdin. Focus is arbitrated in-process, and `interrupt` / `resume` simulate an
//! external focus taker.

mod cli;
mod config;
mod console;

use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use audio_engine::CpalEngine;
use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use focus_player::{FocusArbiter, LoadError, MediaEngine, PlaybackController, PlayerListener};
use tracing_subscriber::EnvFilter;

use crate::config::PlayerConfig;
use crate::console::{ConsoleCommand, ConsoleInput, format_position};

/// Events forwarded from the controller listener to the main loop.
#[derive(Debug)]
enum PlayerEvent {
    Prepared,
    Completed,
    Failed(String),
}

struct CliListener {
    tx: Sender<PlayerEvent>,
}

impl PlayerListener for CliListener {
    fn on_prepared(&self, engine: &dyn MediaEngine) {
        tracing::debug!(position_ms = engine.current_position(), "prepared");
        let _ = self.tx.send(PlayerEvent::Prepared);
    }

    fn on_completion(&self) {
        let _ = self.tx.send(PlayerEvent::Completed);
    }

    fn on_error(&self, error: &LoadError) {
        let _ = self.tx.send(PlayerEvent::Failed(format!("{error:#}")));
    }
}

type Controller = PlaybackController<CpalEngine, focus_player::FocusClient>;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,focus_player=info,audio_engine=info")
        }))
        .init();

    if args.list_devices {
        return audio_engine::device::list_devices(&cpal::default_host());
    }

    let file_cfg = match &args.config {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::default(),
    };
    let engine_cfg = file_cfg.engine_config(args.device.clone(), args.chunk_frames);

    let Some(cli::Command::Play {
        source,
        start_ms,
        autoplay,
    }) = args.cmd
    else {
        bail!("nothing to do; try `player play <SOURCE>` or `player --list-devices`");
    };
    let source = file_cfg.resolve_source(&source);
    tracing::info!(source = %source, device = ?engine_cfg.device, "loading");

    let arbiter = FocusArbiter::new();
    let controller: Controller =
        PlaybackController::new(CpalEngine::new(engine_cfg), arbiter.client());

    let (player_tx, player_rx) = crossbeam_channel::unbounded();
    let (console_tx, console_rx) = crossbeam_channel::unbounded();
    let (quit_tx, quit_rx) = crossbeam_channel::bounded::<()>(1);

    let _ = ctrlc::set_handler(move || {
        let _ = quit_tx.try_send(());
    });

    controller.init(source, Some(Arc::new(CliListener { tx: player_tx })));
    console::spawn_stdin_reader(console_tx);

    let session = Session {
        controller: &controller,
        arbiter: &arbiter,
        start_ms,
        autoplay,
    };
    let outcome = session.run(&player_rx, &console_rx, &quit_rx);
    controller.release();
    match outcome? {
        Exit::Done => Ok(()),
        Exit::Interrupted => std::process::exit(130),
    }
}

enum Exit {
    Done,
    Interrupted,
}

struct Session<'a> {
    controller: &'a Controller,
    arbiter: &'a FocusArbiter,
    start_ms: Option<u64>,
    autoplay: bool,
}

impl Session<'_> {
    fn run(
        &self,
        player_rx: &Receiver<PlayerEvent>,
        console_rx: &Receiver<ConsoleInput>,
        quit_rx: &Receiver<()>,
    ) -> Result<Exit> {
        let mut stdin_open = true;
        loop {
            crossbeam_channel::select! {
                recv(quit_rx) -> _ => return Ok(Exit::Interrupted),
                recv(player_rx) -> ev => {
                    let ev = ev.map_err(|_| anyhow!("player event channel closed"))?;
                    match ev {
                        PlayerEvent::Prepared => {
                            self.on_prepared();
                            if !stdin_open && !self.controller.is_playing() {
                                return Ok(Exit::Done);
                            }
                        }
                        PlayerEvent::Completed => {
                            println!("completed");
                            if !stdin_open {
                                return Ok(Exit::Done);
                            }
                        }
                        PlayerEvent::Failed(msg) => bail!("could not load source: {msg}"),
                    }
                }
                recv(console_rx) -> input => match input {
                    Ok(ConsoleInput::Command(cmd)) => {
                        if !self.apply(cmd) {
                            return Ok(Exit::Done);
                        }
                    }
                    Ok(ConsoleInput::Invalid(msg)) => println!("{msg}; {}", console::HELP),
                    Ok(ConsoleInput::Closed) | Err(_) => {
                        stdin_open = false;
                        if self.controller.is_prepared() && !self.controller.is_playing() {
                            return Ok(Exit::Done);
                        }
                    }
                },
            }
        }
    }

    fn on_prepared(&self) {
        let duration = self.controller.engine().duration_ms();
        println!("prepared ({})", format_position(duration));
        if let Some(ms) = self.start_ms {
            self.controller.seek_to(ms);
        }
        if self.autoplay && !self.controller.play() {
            println!("could not start playback (audio focus denied)");
        }
    }

    /// Apply one console command. Returns `false` when the session should end.
    fn apply(&self, cmd: ConsoleCommand) -> bool {
        let ctl = self.controller;
        match cmd {
            ConsoleCommand::Play => report("play", ctl.play()),
            ConsoleCommand::Pause => report("pause", ctl.pause()),
            ConsoleCommand::Reset => report("reset", ctl.reset()),
            ConsoleCommand::Seek(ms) => {
                ctl.seek_to(ms);
                println!("position {}", format_position(ctl.current_position()));
            }
            ConsoleCommand::Position => {
                println!("position {}", format_position(ctl.current_position()));
            }
            ConsoleCommand::Status => {
                let state = match (ctl.is_prepared(), ctl.is_playing()) {
                    (false, _) => match ctl.load_error() {
                        Some(err) => format!("failed: {err}"),
                        None => "not prepared".to_string(),
                    },
                    (true, true) => "playing".to_string(),
                    (true, false) => "paused".to_string(),
                };
                println!(
                    "{state} at {} / {}{}",
                    format_position(ctl.current_position()),
                    format_position(ctl.engine().duration_ms()),
                    if self.arbiter.is_interrupted() {
                        " (focus interrupted)"
                    } else {
                        ""
                    }
                );
            }
            ConsoleCommand::Interrupt => report("interrupt", self.arbiter.interrupt()),
            ConsoleCommand::Resume => report("resume", self.arbiter.end_interruption()),
            ConsoleCommand::Release => {
                ctl.release();
                println!("released");
            }
            ConsoleCommand::Quit => return false,
            ConsoleCommand::Help => println!("{}", console::HELP),
        }
        true
    }
}

fn report(action: &str, ok: bool) {
    if ok {
        println!("{action}: ok");
    } else {
        println!("{action}: refused");
    }
}
