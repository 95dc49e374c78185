//! Line-oriented transport commands read from stdin.

use std::io::BufRead;
use std::thread;

use crossbeam_channel::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Play,
    Pause,
    Reset,
    Seek(u64),
    Position,
    Status,
    /// Simulate an external focus taker (e.g. a call).
    Interrupt,
    /// End the simulated interruption.
    Resume,
    Release,
    Quit,
    Help,
}

pub const HELP: &str = "commands: play | pause | reset | seek <ms> | pos | status | interrupt | resume | release | quit";

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Err("empty command".to_string());
    };
    let cmd = match word.to_ascii_lowercase().as_str() {
        "play" | "p" => ConsoleCommand::Play,
        "pause" => ConsoleCommand::Pause,
        "reset" | "rewind" => ConsoleCommand::Reset,
        "seek" => {
            let arg = parts.next().ok_or("seek needs a position in ms")?;
            let ms = arg
                .parse::<u64>()
                .map_err(|_| format!("invalid position: {arg}"))?;
            ConsoleCommand::Seek(ms)
        }
        "pos" | "position" => ConsoleCommand::Position,
        "status" => ConsoleCommand::Status,
        "interrupt" => ConsoleCommand::Interrupt,
        "resume" => ConsoleCommand::Resume,
        "release" => ConsoleCommand::Release,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        "help" | "?" => ConsoleCommand::Help,
        other => return Err(format!("unknown command: {other}")),
    };
    if let Some(extra) = parts.next() {
        return Err(format!("unexpected argument: {extra}"));
    }
    Ok(cmd)
}

/// Input delivered by the stdin reader thread.
#[derive(Debug)]
pub enum ConsoleInput {
    Command(ConsoleCommand),
    Invalid(String),
    Closed,
}

/// Read stdin on a background thread, forwarding parsed lines until EOF.
pub fn spawn_stdin_reader(tx: Sender<ConsoleInput>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            let input = match parse_command(&line) {
                Ok(cmd) => ConsoleInput::Command(cmd),
                Err(msg) => ConsoleInput::Invalid(msg),
            };
            if tx.send(input).is_err() {
                return;
            }
        }
        let _ = tx.send(ConsoleInput::Closed);
    })
}

/// `m:ss.mmm` rendering of a millisecond position.
pub fn format_position(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms / 1000) % 60;
    format!("{minutes}:{seconds:02}.{:03}", ms % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transport_words() {
        assert_eq!(parse_command("play"), Ok(ConsoleCommand::Play));
        assert_eq!(parse_command("  PAUSE "), Ok(ConsoleCommand::Pause));
        assert_eq!(parse_command("seek 1500"), Ok(ConsoleCommand::Seek(1500)));
        assert_eq!(parse_command("q"), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("").is_err());
        assert!(parse_command("seek").is_err());
        assert!(parse_command("seek -5").is_err());
        assert!(parse_command("play now").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn formats_positions() {
        assert_eq!(format_position(0), "0:00.000");
        assert_eq!(format_position(61_250), "1:01.250");
        assert_eq!(format_position(3_600_000), "60:00.000");
    }
}
