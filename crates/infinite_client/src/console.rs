//! Plain-text console front end.
//!
//! Reads commands from stdin and prints the board whenever the session
//! snapshot changes.

use anyhow::Result;
use infinite_client::{ConnectionState, SessionClient, SessionSnapshot, ViewPhase};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, instrument};

const HELP: &str = "\
Commands:
  1-9 | move N   play a cell (1 is top left)
  rematch        ask for another round once it is over
  play           find a new opponent from the menu
  quit           leave the round, or exit from the menu
  help           show this text";

/// A parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Play a 0-based cell.
    Move(usize),
    /// Ask for another round.
    Rematch,
    /// Start networked play.
    Play,
    /// Leave the round or exit.
    Quit,
    /// Show help.
    Help,
}

/// Parses one console line. Cells are typed 1-based.
pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let mut words = line.split_whitespace();
    let first = words.next().map(str::to_lowercase);

    match first.as_deref() {
        None => Err("Type 'help' for commands.".to_string()),
        Some("move") => match words.next() {
            Some(cell) => parse_cell(cell),
            None => Err("Usage: move N (1-9)".to_string()),
        },
        Some("rematch") => Ok(ConsoleCommand::Rematch),
        Some("play") => Ok(ConsoleCommand::Play),
        Some("quit" | "exit") => Ok(ConsoleCommand::Quit),
        Some("help" | "?") => Ok(ConsoleCommand::Help),
        Some(other) => parse_cell(other),
    }
}

fn parse_cell(word: &str) -> Result<ConsoleCommand, String> {
    match word.parse::<usize>() {
        Ok(cell @ 1..=9) => Ok(ConsoleCommand::Move(cell - 1)),
        _ => Err(format!("Unknown command '{}'. Type 'help' for commands.", word)),
    }
}

/// Renders a snapshot for the console.
pub fn render(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();

    match snapshot.phase() {
        ViewPhase::Menu => {
            if let Some(notice) = snapshot.notice() {
                out.push_str(&format!("Connection lost: {}\n", notice));
            }
            if let Some(error) = snapshot.error() {
                out.push_str(&format!("{}\n", error));
            }
            out.push_str("Menu. Type 'play' to find an opponent or 'quit' to exit.");
        }
        ViewPhase::WaitingForOpponent => {
            if *snapshot.connection() == ConnectionState::Connecting {
                out.push_str("Connecting to server...");
            } else {
                out.push_str("Waiting for an opponent...");
            }
            if let Some(notice) = snapshot.notice() {
                out.push_str(&format!("\n{}", notice));
            }
        }
        ViewPhase::Playing => {
            out.push_str(&snapshot.board().display(*snapshot.fading()));
            out.push('\n');
            if let Some(me) = snapshot.assignment() {
                out.push_str(&format!("You are {}. ", me.symbol()));
            }
            match (snapshot.winner(), snapshot.is_local_turn()) {
                (Some(winner), _) if *snapshot.assignment() == Some(*winner) => {
                    out.push_str("You win! Type 'rematch' or 'quit'.");
                }
                (Some(_), _) => out.push_str("You lose. Type 'rematch' or 'quit'."),
                (None, true) => out.push_str("Your move."),
                (None, false) => out.push_str("Opponent's move."),
            }

            let countdowns = snapshot.countdowns();
            if countdowns.own > 0 {
                out.push_str(&format!(
                    "\nMake your move! Disconnecting in {} second{}...",
                    countdowns.own,
                    if countdowns.own == 1 { "" } else { "s" }
                ));
            }
            if countdowns.opponent > 0 {
                out.push_str(&format!(
                    "\nWaiting for opponent... they will disconnect in {} second{}.",
                    countdowns.opponent,
                    if countdowns.opponent == 1 { "" } else { "s" }
                ));
            }
            if *snapshot.disconnect_notice() {
                out.push_str("\nConnection lost. Returning to menu...");
            }
        }
    }

    out
}

/// Runs the console until the user exits or stdin closes.
#[instrument(skip(client))]
pub async fn run(client: SessionClient) -> Result<()> {
    let mut snapshots = client.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", HELP);
    client.start()?;

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    debug!("Session runtime gone");
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                println!("\n{}", render(&snapshot));
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed");
                    break;
                };
                match parse_command(&line) {
                    Ok(ConsoleCommand::Move(cell)) => client.attempt_move(cell)?,
                    Ok(ConsoleCommand::Rematch) => client.request_rematch()?,
                    Ok(ConsoleCommand::Play) => client.start()?,
                    Ok(ConsoleCommand::Quit) => {
                        if *client.snapshot().phase() == ViewPhase::Menu {
                            break;
                        }
                        client.quit()?;
                    }
                    Ok(ConsoleCommand::Help) => println!("{}", HELP),
                    Err(message) => println!("{}", message),
                }
            }
        }
    }

    client.shutdown()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cells_one_based() {
        assert_eq!(parse_command("1"), Ok(ConsoleCommand::Move(0)));
        assert_eq!(parse_command(" move 9 "), Ok(ConsoleCommand::Move(8)));
        assert!(parse_command("0").is_err());
        assert!(parse_command("10").is_err());
        assert!(parse_command("move").is_err());
    }

    #[test]
    fn parses_words() {
        assert_eq!(parse_command("Rematch"), Ok(ConsoleCommand::Rematch));
        assert_eq!(parse_command("quit"), Ok(ConsoleCommand::Quit));
        assert_eq!(parse_command("help"), Ok(ConsoleCommand::Help));
        assert_eq!(parse_command("play"), Ok(ConsoleCommand::Play));
        assert!(parse_command("").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn menu_shows_errors() {
        let rendered = render(&SessionSnapshot::default());
        assert!(rendered.contains("Menu"));
    }
}
