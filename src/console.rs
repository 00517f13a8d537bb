//! Line-based console front-end
//!
//! Turns stdin lines into coordinator commands and prints whatever the
//! coordinator reports back. Playlist order belongs here, not in the core;
//! this front-end only announces when a track has finished.

use std::io::BufRead;

use tokio::sync::mpsc;

use sconsify::controller::{Command, UiEvent};
use sconsify::model::{PlaylistIndex, TrackHandle};

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(Command),
    ListPlaylists,
    Help,
    Empty,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let mut words = line.split_whitespace();
    match words.next() {
        None => Input::Empty,
        Some("play" | "p") => {
            let uri = words.next().unwrap_or_default();
            Input::Command(Command::Play(TrackHandle::new(uri)))
        }
        Some("pause" | "space") => Input::Command(Command::TogglePause),
        Some("quit" | "q" | "exit") => Input::Command(Command::Shutdown),
        Some("playlists" | "ls") => Input::ListPlaylists,
        Some("help" | "h" | "?") => Input::Help,
        Some(other) => Input::Unknown(other.to_string()),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  play <spotify:track:...>  load and play a track");
    println!("  pause                     toggle pause");
    println!("  playlists                 list your playlists");
    println!("  quit                      log out and exit");
}

fn print_playlists(index: Option<&PlaylistIndex>) {
    match index {
        Some(index) if !index.is_empty() => {
            for (name, handle) in index.iter() {
                println!("  {} ({})", name, handle);
            }
        }
        Some(_) => println!("No playlists."),
        None => println!("Playlists are not loaded yet."),
    }
}

/// Read stdin on a plain thread so a pending read never holds up shutdown
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "Could not start stdin reader");
    }
    rx
}

pub async fn run(mut events: mpsc::UnboundedReceiver<UiEvent>, commands: mpsc::Sender<Command>) {
    let mut lines = spawn_stdin_reader();
    let mut stdin_open = true;
    let mut playlists: Option<PlaylistIndex> = None;

    println!("Connecting to Spotify...");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(UiEvent::Playlists(Some(index))) => {
                    println!("Logged in. {} playlists:", index.len());
                    print_playlists(Some(&index));
                    print_help();
                    playlists = Some(index);
                }
                Some(UiEvent::Playlists(None)) => println!("Could not login."),
                Some(UiEvent::Status(status)) => println!("{}", status),
                Some(UiEvent::PlayNext) => println!("Track finished. Use `play <uri>` for the next one."),
                Some(UiEvent::Shutdown) | None => {
                    println!("Bye.");
                    break;
                }
            },
            line = lines.recv(), if stdin_open => match line {
                Some(line) => match parse_input(&line) {
                    Input::Command(command) => {
                        if commands.send(command).await.is_err() {
                            break;
                        }
                    }
                    Input::ListPlaylists => print_playlists(playlists.as_ref()),
                    Input::Help => print_help(),
                    Input::Empty => {}
                    Input::Unknown(word) => println!("Unknown command `{}`, try `help`.", word),
                },
                None => {
                    stdin_open = false;
                    let _ = commands.send(Command::Shutdown).await;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_input("play spotify:track:abc"),
            Input::Command(Command::Play(TrackHandle::new("spotify:track:abc")))
        );
        assert_eq!(parse_input("  pause "), Input::Command(Command::TogglePause));
        assert_eq!(parse_input("q"), Input::Command(Command::Shutdown));
        assert_eq!(parse_input("ls"), Input::ListPlaylists);
        assert_eq!(parse_input(""), Input::Empty);
        assert_eq!(parse_input("dance"), Input::Unknown("dance".to_string()));
    }

    #[test]
    fn play_without_uri_sends_an_empty_handle() {
        match parse_input("play") {
            Input::Command(Command::Play(handle)) => assert!(handle.is_empty()),
            other => panic!("unexpected input {:?}", other),
        }
    }
}
