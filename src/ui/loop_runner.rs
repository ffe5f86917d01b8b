//! Main event loop for the terminal consumer.
//!
//! Multiplexes stdin commands, feed snapshots, filter changes and shutdown
//! signals with `tokio::select!`.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::input::{handle_input, parse_command, UserCommand, HELP};
use super::status::ViewTracker;
use crate::config::Config;
use crate::feed::{FeedHandle, FeedSubscription};

/// Result of handling one line of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep reading commands.
    Continue,
    /// Shut the feed down and exit.
    Quit,
}

/// Runs the consumer loop until `quit`, end of input, or a signal.
///
/// Shuts the controller down before returning.
pub async fn run(handle: FeedHandle, mut feed: FeedSubscription, config: &Config) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut filter_rx = handle.watch_filter();
    let mut view = ViewTracker::default();
    let mut filter = config.initial_filter();

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    println!("{HELP}");
    for line in view.update(&feed.current()) {
        println!("{line}");
    }

    loop {
        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down");
                break;
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::debug!("End of input");
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        print_local(&command, &feed, config);
                        match handle_input(command, &handle, config, &mut filter) {
                            Ok(Action::Quit) => break,
                            Ok(Action::Continue) => {}
                            Err(e) => println!("{e}"),
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                }
            }

            Ok(()) = filter_rx.changed() => {
                let criteria = filter_rx.borrow_and_update().clone();
                println!("Filter: {} ({})", criteria.category, criteria.language);
            }

            snapshot = feed.next() => {
                let Some(snapshot) = snapshot else {
                    tracing::debug!("Feed closed");
                    break;
                };
                for line in view.update(&snapshot) {
                    println!("{line}");
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// Output for commands that only read local state.
fn print_local(command: &UserCommand, feed: &FeedSubscription, config: &Config) {
    match command {
        UserCommand::Show => {
            for line in ViewTracker::render_all(&feed.current()) {
                println!("{line}");
            }
        }
        UserCommand::Categories => println!("Categories: {}", config.categories.join(", ")),
        UserCommand::Help => println!("{HELP}"),
        _ => {}
    }
}
