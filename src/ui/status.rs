//! Text rendering of feed snapshots.
//!
//! [`ViewTracker`] turns the stream of snapshots into printable lines: a new
//! generation replaces the view, a snapshot from the same generation only
//! prints the articles that were not shown yet.

use crate::feed::{CombinedLoadState, FeedSnapshot, LoadState};
use crate::source::Article;

fn describe(state: &LoadState) -> &'static str {
    match state {
        LoadState::NotLoading { end_of_data: true } => "end",
        LoadState::NotLoading { end_of_data: false } => "idle",
        LoadState::Loading => "loading",
        LoadState::Error(_) => "error",
    }
}

/// One-line summary of a snapshot.
pub fn status_line(snapshot: &FeedSnapshot) -> String {
    format!(
        "[gen {}] {} | {} articles in {} pages | refresh: {} prepend: {} append: {}",
        snapshot.generation,
        snapshot.criteria,
        snapshot.len(),
        snapshot.pages,
        describe(&snapshot.state.refresh),
        describe(&snapshot.state.prepend),
        describe(&snapshot.state.append),
    )
}

/// Error text to display, if any direction failed.
///
/// Scroll errors take precedence over a refresh error (append, then prepend,
/// then refresh), so the message names the page the user was reaching for.
pub fn error_message(state: &CombinedLoadState) -> Option<String> {
    let cause = state
        .append
        .error()
        .or_else(|| state.prepend.error())
        .or_else(|| state.refresh.error())?;
    Some(format!("Error: {cause} (type `retry`)"))
}

pub fn article_line(index: usize, article: &Article) -> String {
    let mut line = format!("{:>4}. {}", index + 1, article.title);
    if let Some(source) = &article.source_name {
        line.push_str(&format!(" [{source}]"));
    }
    if let Some(published) = article.published {
        line.push_str(&format!(" ({})", published.format("%Y-%m-%d %H:%M")));
    }
    line
}

/// Tracks what the terminal already shows.
#[derive(Debug, Default)]
pub struct ViewTracker {
    generation: Option<u64>,
    first_id: Option<String>,
    shown: usize,
    last_status: Option<String>,
    last_error: Option<String>,
}

impl ViewTracker {
    /// Lines to print for `snapshot`, given everything printed so far.
    pub fn update(&mut self, snapshot: &FeedSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        if self.generation != Some(snapshot.generation) {
            self.generation = Some(snapshot.generation);
            self.first_id = None;
            self.shown = 0;
            self.last_error = None;
            lines.push(format!("--- {} ---", snapshot.criteria));
        }

        let items = &snapshot.items;
        // Articles prepended in front of the first one already shown.
        let prepended = match &self.first_id {
            Some(id) => items.iter().position(|a| &a.id == id).unwrap_or(0),
            None => 0,
        };
        if prepended > 0 {
            lines.push(format!("({prepended} earlier articles loaded)"));
            for (i, article) in items.iter().enumerate().take(prepended) {
                lines.push(article_line(i, article));
            }
        }
        let already = self.shown + prepended;
        for (i, article) in items.iter().enumerate().skip(already) {
            lines.push(article_line(i, article));
        }
        self.shown = items.len();
        self.first_id = items.first().map(|a| a.id.clone());

        let status = status_line(snapshot);
        if self.last_status.as_ref() != Some(&status) {
            lines.push(status.clone());
            self.last_status = Some(status);
        }

        let error = error_message(&snapshot.state);
        if error != self.last_error {
            if let Some(message) = &error {
                lines.push(message.clone());
            }
            self.last_error = error;
        }

        lines
    }

    /// Every loaded article, for the `show` command.
    pub fn render_all(snapshot: &FeedSnapshot) -> Vec<String> {
        let mut lines: Vec<String> = snapshot
            .items
            .iter()
            .enumerate()
            .map(|(i, a)| article_line(i, a))
            .collect();
        lines.push(status_line(snapshot));
        lines
    }
}
