//! Terminal rendering of the status line and the feed.
//!
//! The feed model is newest-first, but a terminal only grows downwards, so
//! live output is printed oldest-first as it arrives and `/feed` redraws the
//! whole thing top-down in model order.

use colored::*;

use crate::controller::{FeedUpdate, Status};
use crate::feed::{Entry, Feed, Role};

pub fn status_line(status: &Status) -> String {
    let text = format!("● {}", status.text);
    if status.connected {
        text.bright_green().to_string()
    } else {
        text.bright_red().to_string()
    }
}

pub fn entry_header(role: Role) -> String {
    match role {
        Role::Ai => role.label().bright_cyan().bold().to_string(),
        Role::User => role.label().bright_yellow().bold().to_string(),
    }
}

pub fn render_entry(entry: &Entry) -> String {
    let mut out = entry_header(entry.role);
    if entry.live {
        out.push_str(&format!(" {}", "(streaming)".dimmed()));
    }
    out.push('\n');
    out.push_str(&entry.text);
    out
}

/// Whole feed, newest entry first.
pub fn render_feed(feed: &Feed) -> String {
    if feed.is_empty() {
        return "(feed is empty)".dimmed().to_string();
    }
    feed.entries()
        .iter()
        .map(render_entry)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Turns feed updates into incremental terminal output.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    entry: Option<u64>,
    /// Bytes of the live entry's text already written.
    printed: usize,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output for one update, or an empty string when nothing changed on
    /// screen.
    pub fn render(&mut self, feed: &Feed, update: &FeedUpdate) -> String {
        match update {
            FeedUpdate::Ignored => String::new(),
            FeedUpdate::Streamed { entry_id, started } => {
                let Some(entry) = feed.get(*entry_id) else {
                    return String::new();
                };
                let mut out = String::new();
                if *started || self.entry != Some(*entry_id) {
                    out.push_str(&entry_header(Role::Ai));
                    out.push('\n');
                    self.entry = Some(*entry_id);
                    self.printed = 0;
                }
                // The buffer only ever grows, but fall back to a full reprint
                // if it did not.
                let delta = match entry.text.get(self.printed..) {
                    Some(delta) => delta,
                    None => {
                        out.push('\n');
                        entry.text.as_str()
                    }
                };
                out.push_str(delta);
                self.printed = entry.text.len();
                out
            }
            FeedUpdate::Finalized(Some(id)) => self.finish(*id),
            FeedUpdate::Finalized(None) => String::new(),
        }
    }

    /// Close off the entry being streamed, if it is `id`.
    pub fn finish(&mut self, id: u64) -> String {
        if self.entry == Some(id) {
            self.entry = None;
            self.printed = 0;
            "\n".to_string()
        } else {
            String::new()
        }
    }

    /// Close off whatever is being streamed.
    pub fn finish_any(&mut self) -> String {
        match self.entry {
            Some(id) => self.finish(id),
            None => String::new(),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.entry.is_some()
    }
}
