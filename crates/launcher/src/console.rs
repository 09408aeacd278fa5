use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};

use parking_lot::Mutex;
use tiggit_core::{extra::GameInf, news::NewsDisplayItem, Frontend, LiveInfo};
use tracing::debug;

/// Notification waiting for the user to press its button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    pub message: String,
    pub button: String,
    pub id: i32,
}

#[derive(Debug, Default)]
struct ConsoleState {
    closed: bool,
    pending: Option<PendingNotification>,
}

/// Plain terminal frontend. Clones share state, so `main` keeps a handle
/// after giving one to the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct ConsoleFrontend {
    state: Arc<Mutex<ConsoleState>>,
}

impl ConsoleFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn take_pending(&self) -> Option<PendingNotification> {
        self.state.lock().pending.take()
    }
}

impl Frontend for ConsoleFrontend {
    fn refresh_news(&mut self) {
        println!("News updated.");
    }

    fn display_notification(&mut self, message: &str, button: &str, id: i32) {
        println!("{message} [{button}]");
        self.state.lock().pending = Some(PendingNotification {
            message: message.to_string(),
            button: button.to_string(),
            id,
        });
    }

    fn display_status_changed(&mut self) {
        debug!("status changed");
    }

    fn lists_reloaded(&mut self) {
        println!("Game lists reloaded.");
    }

    fn error(&mut self, message: &str) {
        eprintln!("error: {message}");
    }

    fn say(&mut self, message: &str) {
        println!("{message}");
    }

    fn close(&mut self) {
        self.state.lock().closed = true;
    }
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is a no.
pub fn confirm(question: &str) -> io::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub fn print_rows(rows: &[(&LiveInfo, Option<&GameInf>)]) {
    for (info, inf) in rows {
        let title = inf
            .map(|inf| inf.title.clone())
            .unwrap_or_else(|| info.info.title.clone());
        let marker = if inf.map(|inf| inf.is_new).unwrap_or(false) {
            "*"
        } else {
            " "
        };
        let status = inf.map(|inf| inf.status.as_str()).unwrap_or("");
        let rating = inf
            .and_then(|inf| inf.rating)
            .map(|rating| format!("{rating:.1}"))
            .unwrap_or_default();
        println!(
            "{marker} {:<24} {:<44} {:<12} {:>4}",
            info.id(),
            title,
            status,
            rating
        );
    }
}

pub fn print_news(items: &[NewsDisplayItem]) {
    for (index, item) in items.iter().enumerate() {
        let flag = if item.read { " " } else { "+" };
        println!("{flag} [{index}] {} {}", item.date, item.subject);
        for line in item.body.lines() {
            println!("      {line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_notifications_and_close() {
        let handle = ConsoleFrontend::new();
        let mut frontend: Box<dyn Frontend> = Box::new(handle.clone());

        frontend.display_notification("Updated", "Restart now", 2);
        frontend.close();

        assert!(handle.is_closed());
        let pending = handle.take_pending().expect("pending notification");
        assert_eq!(pending.id, 2);
        assert_eq!(pending.button, "Restart now");
        assert!(handle.take_pending().is_none());
    }
}
