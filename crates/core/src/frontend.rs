//! What the orchestrator needs from whatever presents it to the user.

/// User-facing side of the launcher.
///
/// Implementations own all presentation; the orchestrator only reports what
/// happened.
pub trait Frontend {
    /// News were reloaded and should be redrawn.
    fn refresh_news(&mut self);
    /// Show a persistent notification with a single action button.
    /// Pressing it must end up in `GameData::notify_button(id)`.
    fn display_notification(&mut self, message: &str, button: &str, id: i32);
    /// Statistics or install states changed.
    fn display_status_changed(&mut self);
    /// All game lists were rebuilt.
    fn lists_reloaded(&mut self);
    /// Error dialog.
    fn error(&mut self, message: &str);
    /// Informational dialog.
    fn say(&mut self, message: &str);
    /// Close the main window; the process should wind down.
    fn close(&mut self);
}
