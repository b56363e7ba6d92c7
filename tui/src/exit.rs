use writeup_client::ActiveSession;

/// Summary information produced when the writeup TUI exits.
#[derive(Debug, Clone)]
pub struct AppExitInfo {
    /// The last session returned by the service, if any.
    pub session: Option<ActiveSession>,
    /// Why the session ended.
    pub exit_reason: ExitReason,
}

/// Reason why the TUI terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The user requested exit (Ctrl+C).
    UserRequested,
    /// The terminal event stream closed.
    InputClosed,
}
