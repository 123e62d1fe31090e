use std::fmt;

/// Startup state machine; runs once per device, never re-entered.
///
/// ```text
/// Init -> Registering -> SessionCreating -> HandlersInstalling -> SessionOpening -> Ready
///                                                                             \-> Failed
/// ```
/// `Registering` is skipped when the device holds a connection string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectState {
    #[default]
    Init,
    Registering,
    SessionCreating,
    HandlersInstalling,
    SessionOpening,
    Ready,
    Failed,
}

impl ConnectState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectState::Ready | ConnectState::Failed)
    }
}

impl fmt::Display for ConnectState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            ConnectState::Init => "INIT",
            ConnectState::Registering => "REGISTERING",
            ConnectState::SessionCreating => "SESSION_CREATING",
            ConnectState::HandlersInstalling => "HANDLERS_INSTALLING",
            ConnectState::SessionOpening => "SESSION_OPENING",
            ConnectState::Ready => "READY",
            ConnectState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}
