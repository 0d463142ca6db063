use serde::{Deserialize, Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Course change accepted by the autopilot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustStep {
    MinusTen,
    MinusOne,
    PlusOne,
    PlusTen,
}

impl AdjustStep {
    /// Signed change in degrees, positive to starboard.
    pub fn degrees(&self) -> i8 {
        match self {
            Self::MinusTen => -10,
            Self::MinusOne => -1,
            Self::PlusOne => 1,
            Self::PlusTen => 10,
        }
    }
}

/// Command accepted from the writable characteristic.
///
/// An empty mailbox is `None` at the call site, not a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutopilotCommand {
    Enable,
    Disable,
    Adjust(AdjustStep),
}

impl AutopilotCommand {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "enable" => Some(Self::Enable),
            "disable" => Some(Self::Disable),
            "adjust+10" => Some(Self::Adjust(AdjustStep::PlusTen)),
            "adjust-10" => Some(Self::Adjust(AdjustStep::MinusTen)),
            "adjust+1" => Some(Self::Adjust(AdjustStep::PlusOne)),
            "adjust-1" => Some(Self::Adjust(AdjustStep::MinusOne)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Adjust(AdjustStep::PlusTen) => "adjust+10",
            Self::Adjust(AdjustStep::MinusTen) => "adjust-10",
            Self::Adjust(AdjustStep::PlusOne) => "adjust+1",
            Self::Adjust(AdjustStep::MinusOne) => "adjust-1",
        }
    }
}

/// Serialized as the same string the command characteristic accepts.
impl Serialize for AutopilotCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("malformed command payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown command '{0}'")]
    Unknown(String),
}

#[derive(Deserialize)]
struct CommandPayload {
    command: String,
}

/// Parse `{"command": "..."}` as written to the command characteristic.
pub fn parse_command(data: &[u8]) -> Result<AutopilotCommand, CommandError> {
    let payload: CommandPayload = serde_json::from_slice(data)?;
    AutopilotCommand::parse(payload.command.trim()).ok_or(CommandError::Unknown(payload.command))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommand {
    pub command: AutopilotCommand,
    pub submitted_at: Instant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxCounts {
    pub submitted: u64,
    /// Submissions that replaced an unread command
    pub overwritten: u64,
    pub rejected: u64,
    pub taken: u64,
}

/// Single-slot, last-write-wins command mailbox.
#[derive(Default)]
pub struct CommandMailbox {
    slot: Mutex<Option<PendingCommand>>,
    submitted: AtomicU64,
    overwritten: AtomicU64,
    rejected: AtomicU64,
    taken: AtomicU64,
}

impl CommandMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingCommand>> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn submit(&self, command: AutopilotCommand) {
        self.submit_at(command, Instant::now());
    }

    pub fn submit_at(&self, command: AutopilotCommand, at: Instant) {
        let previous = self.lock().replace(PendingCommand { command, submitted_at: at });
        self.submitted.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = previous {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
            debug!("Command {} replaced unread {}", command.as_str(), previous.command.as_str());
        }
    }

    /// Parse a characteristic write and submit it; invalid writes change nothing.
    pub fn submit_raw(&self, data: &[u8]) -> Result<AutopilotCommand, CommandError> {
        match parse_command(data) {
            Ok(command) => {
                self.submit(command);
                Ok(command)
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                debug!("Rejected command write: {}", e);
                Err(e)
            }
        }
    }

    /// Return the pending command and clear the slot in one step.
    pub fn take(&self) -> Option<PendingCommand> {
        let taken = self.lock().take();
        if taken.is_some() {
            self.taken.fetch_add(1, Ordering::Relaxed);
        }
        taken
    }

    pub fn has_pending(&self) -> bool {
        self.lock().is_some()
    }

    pub fn counts(&self) -> MailboxCounts {
        MailboxCounts {
            submitted: self.submitted.load(Ordering::Relaxed),
            overwritten: self.overwritten.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            taken: self.taken.load(Ordering::Relaxed),
        }
    }
}

/// Stand-in for the autopilot bus: drains the mailbox and reports that
/// nothing can be actuated.
pub struct ActuationStub {
    mailbox: Arc<CommandMailbox>,
}

impl ActuationStub {
    pub fn new(mailbox: Arc<CommandMailbox>) -> Self {
        info!("Autopilot actuation not available, commands will be logged and dropped");
        Self { mailbox }
    }

    pub fn poll(&mut self) -> Option<PendingCommand> {
        let pending = self.mailbox.take()?;
        if let AutopilotCommand::Adjust(step) = pending.command {
            debug!("Requested course change of {} degrees", step.degrees());
        }
        warn!(
            "Autopilot command '{}' dropped: no actuator ({} so far)",
            pending.command.as_str(),
            self.mailbox.counts().taken
        );
        Some(pending)
    }
}
