use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events relayed to the client over the run's lifetime
///
/// The wire shape is fixed: a `type` tag plus flat fields. `progress`
/// addresses the reporting node through the `taskId` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionEvent {
    Log {
        message: String,
    },
    Progress {
        #[serde(rename = "taskId")]
        task_id: String,
        /// 0-100
        progress: u8,
        message: String,
    },
    Error {
        message: String,
    },
    Done {
        message: String,
    },
    Pong,
}

/// Sending half of a session's event stream
///
/// Cloneable and usable from worker threads; delivery is a channel send,
/// never direct mutation of session state. Sends after the receiver is
/// gone are dropped silently.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub fn channel() -> (EventSink, mpsc::UnboundedReceiver<SessionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (EventSink { sender }, receiver)
    }

    pub fn send(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn log(&self, message: impl Into<String>) {
        self.send(SessionEvent::Log {
            message: message.into(),
        });
    }

    pub fn progress(&self, task_id: impl Into<String>, progress: u8, message: impl Into<String>) {
        self.send(SessionEvent::Progress {
            task_id: task_id.into(),
            progress,
            message: message.into(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(SessionEvent::Error {
            message: message.into(),
        });
    }

    pub fn done(&self, message: impl Into<String>) {
        self.send(SessionEvent::Done {
            message: message.into(),
        });
    }
}
