//! Progress reporting.
//!
//! The orchestrator announces what it is doing through a [`StatusReporter`]. Reporting is fire and
//! forget: it is synchronous, cannot fail, and a reporter nobody listens to is fine.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::*;

/// Receives human readable progress messages.
pub trait StatusReporter: Send + Sync {
  /// Publishes a message.
  fn set_status(&self, message: &str);
}

/// Writes status messages to the `tracing` log at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatus;

/// Forwards status messages into a channel, e.g. for a UI task to display.
///
/// # Examples
///
/// ```
/// use gleaner::status::{ChannelStatus, StatusReporter};
///
/// let (status, mut messages) = ChannelStatus::new();
/// status.set_status("Scraping metadata from arxiv ...");
/// assert_eq!(messages.try_recv().unwrap(), "Scraping metadata from arxiv ...");
/// ```
#[derive(Debug, Clone)]
pub struct ChannelStatus {
  /// Sending half of the status channel
  sender: UnboundedSender<String>,
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentStatus;

impl StatusReporter for TracingStatus {
  fn set_status(&self, message: &str) {
    info!("{}", message);
  }
}

impl ChannelStatus {
  /// Creates a reporter together with the receiver of its messages.
  pub fn new() -> (Self, UnboundedReceiver<String>) {
    let (sender, receiver) = unbounded_channel();
    (Self { sender }, receiver)
  }
}

impl StatusReporter for ChannelStatus {
  fn set_status(&self, message: &str) {
    // A closed receiver just means nobody is watching.
    let _ = self.sender.send(message.to_string());
  }
}

impl StatusReporter for SilentStatus {
  fn set_status(&self, _message: &str) {}
}
