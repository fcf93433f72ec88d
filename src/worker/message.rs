use crate::adblock::AdblockController;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Messages a foreground page can post to the worker. The wire format is
/// the tagged JSON the page sends over the message boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    #[serde(rename = "setAdblockEnabled")]
    SetAdblockEnabled { enabled: bool },
}

/// Acknowledgement posted back on the reply port, when one was supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

/// One posted message, with an optional reply port.
pub struct Envelope {
    pub message: WorkerMessage,
    pub reply: Option<oneshot::Sender<Ack>>,
}

/// Sending side of a worker's message queue. Cheap to clone; a send fails
/// only when the worker's loop is gone.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Envelope>,
}

impl WorkerHandle {
    pub(crate) fn from_sender(tx: mpsc::Sender<Envelope>) -> Self {
        Self { tx }
    }

    /// Fire-and-forget post.
    pub async fn post(&self, message: WorkerMessage) -> Result<()> {
        self.tx
            .send(Envelope {
                message,
                reply: None,
            })
            .await
            .map_err(|_| anyhow!("Worker message loop is gone"))
    }

    /// Post with a reply port and wait for the acknowledgement.
    pub async fn post_with_reply(&self, message: WorkerMessage) -> Result<Ack> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                message,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| anyhow!("Worker message loop is gone"))?;
        reply_rx
            .await
            .map_err(|_| anyhow!("Worker dropped the reply port"))
    }
}

/// Spawns the worker-side message loop: apply each message through the
/// controller (update flag, re-apply middleware, persist), then answer the
/// reply port.
pub fn spawn_message_loop(adblock: Arc<AdblockController>) -> WorkerHandle {
    let (tx, mut rx) = mpsc::channel::<Envelope>(32);
    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            match envelope.message {
                WorkerMessage::SetAdblockEnabled { enabled } => {
                    adblock.set_enabled(enabled).await;
                }
            }
            if let Some(reply) = envelope.reply {
                let _ = reply.send(Ack { ok: true });
            }
        }
    });
    WorkerHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::MiddlewareChain;
    use crate::settings::SettingsStore;
    use std::fs;

    #[test]
    fn test_message_wire_format() {
        let msg = WorkerMessage::SetAdblockEnabled { enabled: true };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"setAdblockEnabled","enabled":true}"#);

        let parsed: WorkerMessage =
            serde_json::from_str(r#"{"type":"setAdblockEnabled","enabled":false}"#).unwrap();
        assert_eq!(parsed, WorkerMessage::SetAdblockEnabled { enabled: false });
    }

    #[test]
    fn test_ack_wire_format() {
        assert_eq!(serde_json::to_string(&Ack { ok: true }).unwrap(), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_loop_applies_and_acks() {
        let dir = std::env::temp_dir().join("mocha-message-test-loop");
        let _ = fs::remove_dir_all(&dir);

        let chain = Arc::new(MiddlewareChain::new());
        let adblock = Arc::new(AdblockController::new(
            chain,
            SettingsStore::new(&dir),
            None,
        ));
        let handle = spawn_message_loop(adblock.clone());

        let ack = handle
            .post_with_reply(WorkerMessage::SetAdblockEnabled { enabled: true })
            .await
            .unwrap();
        assert!(ack.ok);
        assert!(adblock.is_enabled());

        handle
            .post(WorkerMessage::SetAdblockEnabled { enabled: false })
            .await
            .unwrap();
        // Fire-and-forget: wait for the loop to apply it
        for _ in 0..50 {
            if !adblock.is_enabled() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(!adblock.is_enabled());

        let _ = fs::remove_dir_all(dir);
    }
}
