use crate::worker::{WorkerHandle, WorkerMessage};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// How long the ready-path send waits for a worker to announce itself.
const READY_TIMEOUT: Duration = Duration::from_secs(5);

pub type ReadySender = watch::Sender<Option<WorkerHandle>>;
pub type ReadyReceiver = watch::Receiver<Option<WorkerHandle>>;

/// Channel a worker uses to announce it is up and controlling.
pub fn ready_channel() -> (ReadySender, ReadyReceiver) {
    watch::channel(None)
}

/// The foreground side of the settings channel. A setting change is pushed
/// along three paths: the currently-controlling worker, every other known
/// registration, and the worker announced by the ready signal. Every send
/// is best-effort and individually isolated; the worker's own per-request
/// reconciliation is the backstop when all of them miss.
pub struct SyncClient {
    controller: Option<WorkerHandle>,
    registrations: Vec<WorkerHandle>,
    ready: ReadyReceiver,
}

impl SyncClient {
    pub fn new(
        controller: Option<WorkerHandle>,
        registrations: Vec<WorkerHandle>,
        ready: ReadyReceiver,
    ) -> Self {
        Self {
            controller,
            registrations,
            ready,
        }
    }

    pub async fn set_adblock_enabled(&self, enabled: bool) {
        let message = WorkerMessage::SetAdblockEnabled { enabled };

        // (a) the controlling worker, with a reply port
        if let Some(controller) = &self.controller {
            if let Err(e) = controller.post_with_reply(message.clone()).await {
                debug!("Adblock sync to controlling worker failed: {}", e);
            }
        }

        // (b) every other active registration, covering handoff races
        for registration in &self.registrations {
            if let Err(e) = registration.post(message.clone()).await {
                debug!("Adblock sync to registration failed: {}", e);
            }
        }

        // (c) whichever worker the ready signal announces
        let mut ready = self.ready.clone();
        let announced = tokio::time::timeout(READY_TIMEOUT, async {
            ready.wait_for(|w| w.is_some()).await.ok()?.clone()
        })
        .await;
        match announced {
            Ok(Some(worker)) => {
                if let Err(e) = worker.post(message).await {
                    debug!("Adblock sync to ready worker failed: {}", e);
                }
            }
            Ok(None) => debug!("Ready signal closed before a worker was announced"),
            Err(_) => debug!("No worker became ready within {:?}", READY_TIMEOUT),
        }
    }
}
