use crate::domain::frame::{FrameMessage, FramePurpose, FrameRef};
use crate::domain::ports::FrameHost;
use crate::error::AuthError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFrame {
    pub frame: FrameRef,
    pub purpose: FramePurpose,
    pub url: String,
}

/// A frame host that keeps frames in memory.
///
/// Uses `Arc<RwLock<..>>` so clones share one registry: a test or driver can
/// keep a clone to inspect frames and post messages while the orchestrator
/// owns another.
#[derive(Clone)]
pub struct InMemoryFrameHost {
    frames: Arc<RwLock<BTreeMap<FrameRef, OpenFrame>>>,
    history: Arc<RwLock<Vec<OpenFrame>>>,
    refused: Arc<RwLock<HashSet<FramePurpose>>>,
    next_id: Arc<AtomicU64>,
    inbound: mpsc::UnboundedSender<FrameMessage>,
}

impl InMemoryFrameHost {
    /// Creates an empty host and the receiving end of its message stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FrameMessage>) {
        let (inbound, receiver) = mpsc::unbounded_channel();
        let host = Self {
            frames: Arc::default(),
            history: Arc::default(),
            refused: Arc::default(),
            next_id: Arc::new(AtomicU64::new(1)),
            inbound,
        };
        (host, receiver)
    }

    /// Posts a message as if sent from `origin`. Returns `false` once nobody listens.
    pub fn post(&self, origin: Option<FrameRef>, payload: impl Into<Value>) -> bool {
        self.inbound.send(FrameMessage::new(origin, payload)).is_ok()
    }

    /// Makes every later `open` for `purpose` fail.
    pub async fn refuse(&self, purpose: FramePurpose) {
        self.refused.write().await.insert(purpose);
    }

    /// Every frame ever opened, including closed ones.
    pub async fn opened(&self) -> Vec<OpenFrame> {
        self.history.read().await.clone()
    }

    pub async fn find(&self, purpose: FramePurpose) -> Option<OpenFrame> {
        self.frames
            .read()
            .await
            .values()
            .find(|f| f.purpose == purpose)
            .cloned()
    }
}

#[async_trait]
impl FrameHost for InMemoryFrameHost {
    async fn open(&self, purpose: FramePurpose, url: &str) -> Result<FrameRef, AuthError> {
        if self.refused.read().await.contains(&purpose) {
            return Err(AuthError::RemoteError(format!(
                "{purpose} frame refused by host"
            )));
        }
        let frame = FrameRef(self.next_id.fetch_add(1, Ordering::Relaxed));
        let open = OpenFrame {
            frame,
            purpose,
            url: url.to_string(),
        };
        self.history.write().await.push(open.clone());
        self.frames.write().await.insert(frame, open);
        Ok(frame)
    }

    async fn close(&self, frame: FrameRef) {
        self.frames.write().await.remove(&frame);
    }

    async fn close_all(&self) {
        self.frames.write().await.clear();
    }

    async fn frame_count(&self) -> usize {
        self.frames.read().await.len()
    }
}
