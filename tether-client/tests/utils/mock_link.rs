use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tether_client::link::{LinkEvent, LinkFactory, NegotiableLink};
use tether_core::{IceCandidate, PeerId, SessionDescription};
use tokio::sync::{Mutex, mpsc};

/// One command a session issued to its link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkCall {
    CreateOffer,
    CreateAnswer,
    SetLocal(SessionDescription),
    SetRemote(SessionDescription),
    AddCandidate(IceCandidate),
    CreateDataChannel(String),
    SendText { label: String, text: String },
    Close,
}

/// Link that records every command and lets tests push link events.
pub struct MockLink {
    pub local_id: PeerId,
    pub peer_id: PeerId,
    calls: Mutex<Vec<LinkCall>>,
    events: mpsc::Sender<LinkEvent>,
    failures: Arc<Failures>,
}

/// Engine steps a test can make fail, shared by every link of a factory.
#[derive(Default)]
struct Failures {
    creation: AtomicBool,
    offer: AtomicBool,
    remote_description: AtomicBool,
}

impl MockLink {
    pub async fn calls(&self) -> Vec<LinkCall> {
        self.calls.lock().await.clone()
    }

    /// Simulates the engine reporting something to its session.
    pub async fn inject(&self, event: LinkEvent) {
        let _ = self.events.send(event).await;
    }

    pub async fn count(&self, matches: impl Fn(&LinkCall) -> bool) -> usize {
        self.calls.lock().await.iter().filter(|c| matches(*c)).count()
    }

    /// Wait until at least `count` calls were recorded.
    pub async fn wait_for_calls(&self, count: usize, timeout_ms: u64) -> bool {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(timeout_ms);

        loop {
            if self.calls.lock().await.len() >= count {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    pub async fn wait_for_call(&self, call: &LinkCall, timeout_ms: u64) -> bool {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(timeout_ms);

        loop {
            if self.calls.lock().await.contains(call) {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    async fn record(&self, call: LinkCall) {
        tracing::debug!("[MockLink {:?}] {:?}", self.peer_id, call);
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl NegotiableLink for MockLink {
    async fn create_offer(&self) -> Result<SessionDescription> {
        self.record(LinkCall::CreateOffer).await;
        if self.failures.offer.load(Ordering::SeqCst) {
            bail!("mock offer failure toward {}", self.peer_id);
        }
        Ok(mock_offer(&self.local_id, &self.peer_id))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.record(LinkCall::CreateAnswer).await;
        Ok(mock_answer(&self.local_id, &self.peer_id))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.record(LinkCall::SetLocal(desc)).await;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.record(LinkCall::SetRemote(desc)).await;
        if self.failures.remote_description.load(Ordering::SeqCst) {
            bail!("mock remote description rejected by {}", self.local_id);
        }
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.record(LinkCall::AddCandidate(candidate)).await;
        Ok(())
    }

    async fn create_data_channel(&self, label: &str) -> Result<()> {
        self.record(LinkCall::CreateDataChannel(label.to_owned()))
            .await;
        Ok(())
    }

    async fn send_text(&self, label: &str, text: &str) -> Result<()> {
        self.record(LinkCall::SendText {
            label: label.to_owned(),
            text: text.to_owned(),
        })
        .await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(LinkCall::Close).await;
        Ok(())
    }
}

/// SDP a mock link of `local` offers toward `peer`.
pub fn mock_offer(local: &PeerId, peer: &PeerId) -> SessionDescription {
    SessionDescription::offer(format!("v=0 offer {} -> {}", local, peer))
}

pub fn mock_answer(local: &PeerId, peer: &PeerId) -> SessionDescription {
    SessionDescription::answer(format!("v=0 answer {} -> {}", local, peer))
}

/// Factory handing out MockLinks and keeping every one it built.
#[derive(Clone)]
pub struct MockLinkFactory {
    local_id: PeerId,
    links: Arc<Mutex<Vec<Arc<MockLink>>>>,
    failures: Arc<Failures>,
}

impl MockLinkFactory {
    pub fn new(local_id: impl Into<PeerId>) -> Self {
        Self {
            local_id: local_id.into(),
            links: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Failures::default()),
        }
    }

    /// Makes every following `create` fail.
    pub fn fail_creation(&self, fail: bool) {
        self.failures.creation.store(fail, Ordering::SeqCst);
    }

    /// Makes `create_offer` fail on every link, existing ones included.
    pub fn fail_offers(&self, fail: bool) {
        self.failures.offer.store(fail, Ordering::SeqCst);
    }

    /// Makes `set_remote_description` fail on every link, existing ones included.
    pub fn fail_remote_descriptions(&self, fail: bool) {
        self.failures.remote_description.store(fail, Ordering::SeqCst);
    }

    pub async fn created(&self) -> usize {
        self.links.lock().await.len()
    }

    /// Links built toward `peer_id`, oldest first.
    pub async fn links_for(&self, peer_id: &PeerId) -> Vec<Arc<MockLink>> {
        self.links
            .lock()
            .await
            .iter()
            .filter(|l| &l.peer_id == peer_id)
            .cloned()
            .collect()
    }

    /// Waits for the `nth` (1-based) link toward `peer_id`.
    pub async fn wait_for_link(
        &self,
        peer_id: &PeerId,
        nth: usize,
        timeout_ms: u64,
    ) -> Option<Arc<MockLink>> {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(timeout_ms);

        loop {
            let links = self.links_for(peer_id).await;
            if links.len() >= nth {
                return links.into_iter().nth(nth - 1);
            }
            if start.elapsed() > timeout {
                return None;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl LinkFactory for MockLinkFactory {
    async fn create(
        &self,
        peer_id: PeerId,
        events: mpsc::Sender<LinkEvent>,
    ) -> Result<Arc<dyn NegotiableLink>> {
        if self.failures.creation.load(Ordering::SeqCst) {
            bail!("mock link creation failure for {}", peer_id);
        }
        let link = Arc::new(MockLink {
            local_id: self.local_id.clone(),
            peer_id,
            calls: Mutex::new(Vec::new()),
            events,
            failures: Arc::clone(&self.failures),
        });
        self.links.lock().await.push(Arc::clone(&link));
        Ok(link)
    }
}
