// Shared test helpers — not all items used by every test binary.
#![allow(unused)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use replygate::events::{InboundEvent, MessageEvent, StatusEvent};
use replygate::model::{ContentType, MessageStatus};
use replygate::outbound::OutboundChannel;
use replygate::pipeline::IntakePipeline;
use replygate::settings::{BotSettings, ChannelCredentials, SettingsHandle};
use replygate::store::MemoryStore;

#[derive(Debug, Clone)]
pub struct SentReply {
    pub to: String,
    pub text: String,
    pub delivery_id: String,
}

/// Recording stand-in for the Cloud API channel.
#[derive(Default)]
pub struct RecordingOutbound {
    pub sent: Mutex<Vec<SentReply>>,
    pub marked_read: Mutex<Vec<String>>,
    pub fail_send: AtomicBool,
    counter: AtomicU64,
}

#[async_trait]
impl OutboundChannel for RecordingOutbound {
    async fn send(
        &self,
        _credentials: &ChannelCredentials,
        to: &str,
        text: &str,
    ) -> anyhow::Result<String> {
        if self.fail_send.load(Ordering::SeqCst) {
            anyhow::bail!("simulated outbound failure");
        }
        let delivery_id = format!("wamid.reply-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().unwrap().push(SentReply {
            to: to.to_string(),
            text: text.to_string(),
            delivery_id: delivery_id.clone(),
        });
        Ok(delivery_id)
    }

    async fn mark_read(
        &self,
        _credentials: &ChannelCredentials,
        channel_message_id: &str,
    ) -> anyhow::Result<()> {
        self.marked_read
            .lock()
            .unwrap()
            .push(channel_message_id.to_string());
        Ok(())
    }
}

pub struct TestHarness {
    pub pipeline: Arc<IntakePipeline>,
    pub outbound: Arc<RecordingOutbound>,
    pub settings: SettingsHandle,
    pub store: Arc<MemoryStore>,
}

/// Pipeline over a fresh in-memory store with credentials set and business
/// hours checking disabled (so the identity templates apply regardless of
/// when the suite runs).
pub async fn harness() -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let settings = SettingsHandle::new(store.clone());
    let mut s = BotSettings::default();
    s.business_hours.enabled = false;
    s.credentials.access_token = "integration-token".to_string();
    s.credentials.phone_number_id = "42".to_string();
    settings.update(s).await.unwrap();

    let outbound = Arc::new(RecordingOutbound::default());
    let pipeline = Arc::new(IntakePipeline::new(
        store.clone(),
        settings.clone(),
        outbound.clone(),
    ));
    TestHarness {
        pipeline,
        outbound,
        settings,
        store,
    }
}

pub fn text_event(sender: &str, id: &str, body: &str) -> InboundEvent {
    InboundEvent::Message(MessageEvent {
        sender: sender.to_string(),
        channel_message_id: id.to_string(),
        content: body.to_string(),
        content_type: ContentType::Text,
        profile_name: None,
        reply_to: None,
    })
}

pub fn status_event(id: &str, status: MessageStatus) -> InboundEvent {
    InboundEvent::Status(StatusEvent {
        channel_message_id: id.to_string(),
        status,
    })
}
