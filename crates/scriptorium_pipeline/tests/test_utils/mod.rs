//! Test utilities for pipeline tests.
//!
//! [`ScriptedDriver`] stands in for the completion service: it answers calls
//! from a script, splits successful answers into stream chunks, records every
//! request, and can hold a call open until the test releases it.

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::stream;
use scriptorium_core::{
    AgentRole, ChapterRecord, Character, ForeshadowingItem, ForeshadowingStatus,
    GenerateRequest, GenerateResponse, PlotPoint, ProjectSnapshot, TokenUsage, WorldEntry,
};
use scriptorium_error::{CompletionError, CompletionErrorKind, ScriptoriumResult};
use scriptorium_interface::{ChunkStream, CompletionDriver, StreamChunk};
use scriptorium_pipeline::{
    AgentProfile, AgentRoster, AgentSettings, GenerationAgent, InMemoryNarrativeStore,
    PipelineEvent, RetryConfig,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio::sync::{Notify, mpsc};

/// Usage reported with every scripted success.
pub const SCRIPTED_USAGE: TokenUsage = TokenUsage::new(10, 20);

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Answer with the text
    Success(String),
    /// Fail with the error
    Error(CompletionErrorKind),
    /// Wait for the gate, then answer with the text
    Gated(String, Arc<Notify>),
}

/// Completion driver answering from a script.
#[derive(Clone)]
pub struct ScriptedDriver {
    responses: Arc<Vec<MockResponse>>,
    call_count: Arc<Mutex<usize>>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
    chunk_chars: usize,
}

impl ScriptedDriver {
    /// Answers calls in order with the given responses.
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(responses),
            call_count: Arc::new(Mutex::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            chunk_chars: 8,
        }
    }

    /// Answers calls in order with successes.
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            texts
                .into_iter()
                .map(|t| MockResponse::Success(t.into()))
                .collect(),
        )
    }

    /// Sets the stream chunk size in characters.
    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Concatenated message contents of call `index`.
    pub fn prompt(&self, index: usize) -> String {
        self.requests()[index]
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn next_text(&self, req: &GenerateRequest) -> ScriptoriumResult<String> {
        let response = {
            let mut count = self.call_count.lock().unwrap();
            let current = *count;
            *count += 1;
            self.requests.lock().unwrap().push(req.clone());
            self.responses.get(current).cloned().ok_or(current)
        };

        match response {
            Ok(MockResponse::Success(text)) => Ok(text),
            Ok(MockResponse::Error(kind)) => Err(CompletionError::new(kind).into()),
            Ok(MockResponse::Gated(text, gate)) => {
                gate.notified().await;
                Ok(text)
            }
            Err(current) => Err(CompletionError::new(CompletionErrorKind::MalformedResponse(
                format!(
                    "Mock script exhausted (call {} beyond {} responses)",
                    current + 1,
                    self.responses.len()
                ),
            ))
            .into()),
        }
    }

    fn chunks(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.chunk_chars)
            .map(|c| c.iter().collect())
            .collect()
    }
}

#[async_trait]
impl CompletionDriver for ScriptedDriver {
    async fn generate(&self, req: &GenerateRequest) -> ScriptoriumResult<GenerateResponse> {
        let text = self.next_text(req).await?;
        Ok(GenerateResponse::new(text, Some(SCRIPTED_USAGE)))
    }

    async fn generate_stream(&self, req: &GenerateRequest) -> ScriptoriumResult<ChunkStream> {
        let text = self.next_text(req).await?;
        let mut items: Vec<ScriptoriumResult<StreamChunk>> = self
            .chunks(&text)
            .into_iter()
            .map(|c| Ok(StreamChunk::partial(c)))
            .collect();
        items.push(Ok(StreamChunk::last("", Some(SCRIPTED_USAGE))));
        Ok(Box::pin(stream::iter(items)))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// A roster with an agent for every role, retrying quickly.
pub fn roster(driver: &ScriptedDriver) -> AgentRoster {
    let driver: Arc<dyn CompletionDriver> = Arc::new(driver.clone());
    let retry = RetryConfig {
        enabled: true,
        max_retries: 2,
        initial_backoff_ms: 1,
        max_delay_secs: 1,
    };
    let mut roster = AgentRoster::new();
    for role in AgentRole::iter() {
        roster.insert(
            GenerationAgent::new(
                role,
                AgentProfile::new(format!("You are the {}.", role.label())),
                AgentSettings::new(Some("scripted-model".into()), Some(0.5), Some(256)),
                driver.clone(),
            )
            .with_retry(retry.clone()),
        );
    }
    roster
}

/// A small two-chapter project.
pub fn sample_project() -> ProjectSnapshot {
    ProjectSnapshot {
        project_id: "salt-road".into(),
        title: "The Salt Road".into(),
        synopsis: Some("A caravan crosses the salt flats.".into()),
        characters: vec![Character {
            name: "Mira".into(),
            role: Some("guide".into()),
            description: "Knows every well between here and the coast.".into(),
        }],
        world_entries: vec![WorldEntry {
            category: "location".into(),
            title: "Qasr".into(),
            content: "A ruined fort at the edge of the flats.".into(),
        }],
        plot_points: vec![PlotPoint {
            title: "The broken well".into(),
            description: "The caravan finds the first well dry.".into(),
            chapter: Some(2),
            position: 1,
        }],
        foreshadowing: vec![
            ForeshadowingItem {
                id: "f1".into(),
                title: "The sealed letter".into(),
                description: "Mira carries a letter she will not open.".into(),
                status: ForeshadowingStatus::Planted,
                planted_chapter: Some(1),
                target_chapter: Some(3),
                resolved_chapter: None,
                resolution_note: None,
            },
            ForeshadowingItem {
                id: "f2".into(),
                title: "The lame camel".into(),
                description: "A camel limps from the first day.".into(),
                status: ForeshadowingStatus::Resolved,
                planted_chapter: Some(1),
                target_chapter: Some(2),
                resolved_chapter: Some(2),
                resolution_note: None,
            },
        ],
        chapters: vec![
            ChapterRecord {
                id: "c1".into(),
                number: 1,
                title: "Departure".into(),
                synopsis: Some("The caravan leaves the city.".into()),
                summary: Some("Mira agrees to guide the caravan.".into()),
                content: None,
            },
            ChapterRecord {
                id: "c2".into(),
                number: 2,
                title: "The Flats".into(),
                synopsis: Some("The first well is dry.".into()),
                summary: None,
                content: None,
            },
        ],
        ..Default::default()
    }
}

/// A store holding [`sample_project`].
pub async fn sample_store() -> Arc<InMemoryNarrativeStore> {
    let store = Arc::new(InMemoryNarrativeStore::new());
    store.insert_project(sample_project()).await;
    store
}

/// Receives the next event, failing the test after a second.
pub async fn next_event(events: &mut mpsc::UnboundedReceiver<PipelineEvent>) -> PipelineEvent {
    tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("Timed out waiting for event")
        .expect("Event stream closed")
}

/// Receives events until one matches, returning it.
pub async fn wait_for_event(
    events: &mut mpsc::UnboundedReceiver<PipelineEvent>,
    matches: impl Fn(&PipelineEvent) -> bool,
) -> PipelineEvent {
    loop {
        let event = next_event(events).await;
        if matches(&event) {
            return event;
        }
    }
}

/// Drains every event already sent.
pub fn drain(events: &mut mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Event names in order.
pub fn names(events: &[PipelineEvent]) -> Vec<String> {
    events.iter().map(|e| e.name().to_string()).collect()
}
