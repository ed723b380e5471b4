use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    analysis::{
        generator::TextGenerator,
        news::{NewsSnippet, SearchProvider, SearchQuery},
    },
    error::UpstreamError,
};

pub fn snippet(i: usize) -> NewsSnippet {
    NewsSnippet {
        title: format!("Headline {i}"),
        body: format!("Body text number {i}."),
        source_url: format!("https://news.example.com/{i}"),
    }
}

pub struct FakeSearch {
    results: Option<Vec<NewsSnippet>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_query: Mutex<Option<SearchQuery>>,
}

impl FakeSearch {
    pub fn returning(results: Vec<NewsSnippet>) -> Self {
        Self {
            results: Some(results),
            delay: None,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn with_count(n: usize) -> Self {
        Self::returning((1..=n).map(snippet).collect())
    }

    pub fn failing() -> Self {
        Self {
            results: None,
            ..Self::returning(Vec::new())
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<SearchQuery> {
        self.last_query.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<NewsSnippet>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.results.clone().ok_or(UpstreamError::Transport {
            provider: "fake-search",
            message: "connection refused".into(),
        })
    }
}

pub struct FakeGenerator {
    reply: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.into()),
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            ..Self::replying("")
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_owned());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().ok_or(UpstreamError::Status {
            provider: "fake-generator",
            status: 503,
        })
    }
}
