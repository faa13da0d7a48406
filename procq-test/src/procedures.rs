//! Demo payloads.
//!
//! None of these do real work: the network is a canned byte payload, parsing is `str::parse`.
//! They exist to exercise inputs, outputs, validation failures and suspension.

use std::time::Duration;

use futures::future::{self, Either};
use procq::{ExecContext, Group, Outcome, Procedure, Task, TaskError};

/// `"Dan"` becomes `"Hello, Dan!"`. An empty name is invalid input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Greet;

impl Procedure for Greet {
    type Input = String;
    type Output = String;

    async fn execute(self, cx: ExecContext<String>) -> Outcome<String> {
        let name = cx.input()?;
        if name.is_empty() {
            return Err(cx.invalid_input("name must not be empty"));
        }
        Ok(format!("Hello, {name}!"))
    }
}

/// A fake remote endpoint that answers every request with the same bytes.
#[derive(Debug, Clone)]
pub struct MockNetwork {
    payload: Vec<u8>,
    latency: Duration,
    failure: Option<String>,
}

impl MockNetwork {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            latency: Duration::ZERO,
            failure: None,
        }
    }

    /// Simulated round trip. Non-zero latency needs a tokio runtime.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every request fails with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub async fn get(&self, url: &str) -> Outcome<Vec<u8>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.failure {
            Some(message) => Err(TaskError::failed(format!("GET {url}: {message}"))),
            None => Ok(self.payload.clone()),
        }
    }
}

/// Downloads the URL in its input through a [`MockNetwork`]. Stops early when cancelled.
#[derive(Debug, Clone)]
pub struct Fetch {
    network: MockNetwork,
}

impl Fetch {
    pub fn new(network: MockNetwork) -> Self {
        Self { network }
    }
}

impl Procedure for Fetch {
    type Input = String;
    type Output = Vec<u8>;

    async fn execute(self, cx: ExecContext<String>) -> Outcome<Vec<u8>> {
        let url = cx.input()?;
        if url.is_empty() {
            return Err(cx.invalid_input("url must not be empty"));
        }

        let request = self.network.get(url);
        futures::pin_mut!(request);
        match future::select(request, cx.cancelled()).await {
            Either::Left((response, _)) => response,
            Either::Right(_) => Err(TaskError::failed(format!("GET {url}: aborted"))),
        }
    }
}

/// Decimal integer from UTF-8 bytes, surrounding whitespace ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parse;

impl Procedure for Parse {
    type Input = Vec<u8>;
    type Output = i64;

    async fn execute(self, cx: ExecContext<Vec<u8>>) -> Outcome<i64> {
        let text = std::str::from_utf8(cx.input()?)
            .map_err(|e| cx.invalid_input(format!("not UTF-8: {e}")))?;
        text.trim()
            .parse()
            .map_err(|e| cx.invalid_input(format!("{text:?} is not an integer: {e}")))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Square;

impl Procedure for Square {
    type Input = i64;
    type Output = i64;

    async fn execute(self, cx: ExecContext<i64>) -> Outcome<i64> {
        let n = *cx.input()?;
        n.checked_mul(n)
            .ok_or_else(|| cx.invalid_input(format!("{n} squared overflows")))
    }
}

/// Fetch → Parse → Square as one group task: the group input is the URL, its output the square.
pub fn pipeline(network: MockNetwork) -> Task<String, i64> {
    let fetch = Task::new(Fetch::new(network)).with_name("fetch");
    let parse = Task::new(Parse).with_name("parse");
    let square = Task::new(Square).with_name("square");

    parse.bind_input(&fetch).unwrap();
    parse.add_dependency(&fetch).unwrap();
    square.bind_input(&parse).unwrap();
    square.add_dependency(&parse).unwrap();

    Group::new()
        .name("pipeline")
        .child(&fetch)
        .child(&parse)
        .child(&square)
        .input_to(&fetch)
        .output_from(&square)
        .into_task()
        .with_name("pipeline")
}
