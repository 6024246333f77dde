use std::{
    borrow::Cow,
    fmt, mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use effect_rpc::{ErrorCode, ProcedureKind};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::oneshot;

use crate::{ClientError, RemoteError};

struct Pending {
    key: &'static str,
    input: Value,
    tx: oneshot::Sender<Result<Value, ClientError>>,
}

#[derive(Default)]
struct Queue {
    queries: Vec<Pending>,
    mutations: Vec<Pending>,
    scheduled: bool,
}

/// Coalesces calls made in the same tick into one request per [`ProcedureKind`].
///
/// The first call to join an empty queue becomes the leader. It yields once so
/// sibling calls get a chance to enqueue, then hands the queue to a spawned task.
pub(crate) struct BatchLink {
    url: Cow<'static, str>,
    http: reqwest::Client,
    batching: bool,
    max_batch_size: Option<usize>,
    queue: Mutex<Queue>,
}

impl fmt::Debug for BatchLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchLink")
            .field("url", &self.url)
            .field("batching", &self.batching)
            .field("max_batch_size", &self.max_batch_size)
            .finish()
    }
}

// Flushes on drop so a leader that gets cancelled mid-yield doesn't strand its followers.
struct Flush(Arc<BatchLink>);

impl Drop for Flush {
    fn drop(&mut self) {
        self.0.flush();
    }
}

impl BatchLink {
    pub(crate) fn new(
        url: Cow<'static, str>,
        http: reqwest::Client,
        batching: bool,
        max_batch_size: Option<usize>,
    ) -> Self {
        Self {
            url,
            http,
            batching,
            max_batch_size,
            queue: Default::default(),
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) async fn call(
        self: &Arc<Self>,
        key: &'static str,
        kind: ProcedureKind,
        input: Value,
    ) -> Result<Value, ClientError> {
        if !self.batching {
            return self.send_one(key, kind, input).await;
        }

        let (tx, rx) = oneshot::channel();
        let leader = {
            let mut queue = self.lock();
            let pending = Pending { key, input, tx };
            match kind {
                ProcedureKind::Query => queue.queries.push(pending),
                ProcedureKind::Mutation => queue.mutations.push(pending),
            }
            !mem::replace(&mut queue.scheduled, true)
        };

        if leader {
            let flush = Flush(self.clone());
            tokio::task::yield_now().await;
            drop(flush);
        }

        rx.await.map_err(|_| ClientError::Closed)?
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush(self: &Arc<Self>) {
        let (queries, mutations) = {
            let mut queue = self.lock();
            queue.scheduled = false;
            (mem::take(&mut queue.queries), mem::take(&mut queue.mutations))
        };

        // Without a runtime the pending senders are dropped and every caller sees `Closed`.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        for (kind, calls) in [
            (ProcedureKind::Query, queries),
            (ProcedureKind::Mutation, mutations),
        ] {
            for chunk in self.chunks(calls) {
                let link = self.clone();
                handle.spawn(async move { link.send_batch(kind, chunk).await });
            }
        }
    }

    fn chunks(&self, mut calls: Vec<Pending>) -> Vec<Vec<Pending>> {
        let mut chunks = Vec::new();
        if let Some(max) = self.max_batch_size {
            while calls.len() > max {
                let rest = calls.split_off(max);
                chunks.push(mem::replace(&mut calls, rest));
            }
        }
        if !calls.is_empty() {
            chunks.push(calls);
        }
        chunks
    }

    async fn send_batch(&self, kind: ProcedureKind, mut calls: Vec<Pending>) {
        if calls.len() == 1 {
            if let Some(call) = calls.pop() {
                let result = self.send_one(call.key, kind, call.input).await;
                call.tx.send(result).ok();
            }
            return;
        }

        let path = calls.iter().map(|c| c.key).collect::<Vec<_>>().join(",");
        let mut inputs = Map::new();
        let mut txs = Vec::with_capacity(calls.len());
        for (i, call) in calls.into_iter().enumerate() {
            if !call.input.is_null() {
                inputs.insert(i.to_string(), call.input);
            }
            txs.push(call.tx);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("sending batch of {} {kind} calls: {path}", txs.len());

        let input = (!inputs.is_empty()).then_some(Value::Object(inputs));
        let result = match self.request(kind, &path, true, input).await {
            Ok(body) => {
                serde_json::from_slice::<Vec<Envelope>>(&body).map_err(|err| ClientError::Decode(err.into()))
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(envelopes) if envelopes.len() == txs.len() => {
                for (tx, envelope) in txs.into_iter().zip(envelopes) {
                    tx.send(envelope.into_result()).ok();
                }
            }
            Ok(envelopes) => {
                let err = ClientError::BatchMismatch {
                    expected: txs.len(),
                    got: envelopes.len(),
                };
                for tx in txs {
                    tx.send(Err(err.clone())).ok();
                }
            }
            Err(err) => {
                for tx in txs {
                    tx.send(Err(err.clone())).ok();
                }
            }
        }
    }

    async fn send_one(
        &self,
        key: &str,
        kind: ProcedureKind,
        input: Value,
    ) -> Result<Value, ClientError> {
        let input = (!input.is_null()).then_some(input);
        let body = self.request(kind, key, false, input).await?;
        serde_json::from_slice::<Envelope>(&body)
            .map_err(|err| ClientError::Decode(err.into()))?
            .into_result()
    }

    async fn request(
        &self,
        kind: ProcedureKind,
        path: &str,
        batch: bool,
        input: Option<Value>,
    ) -> Result<Vec<u8>, ClientError> {
        let url = format!(
            "{}{}{}",
            self.url,
            if self.url.ends_with('/') { "" } else { "/" },
            path
        );

        let mut query = Vec::new();
        if batch {
            query.push(("batch", "1".to_string()));
        }

        let req = match kind {
            ProcedureKind::Query => {
                if let Some(input) = input {
                    let input = serde_json::to_string(&input)
                        .map_err(|err| ClientError::Encode(err.into()))?;
                    query.push(("input", input));
                }
                self.http.get(url)
            }
            ProcedureKind::Mutation => match input {
                Some(input) => self.http.post(url).json(&input),
                None => self.http.post(url),
            },
        };
        let req = if query.is_empty() {
            req
        } else {
            req.query(&query)
        };

        let resp = req.send().await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
enum Envelope {
    Result(ResultData),
    Error(ErrorShape),
}

#[derive(Deserialize)]
struct ResultData {
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct ErrorShape {
    message: String,
    data: ErrorData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorData {
    code: String,
    http_status: u16,
    #[serde(default)]
    path: Option<String>,
}

impl Envelope {
    fn into_result(self) -> Result<Value, ClientError> {
        match self {
            Self::Result(result) => Ok(result.data),
            Self::Error(err) => Err(ClientError::Server(RemoteError {
                code: ErrorCode::from_str_code(&err.data.code)
                    .or_else(|| ErrorCode::from_status_code(err.data.http_status))
                    .unwrap_or(ErrorCode::InternalServerError),
                code_name: err.data.code,
                message: err.message,
                http_status: err.data.http_status,
                path: err.data.path,
            })),
        }
    }
}
