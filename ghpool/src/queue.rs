//! The shared backlog + dispatch scheduler.
//!
//! This is the "hard part" the design calls out: picking free/authorized
//! clients, popping the backlog LIFO, dispatching in parallel, and folding
//! completions back into retry/abort/global-abort policy. The dispatcher
//! loop is grounded on the teacher's `GitHubRateLimiter::wait_if_paused`
//! gate-then-proceed pattern, generalized from a single gate to a
//! multi-client `select!` over a `Notify` plus a fallback interval tick —
//! see spec.md §9's redesign note on replacing sub-second polling with
//! proper async scheduling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

use crate::client::Client;
use crate::request::Request;

const DEFAULT_MAX_PER_REQUEST: u64 = 5;
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(1000);

struct QueueState {
    backlog: Vec<Request>,
    error_count: u64,
    success_count: u64,
    errors_by_url: HashMap<String, u64>,
}

/// Owns the fixed client pool and the shared request backlog.
///
/// `Queue` is cheap to clone (all mutable state lives behind `Arc`s) so the
/// dispatcher loop and its spawned per-dispatch tasks can all hold a handle
/// back to the same queue.
#[derive(Clone)]
pub struct Queue {
    clients: Arc<Vec<Client>>,
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
    max_per_request: u64,
    max_total: u64,
    stopped: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl Queue {
    pub fn new(clients: Vec<Client>, max_per_request: Option<u64>, max_total: Option<u64>) -> Self {
        let max_per_request = max_per_request.unwrap_or(DEFAULT_MAX_PER_REQUEST);
        let max_total = max_total.unwrap_or(max_per_request * 1000);

        Self {
            clients: Arc::new(clients),
            state: Arc::new(Mutex::new(QueueState {
                backlog: Vec::new(),
                error_count: 0,
                success_count: 0,
                errors_by_url: HashMap::new(),
            })),
            notify: Arc::new(Notify::new()),
            max_per_request,
            max_total,
            stopped: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub async fn queue_length(&self) -> usize {
        self.state.lock().await.backlog.len()
    }

    pub async fn error_count(&self) -> u64 {
        self.state.lock().await.error_count
    }

    /// Count of dispatches whose callback ran successfully. Not part of
    /// spec.md's core contract; added for the CLI summary SPEC_FULL.md §6
    /// requires ("results succeeded/retried/aborted").
    pub async fn success_count(&self) -> u64 {
        self.state.lock().await.success_count
    }

    /// Number of distinct URLs whose attempt count has reached
    /// `max_per_request` (i.e. abandoned).
    pub async fn request_fail_count(&self) -> usize {
        let state = self.state.lock().await;
        state
            .errors_by_url
            .values()
            .filter(|&&count| count >= self.max_per_request)
            .count()
    }

    /// Append requests to the tail; dispatched last (LIFO means they are
    /// dispatched in reverse of this call's argument order, ahead of
    /// whatever was already queued).
    pub async fn push(&self, requests: Vec<Request>) {
        let n = requests.len();
        {
            let mut state = self.state.lock().await;
            state.backlog.extend(requests);
        }
        tracing::debug!(count = n, "pushed requests to backlog");
        self.notify.notify_waiters();
    }

    /// Insert requests at the head, preserving their relative order: the
    /// first argument is dispatched next. Used for front-of-line retries.
    ///
    /// Internally this is the same backing `Vec` as `push` (dispatch always
    /// pops the last element), just appended in reverse argument order so
    /// the first-given request ends up on top.
    pub async fn unshift(&self, requests: Vec<Request>) {
        let n = requests.len();
        {
            let mut state = self.state.lock().await;
            for request in requests.into_iter().rev() {
                state.backlog.push(request);
            }
        }
        tracing::debug!(count = n, "unshifted requests to front of backlog");
        self.notify.notify_waiters();
    }

    /// Start the dispatch loop. Idempotent: a second call while a loop is
    /// already running is a no-op (spec.md §9 asks implementers to fix the
    /// source's "starts a fresh loop every call" behavior).
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("queue start() called while already running, ignoring");
            return;
        }
        self.stopped.store(false, Ordering::SeqCst);
        tracing::info!("queue starting");

        let this = self.clone();
        tokio::spawn(async move {
            this.run_loop().await;
            this.running.store(false, Ordering::SeqCst);
        });
    }

    /// Stop the dispatch loop. In-flight dispatches are not cancelled; their
    /// completions still run to the callback/retry path.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        tracing::info!("queue stop requested");
        self.notify.notify_waiters();
    }

    async fn run_loop(self: Arc<Self>) {
        loop {
            if self.stopped.load(Ordering::SeqCst) {
                tracing::info!("queue stopped");
                return;
            }

            let error_count = self.state.lock().await.error_count;
            if error_count >= self.max_total {
                tracing::error!(error_count, max_total = self.max_total, "global error budget exceeded, aborting");
                return;
            }

            // Register interest in the next `notify_waiters()` *before*
            // re-reading backlog/client state: `Notify::notified()` only
            // catches notifications fired after this future is constructed,
            // so constructing it first closes the race where a `push`,
            // `unshift`, or dispatch completion lands between the state
            // check below and the `.await` that waits on it.
            let notified = self.notify.notified();

            let mut available = Vec::new();
            for client in self.clients.iter() {
                if client.is_authorized().await && !client.is_busy().await {
                    available.push(client.clone());
                }
            }

            let backlog_empty = self.state.lock().await.backlog.is_empty();

            if backlog_empty || available.is_empty() {
                let _ = tokio::time::timeout(IDLE_POLL_INTERVAL, notified).await;
                continue;
            }

            let mut dispatches = Vec::new();
            {
                let mut state = self.state.lock().await;
                for client in available {
                    let Some(request) = state.backlog.pop() else {
                        break;
                    };
                    dispatches.push((client, request));
                }
            }

            for (client, request) in dispatches {
                let this = self.clone();
                tokio::spawn(async move {
                    this.dispatch_one(client, request).await;
                });
            }
        }
    }

    async fn dispatch_one(&self, client: Client, request: Request) {
        let url = request.url().to_string();
        let outcome = client.request(&url, request.params()).await;

        match outcome {
            Ok(response) => {
                self.state.lock().await.success_count += 1;

                // Isolate user-callback panics so a misbehaving callback
                // cannot poison the dispatcher.
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    request.run_callback(response);
                }));
                if result.is_err() {
                    tracing::error!(url, "request callback panicked");
                }
            }
            Err(_failure) => {
                let mut state = self.state.lock().await;
                state.error_count += 1;
                let attempts = state.errors_by_url.entry(url.clone()).or_insert(0);
                *attempts += 1;

                if *attempts < self.max_per_request {
                    tracing::info!(url, attempts = *attempts, "retrying request");
                    state.backlog.push(request);
                } else {
                    tracing::info!(url, attempts = *attempts, "aborting request, exceeded retry budget");
                }
            }
        }

        self.notify.notify_waiters();
    }
}
