use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ghpool::client::Client;
use ghpool::queue::Queue;
use ghpool::request::Request;
use ghpool::transport::{RequestParams, SearchTransport, TransportFailure, TransportOutcome, TransportResponse};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::Mutex as AsyncMutex;

fn headers_with(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (k, v) in pairs {
        headers.insert(HeaderName::from_bytes(k.as_bytes()).unwrap(), HeaderValue::from_str(v).unwrap());
    }
    headers
}

/// A transport whose behavior is keyed on the request URL, so a single
/// fake can stand in for a whole pool of differently-behaving endpoints.
struct RoutedTransport {
    routes: AsyncMutex<std::collections::HashMap<String, Vec<TransportOutcome>>>,
    calls: AtomicUsize,
}

impl RoutedTransport {
    fn new(routes: Vec<(&str, Vec<TransportOutcome>)>) -> Arc<Self> {
        Arc::new(Self {
            routes: AsyncMutex::new(
                routes.into_iter().map(|(url, outcomes)| (url.to_string(), outcomes.into_iter().rev().collect())).collect(),
            ),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SearchTransport for RoutedTransport {
    async fn execute(&self, url: &str, _params: &RequestParams) -> TransportOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut routes = self.routes.lock().await;
        let queue = routes.get_mut(url).unwrap_or_else(|| panic!("no route for {url}"));
        queue.pop().unwrap_or_else(|| panic!("no more scripted outcomes for {url}"))
    }
}

fn ok(headers: HeaderMap) -> TransportOutcome {
    Ok(TransportResponse { headers, body: Default::default() })
}

fn fail(status: reqwest::StatusCode, headers: HeaderMap) -> TransportOutcome {
    Err(TransportFailure { message: "boom".to_string(), status: Some(status), headers })
}

/// One client succeeds immediately, one always fails — both should be
/// dispatched to (construction order over `available`), and only the
/// failing URL should accumulate retry attempts.
#[tokio::test]
async fn two_clients_each_handle_their_own_request() {
    let good_url = "https://api.example.com/search?q=good";
    let bad_url = "https://api.example.com/search?q=bad";

    let transport = RoutedTransport::new(vec![
        (good_url, vec![ok(headers_with(&[("x-ratelimit-remaining", "100"), ("x-ratelimit-reset", "9999999999")]))]),
        (bad_url, vec![
            fail(reqwest::StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new()),
            fail(reqwest::StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new()),
            fail(reqwest::StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new()),
        ]),
    ]);

    let client_a = Client::new("token-aaaaaaaaaaaaaaaaaaaaaaaaaaaAAAAA", None, None, transport.clone() as Arc<dyn SearchTransport>);
    let client_b = Client::new("token-bbbbbbbbbbbbbbbbbbbbbbbbbbbBBBBB", None, None, transport.clone() as Arc<dyn SearchTransport>);

    let queue = Arc::new(Queue::new(vec![client_a, client_b], Some(3), None));

    let succeeded = Arc::new(AtomicUsize::new(0));
    let succeeded_clone = succeeded.clone();
    queue
        .push(vec![
            Request::new(good_url, RequestParams::default(), Some(Box::new(move |_| {
                succeeded_clone.fetch_add(1, Ordering::SeqCst);
            }))),
            Request::new(bad_url, RequestParams::default(), None),
        ])
        .await;

    queue.start();
    tokio::time::sleep(Duration::from_millis(400)).await;
    queue.stop();

    assert_eq!(succeeded.load(Ordering::SeqCst), 1);
    assert_eq!(queue.request_fail_count().await, 1, "bad_url should have been abandoned after 3 attempts");
    assert_eq!(queue.queue_length().await, 0);
}

/// A client that exhausts its rate limit mid-run should stop being picked
/// from `available` until its resume timer fires, and the queue should
/// still finish the backlog once it comes back.
#[tokio::test]
async fn pauses_mid_run_then_resumes_and_drains() {
    tokio::time::pause();
    let url = "https://api.example.com/search?q=paced";

    let now_secs = std::time::SystemTime::now().duration_since(std::time::SystemTime::UNIX_EPOCH).unwrap().as_secs() as i64;

    let transport = RoutedTransport::new(vec![(
        url,
        vec![
            ok(headers_with(&[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", &(now_secs + 1).to_string())])),
            ok(headers_with(&[("x-ratelimit-remaining", "50"), ("x-ratelimit-reset", &(now_secs + 3600).to_string())])),
        ],
    )]);

    let client = Client::new("token-ccccccccccccccccccccccccccccCCCCC", None, Some(Duration::from_millis(0)), transport as Arc<dyn SearchTransport>);
    let queue = Arc::new(Queue::new(vec![client], None, None));

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    queue.push(vec![Request::new(url, RequestParams::default(), Some(Box::new(move |_| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    })))]).await;
    queue.push(vec![Request::new(url, RequestParams::default(), Some(Box::new({
        let calls = calls.clone();
        move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        }
    })))]).await;

    queue.start();

    for _ in 0..20 {
        tokio::time::advance(Duration::from_millis(200)).await;
        tokio::task::yield_now().await;
    }
    queue.stop();

    assert_eq!(calls.load(Ordering::SeqCst), 2, "both requests should eventually dispatch once the client resumes");
}
