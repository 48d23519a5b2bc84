//! I define opportunistic websocket subscriptions for change
//! notifications, used to invalidate cached resource content.
//!
//! Subscription failures never fail the operation that triggered
//! them; they are logged and ignored.
//!

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use http::{HeaderValue, Method};
use pod_uri::PodUri;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::ClientRequestBuilder, http::Uri, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::{
    activity::{parse_activity, Activity},
    background::Background,
    content::ReadCache,
    error::HttpError,
    requestor::Requestor,
};

/// Subscription endpoint.
// TODO: Should use discovery to find the websocket endpoint.
pub const SUBSCRIPTION_ENDPOINT: &str = "https://websocket.inrupt.com/";

/// Interval between keep-alive pings on an established connection.
const PING_INTERVAL: Duration = Duration::from_secs(50);

/// Delay before reconnecting a dropped connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct TopicSubscriptionInfo {
    endpoint: String,
    subprotocol: String,
}

/// The notification subscriber of a mount.
pub struct Notifier {
    requestor: Arc<dyn Requestor>,
    background: Arc<Background>,
    read_cache: Arc<ReadCache>,
    subscribed: Mutex<HashSet<PodUri>>,
}

impl Notifier {
    /// Create a notifier hosting its listeners on the given executor.
    pub fn new(
        requestor: Arc<dyn Requestor>,
        background: Arc<Background>,
        read_cache: Arc<ReadCache>,
    ) -> Self {
        Self {
            requestor,
            background,
            read_cache,
            subscribed: Mutex::new(HashSet::new()),
        }
    }

    /// Subscribe to change notifications for a resource, best-effort.
    /// Repeated subscriptions for the same uri are no-ops.
    pub fn subscribe(&self, uri: &PodUri) {
        {
            let mut subscribed = self.subscribed.lock().expect("subscription lock poisoned");
            if !subscribed.insert(uri.clone()) {
                return;
            }
        }

        if let Err(e) = self.try_subscribe(uri) {
            debug!(resource_url = %uri, error = %e, "Unable to set up notification");
        }
    }

    fn try_subscribe(&self, uri: &PodUri) -> Result<(), HttpError> {
        let body = serde_json::json!({ "topic": uri.as_str() })
            .to_string()
            .into_bytes();
        let mut headers = http::HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let response =
            self.requestor
                .request(Method::POST, SUBSCRIPTION_ENDPOINT, headers, Some(body))?;
        let info: TopicSubscriptionInfo = response
            .json()
            .map_err(|e| HttpError::transport(format!("invalid subscription response: {e}")))?;

        debug!(resource_url = %uri, endpoint = %info.endpoint, "Listening for notifications");
        self.background.spawn(listen(
            info,
            uri.clone(),
            Arc::clone(&self.read_cache),
        ));
        Ok(())
    }
}

/// Listen for notifications about `topic`, reconnecting until the
/// process exits.
async fn listen(info: TopicSubscriptionInfo, topic: PodUri, read_cache: Arc<ReadCache>) {
    let endpoint: Uri = match info.endpoint.parse() {
        Ok(endpoint) => endpoint,
        Err(e) => {
            warn!(endpoint = %info.endpoint, error = %e, "Invalid notification endpoint");
            return;
        }
    };

    loop {
        let request = ClientRequestBuilder::new(endpoint.clone())
            .with_sub_protocol(info.subprotocol.clone());
        match connect_async(request).await {
            Ok((stream, _)) => {
                if let Err(e) = listen_once(stream, &topic, &read_cache).await {
                    debug!(resource_url = %topic, error = %e, "Notification connection lost");
                }
            }
            Err(e) => debug!(resource_url = %topic, error = %e, "Unable to connect for notifications"),
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn listen_once(
    mut stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    topic: &PodUri,
    read_cache: &ReadCache,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let mut ping = tokio::time::interval_at(
        tokio::time::Instant::now() + PING_INTERVAL,
        PING_INTERVAL,
    );

    loop {
        tokio::select! {
            _ = ping.tick() => stream.send(Message::Ping(Vec::new())).await?,
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => handle_message(topic, read_cache, &text),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            },
        }
    }
}

fn handle_message(topic: &PodUri, read_cache: &ReadCache, message: &str) {
    match parse_activity(topic, message) {
        Ok(Some(Activity::Update)) => {
            info!(resource_url = %topic, "Resource changed remotely, dropping cached content");
            read_cache.invalidate(topic);
        }
        Ok(Some(Activity::Delete)) => {
            info!(resource_url = %topic, "Resource removed remotely, dropping cached content");
            read_cache.invalidate(topic);
        }
        Ok(None) => {}
        Err(e) => warn!(ws_message = message, error = %e, "Could not parse message"),
    }
}
