//! Per-browser session context
//!
//! Each browser gets its own last image and last prediction, keyed by a
//! random id carried in the `snapclass_session` cookie.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use snapclass_common::config::SessionConfig;
use snapclass_common::Prediction;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "snapclass_session";

/// Preview of the last submitted image, PNG-encoded
#[derive(Debug, Clone)]
pub struct StoredImage {
    png: Arc<[u8]>,
}

impl StoredImage {
    pub fn from_png(png: Vec<u8>) -> Self {
        Self { png: png.into() }
    }

    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub last_image: Option<StoredImage>,
    pub last_prediction: Option<Prediction>,
    pub last_seen: DateTime<Utc>,
}

impl SessionContext {
    fn new() -> Self {
        Self {
            last_image: None,
            last_prediction: None,
            last_seen: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, SessionContext>>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            max_sessions: config.max_sessions.max(1),
        }
    }

    /// Snapshot of a session, refreshing its idle timer
    pub async fn get(&self, id: Uuid) -> Option<SessionContext> {
        let mut sessions = self.inner.write().await;
        self.prune_idle(&mut sessions);
        sessions.get_mut(&id).map(|ctx| {
            ctx.last_seen = Utc::now();
            ctx.clone()
        })
    }

    /// Replace the session's image and prediction with a new submission
    pub async fn record(&self, id: Uuid, image: StoredImage, prediction: Prediction) {
        let mut sessions = self.inner.write().await;
        self.prune_idle(&mut sessions);

        if !sessions.contains_key(&id) && sessions.len() >= self.max_sessions {
            evict_oldest(&mut sessions);
        }

        let ctx = sessions.entry(id).or_insert_with(SessionContext::new);
        ctx.last_image = Some(image);
        ctx.last_prediction = Some(prediction);
        ctx.last_seen = Utc::now();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn prune_idle(&self, sessions: &mut HashMap<Uuid, SessionContext>) {
        let Ok(timeout) = chrono::Duration::from_std(self.idle_timeout) else {
            return;
        };
        let cutoff = Utc::now() - timeout;
        let before = sessions.len();
        sessions.retain(|_, ctx| ctx.last_seen >= cutoff);
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!("Pruned {} idle sessions", pruned);
        }
    }
}

fn evict_oldest(sessions: &mut HashMap<Uuid, SessionContext>) {
    let oldest = sessions
        .iter()
        .min_by_key(|(_, ctx)| ctx.last_seen)
        .map(|(id, _)| *id);
    if let Some(id) = oldest {
        sessions.remove(&id);
        debug!("Evicted session {} (store full)", id);
    }
}

/// Session id from the request's `Cookie` headers, if present and well-formed
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// `Set-Cookie` value for a session id
pub fn session_cookie(id: Uuid) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn prediction(label: &str, index: usize) -> Prediction {
        let mut probabilities = vec![0.0; 3];
        probabilities[index] = 1.0;
        Prediction {
            label: label.to_string(),
            index,
            probabilities,
        }
    }

    fn image() -> StoredImage {
        StoredImage::from_png(vec![1, 2, 3])
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::new(&SessionConfig::default());
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store.record(alice, image(), prediction("A", 0)).await;
        store.record(bob, image(), prediction("C", 2)).await;

        let a = store.get(alice).await.unwrap();
        let b = store.get(bob).await.unwrap();
        assert_eq!(a.last_prediction.unwrap().label, "A");
        assert_eq!(b.last_prediction.unwrap().label, "C");
    }

    #[tokio::test]
    async fn test_new_submission_replaces_previous() {
        let store = SessionStore::new(&SessionConfig::default());
        let id = Uuid::new_v4();

        store.record(id, image(), prediction("A", 0)).await;
        store
            .record(id, StoredImage::from_png(vec![9]), prediction("B", 1))
            .await;

        let ctx = store.get(id).await.unwrap();
        assert_eq!(ctx.last_prediction.unwrap().label, "B");
        assert_eq!(
            ctx.last_image.unwrap().data_uri(),
            format!("data:image/png;base64,{}", STANDARD.encode([9u8]))
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let store = SessionStore::new(&SessionConfig::default());
        assert!(store.get(Uuid::new_v4()).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let store = SessionStore::new(&SessionConfig {
            idle_timeout_secs: 3600,
            max_sessions: 2,
        });
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let third = Uuid::new_v4();

        store.record(first, image(), prediction("A", 0)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.record(second, image(), prediction("B", 1)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.record(third, image(), prediction("C", 2)).await;

        assert_eq!(store.len().await, 2);
        assert!(store.get(first).await.is_none());
        assert!(store.get(third).await.is_some());
    }

    #[tokio::test]
    async fn test_idle_sessions_pruned() {
        let store = SessionStore::new(&SessionConfig {
            idle_timeout_secs: 0,
            max_sessions: 16,
        });
        let id = Uuid::new_v4();
        store.record(id, image(), prediction("A", 0)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(store.get(id).await.is_none());
    }

    #[test]
    fn test_cookie_parsing() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; snapclass_session={}", id)).unwrap(),
        );
        assert_eq!(session_id_from_headers(&headers), Some(id));
    }

    #[test]
    fn test_malformed_cookie_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("snapclass_session=not-a-uuid"),
        );
        assert_eq!(session_id_from_headers(&headers), None);
        assert_eq!(session_id_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let id = Uuid::nil();
        assert_eq!(
            session_cookie(id),
            "snapclass_session=00000000-0000-0000-0000-000000000000; Path=/; HttpOnly; SameSite=Lax"
        );
    }
}
