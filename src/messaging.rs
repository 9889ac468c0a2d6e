//! Request/response boundary between the locator and its presentation layer.
//!
//! Every request gets exactly one reply. Failures inside the locate pipeline,
//! including panics, are logged and reported through the `error` field instead of
//! escaping to the caller.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::locator::{VideoLocator, VideoRecord};
use crate::LocatorError;

/// Incoming message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetVideos,
    #[serde(rename_all = "camelCase")]
    NavigateToVideo { video_url: String },
    #[serde(rename_all = "camelCase")]
    FocusVideo { video_index: usize },
}

/// Outgoing reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Videos {
        videos: Vec<VideoRecord>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Ack {
        success: bool,
    },
}

impl Response {
    pub fn videos(videos: Vec<VideoRecord>) -> Self {
        Response::Videos { videos, error: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Response::Videos {
            videos: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn ack() -> Self {
        Response::Ack { success: true }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Response::Videos { error, .. } => error.as_deref(),
            Response::Ack { .. } => None,
        }
    }
}

/// Dispatches requests to a [`VideoLocator`].
#[derive(Clone)]
pub struct MessageHandler {
    locator: Arc<VideoLocator>,
}

impl MessageHandler {
    pub fn new(locator: Arc<VideoLocator>) -> Self {
        Self { locator }
    }

    /// Handle one request. Never fails.
    pub async fn handle(&self, request: Request) -> Response {
        debug!("📨 Handling {:?}", request);
        match AssertUnwindSafe(self.dispatch(request)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                let e = LocatorError::Panicked(panic_message(&*panic));
                error!("Content handler error: {}", e);
                Response::failure(e.to_string())
            }
        }
    }

    /// Handle a raw JSON message and return the JSON reply.
    ///
    /// Malformed or unknown messages still get a reply carrying an error.
    pub async fn handle_json(&self, raw: &str) -> String {
        let response = match serde_json::from_str::<Request>(raw) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                let e = LocatorError::from(e);
                error!("Rejected message {}: {}", raw, e);
                Response::failure(e.to_string())
            }
        };

        serde_json::to_string(&response).unwrap_or_else(|e| {
            error!("Failed to encode response: {}", e);
            r#"{"videos":[],"error":"failed to encode response"}"#.to_string()
        })
    }

    async fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::GetVideos => match self.locator.locate().await {
                Ok(videos) => Response::videos(videos),
                Err(e) => {
                    error!("Video detection failed: {}", e);
                    Response::failure(e.to_string())
                }
            },
            Request::NavigateToVideo { video_url } => {
                self.locator.navigate(&video_url);
                Response::ack()
            }
            Request::FocusVideo { video_index } => {
                self.locator.focus(video_index);
                Response::ack()
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let request: Request = serde_json::from_value(json!({"action": "getVideos"})).unwrap();
        assert_eq!(request, Request::GetVideos);

        let request: Request =
            serde_json::from_value(json!({"action": "navigateToVideo", "videoUrl": "https://x.test/"})).unwrap();
        assert_eq!(
            request,
            Request::NavigateToVideo {
                video_url: "https://x.test/".to_string()
            }
        );

        let request: Request = serde_json::from_value(json!({"action": "focusVideo", "videoIndex": 3})).unwrap();
        assert_eq!(request, Request::FocusVideo { video_index: 3 });

        assert!(serde_json::from_value::<Request>(json!({"action": "selfDestruct"})).is_err());
    }

    #[test]
    fn test_response_wire_format() {
        assert_eq!(serde_json::to_value(Response::ack()).unwrap(), json!({"success": true}));
        assert_eq!(serde_json::to_value(Response::videos(Vec::new())).unwrap(), json!({"videos": []}));
        assert_eq!(
            serde_json::to_value(Response::failure("boom")).unwrap(),
            json!({"videos": [], "error": "boom"})
        );
    }

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }
}
