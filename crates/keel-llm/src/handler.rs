//! Axum route handlers for the OpenAI-compatible endpoints

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router, routing};
use futures_util::{Stream, StreamExt};
use keel_core::{HttpError, RequestContext};

use crate::backend::EventStream;
use crate::convert::openai::ChunkEncoder;
use crate::error::LlmError;
use crate::gateway::GatewayState;
use crate::protocol::openai::{
    OpenAiErrorDetail, OpenAiErrorResponse, OpenAiModel, OpenAiModelList, OpenAiRequest, OpenAiResponse,
};
use crate::types::{CompletionRequest, StreamEvent};

/// Chat routes, relative to the configured prefix
pub fn llm_router(state: GatewayState) -> Router {
    Router::new()
        .route("/chat/completions", routing::post(chat_completions))
        .route("/models", routing::get(list_models))
        .with_state(state)
}

/// Handle `POST {prefix}/chat/completions`
async fn chat_completions(
    State(state): State<GatewayState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<OpenAiRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(wire_request)) => CompletionRequest::try_from(wire_request),
        Err(rejection) => Err(LlmError::InvalidRequest(rejection.body_text())),
    };

    let request = match request {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    tracing::debug!(
        request_id = %context.request_id,
        model = %request.model,
        stream = request.stream,
        messages = request.messages.len(),
        "chat completion requested"
    );

    if request.stream {
        match state.complete_stream(request, context).await {
            Ok((model, stream)) => stream_response(stream, model).into_response(),
            Err(e) => error_response(&e),
        }
    } else {
        match state.complete(request, context).await {
            Ok(response) => Json(OpenAiResponse::from(response)).into_response(),
            Err(e) => error_response(&e),
        }
    }
}

/// Handle `GET {prefix}/models`
async fn list_models(State(state): State<GatewayState>) -> Response {
    let models = match state.list_models().await {
        Ok(models) => models,
        Err(e) => return error_response(&e),
    };

    let created = unix_now();
    let owned_by = state.backend().name().to_owned();

    let data = models
        .into_iter()
        .map(|id| OpenAiModel {
            id,
            object: "model".to_owned(),
            created,
            owned_by: owned_by.clone(),
        })
        .collect();

    Json(OpenAiModelList {
        object: "list".to_owned(),
        data,
    })
    .into_response()
}

/// Frame backend events as `chat.completion.chunk` server-sent events
///
/// A backend error mid-stream becomes an error event. `data: [DONE]` is
/// sent exactly once, whether or not the backend signalled the end.
fn stream_response(stream: EventStream, model: String) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let id = format!("chatcmpl-{}", uuid::Uuid::new_v4().simple());
    let mut encoder = ChunkEncoder::new(id, model, unix_now());

    let events = stream
        .take_while(|result| std::future::ready(!matches!(result, Ok(StreamEvent::Done))))
        .filter_map(move |result| {
            let event = match result {
                Ok(event) => encoder
                    .encode(&event)
                    .map(|chunk| Event::default().data(serde_json::to_string(&chunk).unwrap_or_default())),
                Err(e) => {
                    tracing::error!(error = %e, "backend stream failed");
                    let body = error_body(&LlmError::Streaming(e.to_string()));
                    Some(Event::default().data(serde_json::to_string(&body).unwrap_or_default()))
                }
            };
            std::future::ready(event.map(Ok))
        })
        .chain(futures_util::stream::once(std::future::ready(Ok(
            Event::default().data("[DONE]"),
        ))));

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn error_body(error: &LlmError) -> OpenAiErrorResponse {
    OpenAiErrorResponse {
        error: OpenAiErrorDetail {
            message: error.client_message(),
            error_type: error.error_type().to_owned(),
            code: None,
        },
    }
}

/// Convert an error to an `OpenAI`-style JSON error response
pub fn error_response(error: &LlmError) -> Response {
    (error.status_code(), Json(error_body(error))).into_response()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
