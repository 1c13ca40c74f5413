use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::error::{AppError, AppResult};
use crate::services::auth::caregiver_from_token;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(subscribe))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// EventSource cannot set headers, so the token may ride the query string.
    pub token: Option<String>,
}

/// Server-Sent Events stream of change notifications for the caller's
/// circle. Events carry only `{table, op, patient_id}`; clients re-fetch
/// whatever the event invalidates.
async fn subscribe(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
    headers: HeaderMap,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let bearer = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| v.to_ascii_lowercase().starts_with("bearer "))
        .map(|v| v[7..].trim().to_string());

    let token = bearer
        .or(query.token)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let caregiver = caregiver_from_token(&state.db, &token, &state.config.jwt).await?;
    let patient_id = caregiver.patient_id;
    let receiver = state.feed.subscribe();

    tracing::debug!(
        "Caregiver {} subscribed to change feed for circle {}",
        caregiver.id,
        patient_id
    );

    let stream = futures::stream::unfold(
        (receiver, patient_id),
        |(mut receiver, patient_id)| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) if event.patient_id == patient_id => {
                        let data = match serde_json::to_string(&event) {
                            Ok(data) => data,
                            Err(_) => continue,
                        };
                        let sse_event = Event::default().event("change").data(data);
                        return Some((Ok(sse_event), (receiver, patient_id)));
                    }
                    // Other circles' events are not ours to see.
                    Ok(_) => continue,
                    // A lagged subscriber missed events; clients re-fetch on
                    // every event anyway, so just keep going.
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return None,
                }
            }
        },
    );

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::{request, setup_state, signup_admin};
    use crate::services::feed::{ChangeOp, ChangeTable};
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn subscription_requires_a_token() {
        let state = setup_state().await;
        let app = crate::router(state.clone());

        let response = request(&app, "GET", "/api/events", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bogus = request(&app, "GET", "/api/events?token=not-a-jwt", None, None).await;
        assert_eq!(bogus.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn stream_carries_only_the_callers_circle() {
        let state = setup_state().await;
        let app = crate::router(state.clone());

        let (_, _, other_patient) = signup_admin(&app, "elsewhere@example.com").await;
        let (token, _, patient_id) = signup_admin(&app, "admin@example.com").await;

        let response = request(&app, "GET", "/api/events", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        // The subscription exists once the handler has returned, so both
        // events below are buffered for it. The first is another circle's
        // and must be skipped, not delivered.
        state
            .feed
            .publish(ChangeTable::Messages, ChangeOp::Insert, &other_patient);
        state
            .feed
            .publish(ChangeTable::BmLogs, ChangeOp::Insert, &patient_id);

        let mut body = response.into_body();
        let frame = body.frame().await.unwrap().unwrap();
        let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
        assert!(text.contains("bm_logs"));
        assert!(text.contains(&patient_id));
        assert!(!text.contains(&other_patient));
    }
}
