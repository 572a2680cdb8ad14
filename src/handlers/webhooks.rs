use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::{errors::ServiceError, services::webhook::WebhookDisposition, AppState};

/// Query-parameter form of a provider notification (the legacy IPN
/// style); the JSON-body form is parsed separately.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookParams {
    pub topic: Option<String>,
    pub id: Option<String>,
}

// POST /webhook
pub async fn payment_webhook(
    State(state): State<AppState>,
    Query(params): Query<WebhookParams>,
    body: Option<Json<Value>>,
) -> Result<(StatusCode, &'static str), ServiceError> {
    let notification = extract_notification(&params, body.as_ref().map(|Json(v)| v));
    let (kind, resource_id) = notification.ok_or_else(|| {
        warn!("webhook without identifiable resource type or id");
        ServiceError::BadRequest("Missing identifiable resource type or ID".to_string())
    })?;

    let disposition = state
        .services
        .webhooks
        .process_notification(&kind, &resource_id)
        .await?;

    let body = match disposition {
        WebhookDisposition::OrderUpdated => "payment webhook processed and order updated",
        WebhookDisposition::AlreadyProcessed => "webhook processed previously",
        WebhookDisposition::RetryLater => "payment details unavailable; provider should retry",
        WebhookDisposition::Ignored => "notification received",
    };
    Ok((StatusCode::OK, body))
}

/// Pulls `(type, resource_id)` out of either the query string
/// (`topic` + `id`) or the JSON body (`type` + `data.id`). The query
/// form wins when both are present.
fn extract_notification(params: &WebhookParams, body: Option<&Value>) -> Option<(String, String)> {
    if let (Some(topic), Some(id)) = (params.topic.as_deref(), params.id.as_deref()) {
        if !topic.is_empty() && !id.is_empty() {
            return Some((topic.to_string(), id.to_string()));
        }
    }

    let body = body?;
    let kind = body.get("type").and_then(Value::as_str)?;
    let id = body.pointer("/data/id").and_then(|raw| match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })?;
    Some((kind.to_string(), id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_parameters_take_precedence() {
        let params = WebhookParams {
            topic: Some("payment".into()),
            id: Some("42".into()),
        };
        let body = json!({"type": "merchant_order", "data": {"id": "99"}});
        assert_eq!(
            extract_notification(&params, Some(&body)),
            Some(("payment".into(), "42".into()))
        );
    }

    #[test]
    fn body_form_is_used_when_query_is_absent() {
        let params = WebhookParams::default();
        let body = json!({"type": "payment", "data": {"id": 123}});
        assert_eq!(
            extract_notification(&params, Some(&body)),
            Some(("payment".into(), "123".into()))
        );
    }

    #[test]
    fn unidentifiable_notifications_yield_none() {
        let params = WebhookParams::default();
        assert_eq!(extract_notification(&params, None), None);

        let body = json!({"action": "payment.updated"});
        assert_eq!(extract_notification(&params, Some(&body)), None);

        let body = json!({"type": "payment"});
        assert_eq!(extract_notification(&params, Some(&body)), None);
    }
}
