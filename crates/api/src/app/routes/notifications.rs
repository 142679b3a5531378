use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use shopdesk_auth::permissions;
use shopdesk_core::NotificationId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/:id/read", post(mark_read))
}

/// GET /notifications?unread=true
pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ListNotificationsQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::NOTIFICATIONS_READ) {
        return resp;
    }

    match services
        .repo
        .list_notifications(tenant.tenant_id(), query.unread)
        .await
    {
        Ok(notifications) => {
            let items = notifications
                .into_iter()
                .map(dto::notification_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&tenant, &principal, &permissions::NOTIFICATIONS_UPDATE) {
        return resp;
    }
    let notification_id: NotificationId = match dto::parse_id(&id, "notification") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .repo
        .mark_notification_read(tenant.tenant_id(), notification_id)
        .await
    {
        Ok(n) => (StatusCode::OK, Json(dto::notification_to_json(n))).into_response(),
        Err(e) => errors::repo_error_to_response(e),
    }
}
