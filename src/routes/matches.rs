use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;

use crate::core::Matcher;
use crate::error::MatchError;
use crate::models::{
    CandidatesQuery, CandidatesResponse, ErrorResponse, HealthResponse, MatchesQuery,
    MatchesResponse, SwipeAction, SwipeRequest,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matcher: Matcher,
}

/// Configure all matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/candidates", web::get().to(get_candidates))
        .route("/swipes", web::post().to(record_swipe))
        .route("/matches", web::get().to(get_matches));
}

/// Map an engine error onto the JSON error body and its HTTP status
pub fn error_response(err: &MatchError) -> HttpResponse {
    let status = StatusCode::from_u16(err.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::info!("Request rejected ({}): {}", err.kind(), err);
    }

    HttpResponse::build(status).json(ErrorResponse {
        error: err.kind().to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}

fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    error_response(&MatchError::Validation(errors.to_string()))
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.matcher.is_healthy().await { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Next page of candidates
///
/// GET /api/v1/candidates?userId={userId}&cursor={cursor}&limit={limit}
///
/// `nextCursor` is null once a page comes back empty.
async fn get_candidates(
    state: web::Data<AppState>,
    query: web::Query<CandidatesQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_failed(errors);
    }

    let limit = query.limit.map(usize::from);
    tracing::debug!("Fetching candidates for user: {}, limit: {:?}", query.user_id, limit);

    match state
        .matcher
        .candidates(&query.user_id, query.cursor.as_deref(), limit)
        .await
    {
        Ok(page) => {
            tracing::info!(
                "Returning {} candidates for user {}",
                page.candidates.len(),
                query.user_id
            );
            HttpResponse::Ok().json(CandidatesResponse {
                candidates: page.candidates,
                next_cursor: page.next_cursor,
            })
        }
        Err(e) => error_response(&e),
    }
}

/// Record a like or pass
///
/// POST /api/v1/swipes
///
/// Request body:
/// ```json
/// {
///   "actorId": "string",
///   "targetId": "string",
///   "action": "like|pass"
/// }
/// ```
async fn record_swipe(
    state: web::Data<AppState>,
    req: web::Json<SwipeRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let action = match req.action.parse::<SwipeAction>() {
        Ok(action) => action,
        Err(e) => return error_response(&e),
    };

    match state.matcher.swipe(&req.actor_id, &req.target_id, action).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => error_response(&e),
    }
}

/// A user's matches, most recent first
///
/// GET /api/v1/matches?userId={userId}
async fn get_matches(
    state: web::Data<AppState>,
    query: web::Query<MatchesQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_failed(errors);
    }

    match state.matcher.matches(&query.user_id).await {
        Ok(matches) => HttpResponse::Ok().json(MatchesResponse { matches }),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::StoreError;

    #[test]
    fn test_error_response_status() {
        let response = error_response(&MatchError::InvalidTarget);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = error_response(&MatchError::LocationRequired("a".into()));
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = error_response(&StoreError::Unavailable("down".into()).into());
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
