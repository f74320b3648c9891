//! HTTP handlers
//!
//! Appliance handlers all follow the same cycle: load the session's oven,
//! apply one operation at the current instant, save it back, answer.

use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

use oven_core::appliance::{ApplianceError, ApplianceState};
use oven_core::protocol::{
    AddProgramRequest, LoginRequest, LoginResponse, ProgramAddedResponse, ProgramListResponse, ResponseStatus,
    StartRequest,
};
use oven_core::{Claims, OvenResponse};

use crate::error::ApiError;
use crate::middleware::SessionId;
use crate::state::SharedState;

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "oven-server"
    }))
}

/// Exchange credentials for a token
pub async fn login_handler(
    State(state): State<SharedState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> impl IntoResponse {
    // An unreadable body is treated like one with no fields
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            tracing::debug!("Unreadable login body: {}", rejection.body_text());
            LoginRequest::default()
        }
    };

    let (Some(username), Some(password)) = (req.username, req.password) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Username and password are required" })),
        )
            .into_response();
    };

    // Argon2 verification blocks; run it off the async workers.
    let auth_state = state.clone();
    let user = username.clone();
    let token = match tokio::task::spawn_blocking(move || auth_state.auth.login(&user, &password)).await {
        Ok(token) => token,
        Err(e) => {
            return ApiError::Internal(format!("login task failed: {}", e)).into_response();
        }
    };

    match token {
        Some(token) => {
            tracing::info!("User {} logged in", username);
            (
                StatusCode::OK,
                Json(LoginResponse {
                    success: true,
                    token: Some(token),
                    message: "Login successful".to_string(),
                }),
            )
                .into_response()
        }
        None => {
            tracing::warn!("Failed login attempt for {}", username);
            (
                StatusCode::UNAUTHORIZED,
                Json(LoginResponse {
                    success: false,
                    token: None,
                    message: "Invalid credentials".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Tokens are self-contained; logging out means the client drops its token
pub async fn logout_handler() -> Json<OvenResponse> {
    Json(OvenResponse::success("Log out by discarding the token on the client"))
}

/// Start a manual cycle or a catalog program
pub async fn start_handler(
    State(state): State<SharedState>,
    Extension(SessionId(session)): Extension<SessionId>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<OvenResponse>, ApiError> {
    let Json(req) = body?;
    let (time, power, predefined, message) = match req.program_id {
        Some(id) => {
            let program = state.catalog.get(id)?;
            (program.time, program.power, true, format!("Program {} started", program.name))
        }
        None => (req.time_secs(), req.power_level(), false, "Heating started".to_string()),
    };

    let response = with_oven(&state, &session, |oven, now| {
        oven.start(time, power, predefined, now)
            .map(|started| OvenResponse::started(started, message))
    })?;

    tracing::info!("{} started {}s at power {} (session {})", claims.sub, time, power, session);
    Ok(Json(response))
}

/// Start 30 s at full power, or add 30 s to the running cycle
pub async fn quick_start_handler(
    State(state): State<SharedState>,
    Extension(SessionId(session)): Extension<SessionId>,
) -> Result<Json<OvenResponse>, ApiError> {
    let response = with_oven(&state, &session, |oven, now| {
        oven.quick_start(now)
            .map(|started| OvenResponse::started(started, "Quick start"))
    })?;
    Ok(Json(response))
}

pub async fn pause_handler(
    State(state): State<SharedState>,
    Extension(SessionId(session)): Extension<SessionId>,
) -> Result<Json<OvenResponse>, ApiError> {
    let response = with_oven(&state, &session, |oven, now| oven.pause(now).map(OvenResponse::paused))?;
    Ok(Json(response))
}

pub async fn resume_handler(
    State(state): State<SharedState>,
    Extension(SessionId(session)): Extension<SessionId>,
) -> Result<Json<OvenResponse>, ApiError> {
    let response = with_oven(&state, &session, |oven, now| oven.resume(now).map(OvenResponse::resumed))?;
    Ok(Json(response))
}

pub async fn cancel_handler(
    State(state): State<SharedState>,
    Extension(SessionId(session)): Extension<SessionId>,
) -> Result<Json<OvenResponse>, ApiError> {
    let response = with_oven(&state, &session, |oven, now| {
        oven.cancel(now).map(|()| OvenResponse::success("Heating cancelled"))
    })?;
    Ok(Json(response))
}

pub async fn status_handler(
    State(state): State<SharedState>,
    Extension(SessionId(session)): Extension<SessionId>,
) -> Result<Json<OvenResponse>, ApiError> {
    let response = with_oven(&state, &session, |oven, now| Ok(oven.status(now).into()))?;
    Ok(Json(response))
}

pub async fn list_programs_handler(State(state): State<SharedState>) -> Result<Json<ProgramListResponse>, ApiError> {
    let programs = state.catalog.list()?;
    Ok(Json(ProgramListResponse {
        status: ResponseStatus::Success,
        programs,
    }))
}

pub async fn add_program_handler(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<AddProgramRequest>, JsonRejection>,
) -> Result<Json<ProgramAddedResponse>, ApiError> {
    let Json(req) = body?;
    let program = state.catalog.add(req.into())?;
    tracing::info!("{} added program {}", claims.sub, program.id);
    Ok(Json(ProgramAddedResponse {
        status: ResponseStatus::Success,
        program,
    }))
}

pub async fn remove_program_handler(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<u32>, PathRejection>,
) -> Result<Json<OvenResponse>, ApiError> {
    let Path(id) = path?;
    state.catalog.remove(id)?;
    tracing::info!("{} removed program {}", claims.sub, id);
    Ok(Json(OvenResponse::success(format!("Program {} removed", id))))
}

/// Load the session's oven, run `op`, save the oven whatever the outcome.
///
/// State refusals become an in-band error payload; validation failures
/// become a 400.
fn with_oven<F>(state: &SharedState, session: &str, op: F) -> Result<OvenResponse, ApiError>
where
    F: FnOnce(&mut ApplianceState, i64) -> Result<OvenResponse, ApplianceError>,
{
    let now = state.now();
    let mut oven = state.store.load(session, now);
    let result = op(&mut oven, now);
    state.store.save(session, oven, now);

    match result {
        Ok(response) => Ok(response),
        Err(ApplianceError::State(e)) => Ok(OvenResponse::error(e.to_string())),
        Err(ApplianceError::Validation(e)) => Err(e.into()),
    }
}
