use super::ApiJson;
use crate::{
    auth::{generate_reset_token, hash_reset_token, AuthService, AuthUser, RESET_TOKEN_TTL_MINUTES},
    models::{
        DataResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
        Role, TokenResponse, UpdateDetailsRequest, UpdatePasswordRequest, User, UserProfile,
    },
    state::AppState,
    utils::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{Duration, Utc};
use mongodb::{
    bson::{self, doc, oid::ObjectId, DateTime},
    options::ReturnDocument,
};
use validator::Validate;

fn token_response(auth_service: &AuthService, user_id: ObjectId) -> ApiResult<Json<TokenResponse>> {
    let (token, expires_at) = auth_service.issue_token(user_id)?;
    Ok(Json(TokenResponse {
        success: true,
        token,
        expires_at,
    }))
}

/// Create an account and sign the new user in
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let request = request.normalized();
    request.validate()?;

    let mut user = User {
        id: None,
        name: request.name.unwrap_or_default(),
        email: request.email.unwrap_or_default(),
        role: request.role.unwrap_or(Role::User),
        password: state
            .auth_service
            .hash_password(&request.password.unwrap_or_default())?,
        reset_password_token: None,
        reset_password_expire: None,
        created_at: DateTime::now(),
    };
    let result = state.db.users().insert_one(&user).await?;
    user.id = result.inserted_id.as_object_id();

    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal_error("Failed to register user"))?;
    tracing::info!(user = %user_id, role = user.role.as_str(), "User registered");

    token_response(&state.auth_service, user_id)
}

/// Handle user login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let (Some(email), Some(password)) = (
        request.email.filter(|e| !e.trim().is_empty()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Please provide an email and password"));
    };

    let user = state
        .auth_service
        .authenticate_user(&email, &password)
        .await?;
    let user_id = user
        .id
        .ok_or_else(|| ApiError::authentication_error("Invalid credentials"))?;

    tracing::debug!(user = %user_id, "User logged in");
    token_response(&state.auth_service, user_id)
}

/// Get current user profile
pub async fn me(Extension(auth_user): Extension<AuthUser>) -> Json<DataResponse<UserProfile>> {
    Json(DataResponse::new(UserProfile::from(auth_user.user)))
}

pub async fn update_details(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(request): ApiJson<UpdateDetailsRequest>,
) -> ApiResult<Json<DataResponse<UserProfile>>> {
    let request = request.normalized();
    request.validate()?;

    let set = bson::to_document(&request)?;
    if set.is_empty() {
        return Ok(Json(DataResponse::new(UserProfile::from(auth_user.user))));
    }

    let user = state
        .db
        .users()
        .find_one_and_update(doc! { "_id": auth_user.id }, doc! { "$set": set })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(ApiError::not_authorized)?;

    Ok(Json(DataResponse::new(UserProfile::from(user))))
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ApiJson(request): ApiJson<UpdatePasswordRequest>,
) -> ApiResult<Json<TokenResponse>> {
    request.validate()?;

    let auth_service = &state.auth_service;
    if !auth_service.verify_password(&request.current_password, &auth_user.user.password) {
        return Err(ApiError::authentication_error("Password is incorrect"));
    }

    let password = auth_service.hash_password(&request.new_password)?;
    state
        .db
        .users()
        .update_one(
            doc! { "_id": auth_user.id },
            doc! { "$set": { "password": password } },
        )
        .await?;

    tracing::info!(user = %auth_user.id, "Password changed");
    token_response(auth_service, auth_user.id)
}

/// Issue a reset token. Delivery is by log line; there is no mailer.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<DataResponse<String>>> {
    let email = request.email.trim().to_lowercase();
    let user = state
        .db
        .users()
        .find_one(doc! { "email": email.as_str() })
        .await?
        .ok_or_else(|| ApiError::not_found_error("There is no user with that email"))?;
    let user_id = user
        .id
        .ok_or_else(|| ApiError::not_found_error("There is no user with that email"))?;

    let (token, hashed) = generate_reset_token();
    let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    state
        .db
        .users()
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": {
                "resetPasswordToken": hashed,
                "resetPasswordExpire": DateTime::from_millis(expires.timestamp_millis()),
            } },
        )
        .await?;

    let reset_url = format!(
        "{}/api/v1/auth/resetpassword/{}",
        state.config.server.public_url.trim_end_matches('/'),
        token
    );
    tracing::info!(user = %user_id, %reset_url, "Password reset requested");

    Ok(Json(DataResponse::new("Password reset token issued".to_string())))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user = state
        .db
        .users()
        .find_one(doc! {
            "resetPasswordToken": hash_reset_token(&reset_token),
            "resetPasswordExpire": { "$gt": DateTime::now() },
        })
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid token"))?;
    let user_id = user.id.ok_or_else(|| ApiError::bad_request("Invalid token"))?;

    request.validate()?;
    let password = state.auth_service.hash_password(&request.password)?;

    state
        .db
        .users()
        .update_one(
            doc! { "_id": user_id },
            doc! {
                "$set": { "password": password },
                "$unset": { "resetPasswordToken": "", "resetPasswordExpire": "" },
            },
        )
        .await?;

    tracing::info!(user = %user_id, "Password reset");
    token_response(&state.auth_service, user_id)
}
