use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, verify_password};
use crate::config::Config;
use crate::db::is_unique_violation;
use crate::error::ApiError;
use crate::model::user::User;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[schema(example = "user@example.com", format = "email")]
    pub email: String,
    #[schema(example = "s3cret!", format = "password")]
    pub password: String,
    #[schema(example = "John Doe")]
    pub full_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "user@example.com", format = "email")]
    pub email: String,
    #[schema(format = "password")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserPublic,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub created_at: Option<String>,
}

fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("A valid email is required".to_string()));
    }
    Ok(email)
}

fn token_response(
    user_id: u64,
    email: String,
    full_name: String,
    config: &Config,
) -> Result<TokenResponse, ApiError> {
    let access_token =
        generate_access_token(user_id, email.clone(), &config.jwt_secret, config.access_token_ttl)
            .map_err(|e| {
                error!(error = %e, "Failed to sign access token");
                ApiError::Internal
            })?;

    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: UserPublic {
            id: user_id.to_string(),
            email,
            full_name,
        },
    })
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered", body = TokenResponse),
        (status = 400, description = "Missing or malformed fields"),
        (status = 409, description = "Email already registered"),
        (status = 503, description = "Database not connected")
    ),
    tag = "Auth"
)]
pub async fn signup(
    payload: web::Json<SignupRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let email = normalize_email(&payload.email)?;
    let full_name = payload.full_name.trim().to_string();

    if full_name.is_empty() {
        return Err(ApiError::Validation("Full Name is required".to_string()));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ApiError::Internal
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password, full_name)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&email)
    .bind(&hashed)
    .bind(&full_name)
    .execute(pool.get_ref())
    .await;

    let result = match result {
        Ok(r) => r,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let response = token_response(result.last_insert_id(), email, full_name, &config)?;
    Ok(HttpResponse::Created().json(response))
}

/// Login and get an access token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Incorrect email or password"),
        (status = 503, description = "Database not connected")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, payload), fields(email = %payload.email))]
pub async fn login(
    payload: web::Json<LoginRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    let email = normalize_email(&payload.email)?;

    debug!("Fetching user from database");
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password, full_name, created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?;

    let Some(user) = user else {
        info!("Invalid credentials: user not found");
        return Err(ApiError::Unauthorized(
            "Incorrect email or password".to_string(),
        ));
    };

    if verify_password(&payload.password, &user.password).is_err() {
        info!("Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized(
            "Incorrect email or password".to_string(),
        ));
    }

    info!("Login successful");
    let response = token_response(user.id, user.email, user.full_name, &config)?;
    Ok(HttpResponse::Ok().json(response))
}

/// Current authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found"),
        (status = 503, description = "Database not connected")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password, full_name, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(pool.get_ref())
    .await?;

    let Some(user) = user else {
        return Err(ApiError::NotFound("User not found".to_string()));
    };

    Ok(HttpResponse::Ok().json(UserResponse {
        id: user.id.to_string(),
        email: user.email,
        full_name: user.full_name,
        created_at: Some(user.created_at.format("%Y-%m-%dT%H:%M:%S").to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  User@Example.COM ").unwrap(),
            "user@example.com"
        );
        assert!(matches!(
            normalize_email("not-an-email"),
            Err(ApiError::Validation(_))
        ));
    }
}
