//! HTTP surface for account operations.
//!
//! Protected handlers take an [`AuthUser`], which runs token verification
//! before the handler body. Handlers without it run unauthenticated.

use std::sync::Arc;

use auth::{AccountId, Claims};
use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request, State,
    },
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use error::{AppError, AuthError, ErrorResponse};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::models::{AccountSummary, AuthSession, ProfileUpdate};
use crate::repository::AccountRepository;
use crate::service::AccountService;

/// Build the `/api/users` router over a shared service.
pub fn router<R>(service: Arc<AccountService<R>>) -> Router
where
    R: AccountRepository + 'static,
{
    Router::new()
        .route("/api/users", get(list_users::<R>).post(register::<R>))
        .route("/api/users/login", post(login::<R>))
        .route("/api/users/me", get(current_user::<R>))
        .route(
            "/api/users/:id",
            get(get_user::<R>).put(update_user::<R>).delete(delete_user::<R>),
        )
        .route("/api/users/ban/:id", put(ban_user::<R>))
        .route("/api/users/unban/:id", put(unban_user::<R>))
        .with_state(service)
}

/// Error rendered as `ErrorResponse` JSON.
#[derive(Debug)]
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let err = match &rejection {
            JsonRejection::JsonDataError(e) => {
                let detail = e.body_text();
                tracing::debug!("Rejected request body: {}", detail);
                let field = rejected_field(&detail).unwrap_or("body");
                AppError::validation(field, format!("{field} has an invalid value"))
            }
            JsonRejection::JsonSyntaxError(_) => {
                AppError::validation("body", "Request body is not valid JSON")
            }
            JsonRejection::MissingJsonContentType(_) => {
                AppError::validation("body", "Expected Content-Type: application/json")
            }
            _ => AppError::validation("body", "Request body could not be read"),
        };
        Self(err)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Rejected path: {}", rejection.body_text());
        Self(AppError::validation("id", "id must be an integer"))
    }
}

/// Field path from a serde data error such as
/// `"...into the target type: username: invalid type: null, ..."`.
fn rejected_field(detail: &str) -> Option<&str> {
    let (_, rest) = detail.split_once("target type: ")?;
    let (path, _) = rest.split_once(": ")?;
    (!path.is_empty() && !path.contains(' ')).then_some(path)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

/// Verified caller identity.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl<R> FromRequestParts<Arc<AccountService<R>>> for AuthUser
where
    R: AccountRepository + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        service: &Arc<AccountService<R>>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(&parts.headers)?;
        Ok(AuthUser(service.authenticate(token)?))
    }
}

/// JSON body whose rejections render as [`ApiError`].
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Path parameters whose rejections render as [`ApiError`].
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Token from `Authorization: Bearer <token>`; the scheme is case-insensitive.
fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::Unauthenticated)?
        .to_str()
        .map_err(|_| AuthError::Unauthenticated)?;

    let (scheme, token) = header
        .trim_start()
        .split_once(' ')
        .ok_or(AuthError::Unauthenticated)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Unauthenticated);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::Unauthenticated);
    }
    Ok(token)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub user_id: Option<i64>,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub message: String,
    pub user: AccountSummary,
    pub token: String,
}

impl SessionResponse {
    fn new(message: &str, session: AuthSession) -> Self {
        Self {
            message: message.to_string(),
            user: session.user,
            token: session.token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub message: String,
    pub user: AccountSummary,
}

type ApiResult<T> = Result<T, ApiError>;

async fn list_users<R: AccountRepository>(
    State(service): State<Arc<AccountService<R>>>,
) -> ApiResult<Json<Vec<AccountSummary>>> {
    Ok(Json(service.list_accounts().await?))
}

async fn get_user<R: AccountRepository>(
    State(service): State<Arc<AccountService<R>>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<AccountSummary>> {
    Ok(Json(service.get_account(AccountId(id)).await?))
}

async fn current_user<R: AccountRepository>(
    State(service): State<Arc<AccountService<R>>>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<AccountSummary>> {
    Ok(Json(service.current_account(&claims).await?))
}

async fn register<R: AccountRepository>(
    State(service): State<Arc<AccountService<R>>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = service
        .register(&req.username, &req.email, &req.password)
        .await?;
    Ok(Json(SessionResponse::new("Registration successful", session)))
}

async fn login<R: AccountRepository>(
    State(service): State<Arc<AccountService<R>>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = service.login(&req.username, &req.password).await?;
    Ok(Json(SessionResponse::new("Login successful", session)))
}

async fn update_user<R: AccountRepository>(
    State(service): State<Arc<AccountService<R>>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<AccountResponse>> {
    if req.user_id.is_some_and(|body_id| body_id != id) {
        return Err(AppError::validation("userId", "userId does not match the URL id").into());
    }

    let update = ProfileUpdate {
        username: req.username,
        email: req.email,
        avatar_url: req.avatar_url,
        password: req.password,
    };
    let user = service.update_profile(&claims, AccountId(id), update).await?;
    Ok(Json(AccountResponse {
        message: "Profile updated".to_string(),
        user,
    }))
}

async fn delete_user<R: AccountRepository>(
    State(service): State<Arc<AccountService<R>>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    service.delete_account(&claims, AccountId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn ban_user<R: AccountRepository>(
    State(service): State<Arc<AccountService<R>>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<AccountResponse>> {
    let user = service.ban(&claims, AccountId(id)).await?;
    Ok(Json(AccountResponse {
        message: "User banned".to_string(),
        user,
    }))
}

async fn unban_user<R: AccountRepository>(
    State(service): State<Arc<AccountService<R>>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<AccountResponse>> {
    let user = service.unban(&claims, AccountId(id)).await?;
    Ok(Json(AccountResponse {
        message: "User unbanned".to_string(),
        user,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("BEARER  abc.def.ghi ")), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("Bearerabc.def.ghi")), Err(AuthError::Unauthenticated));
        assert_eq!(extract_bearer(&headers("Bearer   ")), Err(AuthError::Unauthenticated));
        assert_eq!(extract_bearer(&headers("Basic dXNlcg==")), Err(AuthError::Unauthenticated));
        assert_eq!(extract_bearer(&HeaderMap::new()), Err(AuthError::Unauthenticated));
    }

    #[test]
    fn test_rejected_field() {
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: username: \
                 invalid type: null, expected a string at line 1 column 17"
            ),
            Some("username")
        );
        assert_eq!(
            rejected_field("Failed to deserialize the JSON body into the target type: expected value"),
            None
        );
        assert_eq!(rejected_field("Expected request with `Content-Type: application/json`"), None);
    }

    #[test]
    fn test_error_statuses() {
        let cases = [
            (AppError::from(AuthError::Unauthenticated), StatusCode::UNAUTHORIZED),
            (AppError::from(AuthError::BadPassword), StatusCode::UNAUTHORIZED),
            (AppError::from(AuthError::Forbidden), StatusCode::FORBIDDEN),
            (AppError::from(AuthError::Banned), StatusCode::FORBIDDEN),
            (AppError::DuplicateUsername, StatusCode::BAD_REQUEST),
            (AppError::NotFound("Account".into()), StatusCode::NOT_FOUND),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }
}
