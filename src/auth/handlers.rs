use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::{header, HeaderValue},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthBody, LoginRequest, PublicUser, RefreshRequest, RegisterRequest,
            UpdateProfileRequest, UserBody,
        },
        jwt::{AuthUser, SessionKeys, TokenKind, SESSION_COOKIE},
        password,
        repo_types::{User, UserPatch},
    },
    envelope::{Empty, Envelope},
    error::{ApiError, StoreError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", get(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/update", put(update_profile))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn session_cookie(token: &str, max_age_secs: u64) -> Result<HeaderValue, ApiError> {
    let cookie = format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}");
    HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.into()))
}

/// Issues the token pair and the session cookie for a freshly authenticated user.
fn issue_session(
    state: &AppState,
    user: User,
) -> Result<(HeaderValue, AuthBody), ApiError> {
    let keys = SessionKeys::from_ref(state);
    let issue = |kind| keys.issue(user.id, kind).map_err(|e| ApiError::Internal(e.into()));
    let access_token = issue(TokenKind::Access)?;
    let refresh_token = issue(TokenKind::Refresh)?;
    let cookie = session_cookie(&access_token, keys.ttl(TokenKind::Access).as_secs())?;
    Ok((
        cookie,
        AuthBody {
            user: user.into(),
            access_token,
            refresh_token,
        },
    ))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();
    let name = payload.name.trim();

    if name.is_empty() {
        return Err(ApiError::validation("Please enter your name"));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }

    password::check_strength(&payload.password)?;
    let hash = password::hash(&payload.password)?;

    let user = match state.users.create(name, &payload.email, &hash).await {
        Ok(u) => u,
        Err(StoreError::Duplicate(_)) => {
            warn!(email = %payload.email, "email already registered");
            return Err(ApiError::conflict("User already exists"));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    let (cookie, body) = issue_session(&state, user)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Envelope::created(body).with_message("User registered successfully"),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(mut payload) = payload?;
    payload.email = payload.email.trim().to_lowercase();

    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::unauthenticated("Invalid email or password"));
    };

    if !password::matches(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthenticated("Invalid email or password"));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    let (cookie, body) = issue_session(&state, user)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Envelope::ok(body).with_message("Logged in successfully"),
    ))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let keys = SessionKeys::from_ref(&state);
    let claims = keys.decode(&payload.refresh_token, TokenKind::Refresh).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        ApiError::unauthenticated("Invalid or expired refresh token")
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("User not found"))?;

    let (cookie, body) = issue_session(&state, user)?;
    Ok(([(header::SET_COOKIE, cookie)], Envelope::ok(body)))
}

#[instrument]
pub async fn logout() -> Result<impl IntoResponse, ApiError> {
    let cookie = session_cookie("", 0)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Envelope::<Empty>::message("Logged out successfully"),
    ))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Envelope<UserBody>, ApiError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %user_id, "user not found");
            ApiError::unauthenticated("User not found")
        })?;

    Ok(Envelope::ok(UserBody {
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Envelope<UserBody>, ApiError> {
    let Json(payload) = payload?;

    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let password_hash = match payload.password {
        Some(p) => {
            password::check_strength(&p)?;
            Some(password::hash(&p)?)
        }
        None => None,
    };

    let user = state
        .users
        .update(user_id, UserPatch { name, password_hash })
        .await?
        .ok_or_else(|| ApiError::unauthenticated("User not found"))?;

    info!(user_id = %user.id, "profile updated");
    Ok(Envelope::ok(UserBody {
        user: PublicUser::from(user),
    })
    .with_message("Profile updated successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ann@example.com"));
        assert!(!is_valid_email("ann@example"));
        assert!(!is_valid_email("ann example@x.io"));
    }

    #[test]
    fn public_user_hides_password_hash() {
        let user = User {
            id: uuid::Uuid::new_v4(),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: time::OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("ann@example.com"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn logout_cookie_expires_immediately() {
        let cookie = session_cookie("", 0).unwrap();
        let s = cookie.to_str().unwrap();
        assert!(s.starts_with("token=;"));
        assert!(s.contains("Max-Age=0"));
    }
}
