use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{LoginRequest, PatchUserRequest, RegisterRequest, UserView},
    repo,
    repo_types::{User, UserChanges, UserId},
};
use crate::{
    auth::{
        password::{hash_password, verify_password},
        JwtKeys,
    },
    error::{AppError, AppResult},
    policy::{authorize, Capability, Resource},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn require_name(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request("password too short"));
    }
    Ok(())
}

pub async fn register(st: &AppState, req: RegisterRequest) -> AppResult<UserId> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::bad_request("invalid email"));
    }
    require_name(&req.first_name, "firstName")?;
    require_name(&req.last_name, "lastName")?;
    require_password(&req.password)?;

    if User::find_by_email(&st.db, &email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::conflict("email already in use"));
    }

    let hash = hash_password(&req.password)?;
    let id = User::create(&st.db, &email, &req.first_name, &req.last_name, &hash).await?;
    info!(user_id = id, %email, "user registered");
    Ok(id)
}

pub async fn login(st: &AppState, req: LoginRequest) -> AppResult<(UserId, String)> {
    let email = normalize_email(&req.email);
    let Some(user) = User::find_by_email(&st.db, &email).await? else {
        warn!(%email, "login unknown email");
        return Err(AppError::Unauthorized);
    };
    if !verify_password(&req.password, &user.password_hash)? {
        warn!(%email, user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized);
    }

    let token = JwtKeys::from_ref(st).sign(user.id)?;
    repo::set_auth_token(&st.db, user.id, Some(&token)).await?;
    info!(user_id = user.id, "user logged in");
    Ok((user.id, token))
}

pub async fn logout(st: &AppState, user_id: UserId) -> AppResult<()> {
    repo::set_auth_token(&st.db, user_id, None).await?;
    info!(user_id, "user logged out");
    Ok(())
}

pub fn view_of(user: User, viewer: Option<UserId>) -> UserView {
    let is_self = viewer == Some(user.id);
    UserView {
        first_name: user.first_name,
        last_name: user.last_name,
        email: is_self.then_some(user.email),
    }
}

pub async fn view(st: &AppState, viewer: Option<UserId>, id: UserId) -> AppResult<UserView> {
    let user = User::find_by_id(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no user with id {id}")))?;
    Ok(view_of(user, viewer))
}

/// Work out which columns an edit really changes. Runs every check before
/// anything is written.
pub fn diff_user(current: &User, req: &PatchUserRequest) -> AppResult<UserChanges> {
    let mut changes = UserChanges::default();

    if let Some(email) = req.email.as_deref().map(normalize_email) {
        if !is_valid_email(&email) {
            return Err(AppError::bad_request("invalid email"));
        }
        if email != current.email {
            changes.email = Some(email);
        }
    }
    if let Some(first) = req.first_name.as_deref() {
        require_name(first, "firstName")?;
        if first != current.first_name {
            changes.first_name = Some(first.to_string());
        }
    }
    if let Some(last) = req.last_name.as_deref() {
        require_name(last, "lastName")?;
        if last != current.last_name {
            changes.last_name = Some(last.to_string());
        }
    }
    if let Some(password) = req.password.as_deref() {
        require_password(password)?;
        let Some(current_password) = req.current_password.as_deref() else {
            return Err(AppError::bad_request("currentPassword is required to change password"));
        };
        if !verify_password(current_password, &current.password_hash)? {
            return Err(AppError::forbidden("currentPassword is incorrect"));
        }
        if password == current_password {
            return Err(AppError::forbidden("new password must differ from the current one"));
        }
        changes.password_hash = Some(hash_password(password)?);
    }
    Ok(changes)
}

pub async fn update(
    st: &AppState,
    actor: UserId,
    id: UserId,
    req: PatchUserRequest,
) -> AppResult<()> {
    let current = User::find_by_id(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no user with id {id}")))?;
    authorize(actor, Resource::User { id }, Capability::Modify)?;

    let changes = diff_user(&current, &req)?;
    if let Some(email) = changes.email.as_deref() {
        if User::find_by_email(&st.db, email).await?.is_some() {
            return Err(AppError::conflict("email already in use"));
        }
    }
    if changes.is_empty() {
        return Ok(());
    }
    User::update(&st.db, id, &changes).await?;
    info!(user_id = id, "user updated");
    Ok(())
}
