use anyhow::Context;
use axum::http::StatusCode;
use bytes::Bytes;
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    petitions::{
        repo as petitions_repo,
        repo_types::{Petition, PetitionId},
    },
    policy::{authorize, Capability, Resource},
    state::AppState,
    users::{
        repo as users_repo,
        repo_types::{User, UserId},
    },
};

const PRESIGN_TTL_SECS: u64 = 10 * 60;

/// Whether a PUT created the first image or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    Created,
    Replaced,
}

impl ImageOutcome {
    pub fn status(self) -> StatusCode {
        match self {
            ImageOutcome::Created => StatusCode::CREATED,
            ImageOutcome::Replaced => StatusCode::OK,
        }
    }
}

/// Media type without parameters, lower-cased: `Image/PNG; x=y` is `image/png`.
fn essence(ct: &str) -> String {
    ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match essence(ct).as_str() {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpeg"),
        "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Extension for an upload, or `BadRequest` when the type is not allowed or
/// the body is empty.
pub fn validate_upload(content_type: Option<&str>, body: &Bytes) -> AppResult<&'static str> {
    let ct = content_type.unwrap_or_default();
    let ext = ext_from_mime(ct)
        .ok_or_else(|| AppError::bad_request(format!("unsupported image type {ct:?}")))?;
    if body.is_empty() {
        return Err(AppError::bad_request("image body is empty"));
    }
    Ok(ext)
}

pub fn petition_key(id: PetitionId, ext: &str) -> String {
    format!("petitions/petition_{id}.{ext}")
}

pub fn user_key(id: UserId, ext: &str) -> String {
    format!("users/user_{id}.{ext}")
}

/// Write `body` under `key` and drop `previous` when it lives elsewhere.
pub async fn store(
    st: &AppState,
    previous: Option<&str>,
    key: &str,
    body: Bytes,
    content_type: &str,
) -> AppResult<ImageOutcome> {
    st.storage
        .put_object(key, body, content_type)
        .await
        .with_context(|| format!("put_object {key}"))?;

    match previous {
        None => Ok(ImageOutcome::Created),
        Some(old) => {
            if old != key {
                if let Err(e) = st.storage.delete_object(old).await {
                    warn!(error = %e, key = old, "stale image left behind");
                }
            }
            Ok(ImageOutcome::Replaced)
        }
    }
}

async fn presign(st: &AppState, key: &str) -> AppResult<String> {
    let url = st
        .storage
        .presign_get(key, PRESIGN_TTL_SECS)
        .await
        .with_context(|| format!("presign url for {key}"))?;
    Ok(url)
}

async fn petition_or_404(st: &AppState, id: PetitionId) -> AppResult<Petition> {
    petitions_repo::find(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no petition with id {id}")))
}

async fn user_or_404(st: &AppState, id: UserId) -> AppResult<User> {
    User::find_by_id(&st.db, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("no user with id {id}")))
}

pub async fn petition_image_url(st: &AppState, id: PetitionId) -> AppResult<String> {
    let petition = petition_or_404(st, id).await?;
    let key = petition
        .image_filename
        .ok_or_else(|| AppError::not_found(format!("petition {id} has no image")))?;
    presign(st, &key).await
}

pub async fn set_petition_image(
    st: &AppState,
    actor: UserId,
    id: PetitionId,
    content_type: Option<&str>,
    body: Bytes,
) -> AppResult<ImageOutcome> {
    let petition = petition_or_404(st, id).await?;
    authorize(actor, Resource::Petition { owner_id: petition.owner_id }, Capability::Modify)?;
    let ext = validate_upload(content_type, &body)?;

    let key = petition_key(id, ext);
    let ct = content_type.unwrap_or_default();
    let outcome = store(st, petition.image_filename.as_deref(), &key, body, ct).await?;
    petitions_repo::set_image_filename(&st.db, id, Some(&key)).await?;
    info!(petition_id = id, %key, ?outcome, "petition image stored");
    Ok(outcome)
}

pub async fn user_image_url(st: &AppState, id: UserId) -> AppResult<String> {
    let user = user_or_404(st, id).await?;
    let key = user
        .image_filename
        .ok_or_else(|| AppError::not_found(format!("user {id} has no image")))?;
    presign(st, &key).await
}

pub async fn set_user_image(
    st: &AppState,
    actor: UserId,
    id: UserId,
    content_type: Option<&str>,
    body: Bytes,
) -> AppResult<ImageOutcome> {
    let user = user_or_404(st, id).await?;
    authorize(actor, Resource::User { id }, Capability::Modify)?;
    let ext = validate_upload(content_type, &body)?;

    let key = user_key(id, ext);
    let ct = content_type.unwrap_or_default();
    let outcome = store(st, user.image_filename.as_deref(), &key, body, ct).await?;
    users_repo::set_image_filename(&st.db, id, Some(&key)).await?;
    info!(user_id = id, %key, ?outcome, "user image stored");
    Ok(outcome)
}

pub async fn delete_user_image(st: &AppState, actor: UserId, id: UserId) -> AppResult<()> {
    let user = user_or_404(st, id).await?;
    authorize(actor, Resource::User { id }, Capability::Modify)?;
    let key = user
        .image_filename
        .ok_or_else(|| AppError::not_found(format!("user {id} has no image")))?;

    users_repo::set_image_filename(&st.db, id, None).await?;
    st.storage
        .delete_object(&key)
        .await
        .with_context(|| format!("delete_object {key}"))?;
    info!(user_id = id, %key, "user image removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::memory::MemoryStorage;

    fn state_with(mem: &Arc<MemoryStorage>) -> AppState {
        AppState {
            storage: mem.clone(),
            ..AppState::fake()
        }
    }

    #[test]
    fn only_allow_listed_types_pass() {
        let body = Bytes::from_static(b"\x89PNG");
        assert_eq!(validate_upload(Some("image/png"), &body).unwrap(), "png");
        assert_eq!(validate_upload(Some("image/jpeg"), &body).unwrap(), "jpeg");
        assert_eq!(validate_upload(Some("image/jpg"), &body).unwrap(), "jpg");
        assert_eq!(validate_upload(Some("image/gif"), &body).unwrap(), "gif");
        for ct in [Some("image/webp"), Some("text/plain"), None] {
            assert!(matches!(validate_upload(ct, &body), Err(AppError::BadRequest(_))));
        }
    }

    #[test]
    fn type_parameters_and_case_are_ignored() {
        let body = Bytes::from_static(b"GIF89a");
        assert_eq!(validate_upload(Some("image/png; charset=binary"), &body).unwrap(), "png");
        assert_eq!(validate_upload(Some("Image/PNG"), &body).unwrap(), "png");
        assert_eq!(validate_upload(Some(" IMAGE/GIF ;q=1"), &body).unwrap(), "gif");
        assert!(matches!(
            validate_upload(Some("image/svg+xml; charset=utf-8"), &body),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn empty_body_is_rejected() {
        assert!(matches!(
            validate_upload(Some("image/png"), &Bytes::new()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn keys_derive_from_owner_id() {
        assert_eq!(petition_key(7, "png"), "petitions/petition_7.png");
        assert_eq!(user_key(3, "gif"), "users/user_3.gif");
    }

    #[tokio::test]
    async fn first_store_creates() {
        let mem = Arc::new(MemoryStorage::default());
        let st = state_with(&mem);
        let key = petition_key(1, "png");
        let outcome = store(&st, None, &key, Bytes::from_static(b"img"), "image/png")
            .await
            .unwrap();
        assert_eq!(outcome, ImageOutcome::Created);
        assert_eq!(outcome.status(), StatusCode::CREATED);
        assert!(mem.contains(&key));
        assert!(presign(&st, &key).await.unwrap().ends_with(&key));
    }

    #[tokio::test]
    async fn replacing_with_new_extension_drops_old_object() {
        let mem = Arc::new(MemoryStorage::default());
        let st = state_with(&mem);
        let old = user_key(2, "png");
        let new = user_key(2, "gif");
        store(&st, None, &old, Bytes::from_static(b"a"), "image/png").await.unwrap();

        let outcome = store(&st, Some(&old), &new, Bytes::from_static(b"b"), "image/gif")
            .await
            .unwrap();
        assert_eq!(outcome, ImageOutcome::Replaced);
        assert_eq!(outcome.status(), StatusCode::OK);
        assert!(mem.contains(&new));
        assert!(!mem.contains(&old));
    }

    #[tokio::test]
    async fn replacing_under_same_key_keeps_object() {
        let mem = Arc::new(MemoryStorage::default());
        let st = state_with(&mem);
        let key = user_key(2, "png");
        store(&st, None, &key, Bytes::from_static(b"a"), "image/png").await.unwrap();
        store(&st, Some(&key), &key, Bytes::from_static(b"b"), "image/png").await.unwrap();
        assert!(mem.contains(&key));
    }
}
