//! Post attachment routes.
//!
//! Responses are JSON view models; successful writes redirect (303) to the
//! owning post. Unparseable ids in the path are reported as not found.

use std::io;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;
use tracing::{error, warn};

use crate::{
    AppState,
    error::error_response,
    middleware::{
        AuthUser,
        csrf::{CSRF_COOKIE, issue_token},
    },
};
use agora_core::attachment::{
    ALLOWED_EXTENSIONS, AttachmentError, AttachmentService, FILE_FIELD, FieldErrors, Post,
    PostAttachment, UploadOutcome, UploadedFile,
};
use agora_db::AttachmentRepository;
use agora_shared::{AppError, AttachmentId, PostId};

/// Creates the attachment routes.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/posts/{post_id}/attachments", get(list_attachments))
        .route(
            "/posts/{post_id}/attachments/create",
            get(upload_form)
                .post(upload_attachment)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/attachments/{attachment_id}/delete",
            get(delete_confirmation).post(delete_attachment),
        )
}

// ============================================================================
// View Models
// ============================================================================

/// Post summary shown alongside attachment views.
#[derive(Debug, Serialize)]
pub struct PostSummary {
    /// Post ID.
    pub id: PostId,
    /// Post title.
    pub title: String,
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
        }
    }
}

/// An attachment as shown to clients.
#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    /// Attachment ID.
    pub id: AttachmentId,
    /// Owning post.
    pub post_id: PostId,
    /// Public path of the file.
    pub path: String,
    /// Creation timestamp (ISO 8601).
    pub created: String,
}

impl From<PostAttachment> for AttachmentResponse {
    fn from(attachment: PostAttachment) -> Self {
        Self {
            id: attachment.id,
            post_id: attachment.post_id,
            path: attachment.path,
            created: attachment.created.to_rfc3339(),
        }
    }
}

/// Upload form, also returned with field errors on a rejected upload.
#[derive(Debug, Serialize)]
pub struct UploadFormResponse {
    /// Target post.
    pub post: PostSummary,
    /// Accepted file extensions.
    pub allowed_extensions: &'static [&'static str],
    /// Field errors, empty on first display.
    pub errors: FieldErrors,
    /// Anti-forgery token to echo in `X-CSRF-Token`.
    pub csrf_token: String,
}

/// Attachment listing for a post.
#[derive(Debug, Serialize)]
pub struct AttachmentListResponse {
    /// The post.
    pub post: PostSummary,
    /// Attachments, newest first.
    pub attachments: Vec<AttachmentResponse>,
}

/// Delete confirmation.
#[derive(Debug, Serialize)]
pub struct DeleteConfirmationResponse {
    /// The attachment to delete.
    pub attachment: AttachmentResponse,
    /// Its owning post.
    pub post: PostSummary,
    /// Anti-forgery token to echo in `X-CSRF-Token`.
    pub csrf_token: String,
}

// ============================================================================
// Helper Functions
// ============================================================================

fn attachment_service(state: &AppState) -> AttachmentService<AttachmentRepository> {
    let repo = AttachmentRepository::new(state.db.clone());
    AttachmentService::new(
        state.blobs.clone(),
        Arc::new(repo),
        state.permissions.clone(),
    )
}

fn post_redirect(post_id: PostId) -> Response {
    Redirect::to(&format!("/posts/{post_id}")).into_response()
}

/// Map an attachment error to a JSON error response.
fn attachment_error_response(e: AttachmentError) -> Response {
    let detail = e.to_string();
    let err = AppError::from(e);

    if err.is_client_error() {
        warn!(error = %detail, status = err.status_code(), "Attachment request rejected");
    } else {
        error!(error = %detail, "Attachment operation failed");
    }

    error_response(&err)
}

fn bad_request(message: &str) -> Response {
    error_response(&AppError::BadRequest(message.to_string()))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/posts/{post_id}/attachments`
/// List a post's attachments, newest first.
async fn list_attachments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
) -> Response {
    let service = attachment_service(&state);

    match service
        .list(&auth.actor(), PostId::parse_segment(&post_id))
        .await
    {
        Ok((post, attachments)) => Json(AttachmentListResponse {
            post: post.into(),
            attachments: attachments.into_iter().map(Into::into).collect(),
        })
        .into_response(),
        Err(e) => attachment_error_response(e),
    }
}

/// GET `/posts/{post_id}/attachments/create`
/// Show the upload form for a post the caller may edit.
async fn upload_form(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
    jar: CookieJar,
) -> Response {
    let service = attachment_service(&state);

    match service
        .editable_post(&auth.actor(), PostId::parse_segment(&post_id))
        .await
    {
        Ok(post) => {
            let (jar, csrf_token) = issue_token(jar);
            let form = UploadFormResponse {
                post: post.into(),
                allowed_extensions: &ALLOWED_EXTENSIONS,
                errors: FieldErrors::default(),
                csrf_token,
            };
            (jar, Json(form)).into_response()
        }
        Err(e) => attachment_error_response(e),
    }
}

/// POST `/posts/{post_id}/attachments/create`
/// Upload a file (multipart part `file`) to a post.
async fn upload_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let service = attachment_service(&state);
    let actor = auth.actor();
    let post_id = PostId::parse_segment(&post_id);

    // Parts other than the file are skipped; a part without a file name is no file.
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(FILE_FIELD) => {
                let file_name = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);

                let outcome = match file_name {
                    Some(file_name) => {
                        let body = StreamReader::new(field.map_err(body_read_error));
                        let file = UploadedFile::new(Some(file_name), body);
                        service.upload(&actor, post_id, Some(file)).await
                    }
                    None => service.upload::<&[u8]>(&actor, post_id, None).await,
                };
                return upload_response(outcome, &jar);
            }
            Ok(Some(_)) => {}
            Ok(None) => {
                let outcome = service.upload::<&[u8]>(&actor, post_id, None).await;
                return upload_response(outcome, &jar);
            }
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                warn!(error = %e, limit = state.max_upload_bytes, "Upload exceeds body limit");
                return bad_request("Upload exceeds the size limit");
            }
            Err(e) => {
                warn!(error = %e, "Malformed multipart body");
                return bad_request("Malformed multipart body");
            }
        }
    }
}

/// Body read failures are tagged so storage can tell them from disk failures.
fn body_read_error(e: MultipartError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

fn upload_response(outcome: Result<UploadOutcome, AttachmentError>, jar: &CookieJar) -> Response {
    match outcome {
        Ok(UploadOutcome::Created(attachment)) => post_redirect(attachment.post_id),
        Ok(UploadOutcome::Invalid { post, errors }) => {
            let csrf_token = jar
                .get(CSRF_COOKIE)
                .map(|c| c.value().to_string())
                .unwrap_or_default();
            let form = UploadFormResponse {
                post: post.into(),
                allowed_extensions: &ALLOWED_EXTENSIONS,
                errors,
                csrf_token,
            };
            (StatusCode::UNPROCESSABLE_ENTITY, Json(form)).into_response()
        }
        Err(e) => attachment_error_response(e),
    }
}

/// GET `/attachments/{attachment_id}/delete`
/// Show the delete confirmation.
async fn delete_confirmation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(attachment_id): Path<String>,
    jar: CookieJar,
) -> Response {
    let service = attachment_service(&state);

    match service
        .deletable(&auth.actor(), AttachmentId::parse_segment(&attachment_id))
        .await
    {
        Ok((attachment, post)) => {
            let (jar, csrf_token) = issue_token(jar);
            let confirmation = DeleteConfirmationResponse {
                attachment: attachment.into(),
                post: post.into(),
                csrf_token,
            };
            (jar, Json(confirmation)).into_response()
        }
        Err(e) => attachment_error_response(e),
    }
}

/// POST `/attachments/{attachment_id}/delete`
/// Delete the file, then the record.
async fn delete_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(attachment_id): Path<String>,
) -> Response {
    let service = attachment_service(&state);

    match service
        .delete(&auth.actor(), AttachmentId::parse_segment(&attachment_id))
        .await
    {
        Ok(post_id) => post_redirect(post_id),
        Err(e) => attachment_error_response(e),
    }
}
