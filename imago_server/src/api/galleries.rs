//! Gallery handlers. All routes sit behind the authentication gate and only
//! ever touch galleries owned by the signed-in user.

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use imago::gallery::{
    Gallery, GalleryDetails, GalleryError, GalleryId, GalleryPayload, Image, MAX_IMAGE_BYTES,
};
use serde::Serialize;

use super::{AppState, middleware::CurrentUser};

/// Multipart field that carries uploaded files
pub const IMAGES_FIELD: &str = "images";

/// Largest accepted upload request. Each file is also held to [`MAX_IMAGE_BYTES`].
pub const MAX_UPLOAD_BYTES: usize = 4 * MAX_IMAGE_BYTES;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: GalleryError) -> ApiError {
    let status = match &err {
        GalleryError::GalleryNotFound(_) => StatusCode::NOT_FOUND,
        GalleryError::Forbidden => StatusCode::FORBIDDEN,
        GalleryError::ImageNotFound(_) => StatusCode::NOT_FOUND,
        GalleryError::InvalidTitle(_) | GalleryError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        GalleryError::Database(e) => {
            tracing::error!("Gallery storage error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        GalleryError::Storage(e) => {
            tracing::error!("Image storage error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.client_message())
}

fn error_response(status: StatusCode, error: String) -> ApiError {
    (status, Json(ErrorResponse { error }))
}

fn multipart_error(err: MultipartError) -> ApiError {
    error_response(err.status(), err.body_text())
}

/// List the signed-in user's galleries, oldest first
pub async fn list_galleries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Gallery>>, ApiError> {
    state
        .galleries
        .by_user(user.id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Create a gallery
///
/// # Request Body
///
/// ```json
/// { "title": "Holidays" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Blank or overlong title
pub async fn create_gallery(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<GalleryPayload>,
) -> Result<(StatusCode, Json<Gallery>), ApiError> {
    let gallery = state
        .galleries
        .create(user.id, &payload.title)
        .await
        .map_err(api_error)?;

    Ok((StatusCode::CREATED, Json(gallery)))
}

/// Show one gallery with its images
///
/// # Errors
///
/// - `404 Not Found`: No such gallery
/// - `403 Forbidden`: Gallery belongs to someone else
pub async fn show_gallery(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(gallery_id): Path<GalleryId>,
) -> Result<Json<GalleryDetails>, ApiError> {
    state
        .galleries
        .details(gallery_id, user.id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Rename a gallery
pub async fn update_gallery(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(gallery_id): Path<GalleryId>,
    Json(payload): Json<GalleryPayload>,
) -> Result<Json<Gallery>, ApiError> {
    state
        .galleries
        .update_title(gallery_id, user.id, &payload.title)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Delete a gallery
pub async fn delete_gallery(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(gallery_id): Path<GalleryId>,
) -> Result<StatusCode, ApiError> {
    state
        .galleries
        .delete(gallery_id, user.id)
        .await
        .map_err(api_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Upload one or more images
///
/// # Request Body
///
/// `multipart/form-data` with one file per `images` field. Other fields are
/// ignored. Files are stored in order; the first rejected file stops the upload.
///
/// # Errors
///
/// - `400 Bad Request`: No files, or a file with a bad name, extension or content
/// - `413 Payload Too Large`: Request larger than [`MAX_UPLOAD_BYTES`]
pub async fn upload_images(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(gallery_id): Path<GalleryId>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<Image>>), ApiError> {
    state
        .galleries
        .owned_by(gallery_id, user.id)
        .await
        .map_err(api_error)?;

    let mut uploaded = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGES_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let contents = field.bytes().await.map_err(multipart_error)?;

        let image = state
            .galleries
            .add_image(gallery_id, user.id, &filename, &contents)
            .await
            .map_err(api_error)?;
        uploaded.push(image);
    }

    if uploaded.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "No images uploaded".to_string(),
        ));
    }

    tracing::debug!(
        "User {} uploaded {} image(s) to gallery {}",
        user.id,
        uploaded.len(),
        gallery_id
    );
    Ok((StatusCode::CREATED, Json(uploaded)))
}

/// Serve an image file, typed by its extension
pub async fn show_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((gallery_id, filename)): Path<(GalleryId, String)>,
) -> Result<Response, ApiError> {
    let (image, contents) = state
        .galleries
        .image(gallery_id, user.id, &filename)
        .await
        .map_err(api_error)?;

    let content_type = mime_guess::from_path(&image.filename).first_or_octet_stream();
    Ok(([(CONTENT_TYPE, content_type.to_string())], contents).into_response())
}

/// Delete one image
pub async fn delete_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((gallery_id, filename)): Path<(GalleryId, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .galleries
        .delete_image(gallery_id, user.id, &filename)
        .await
        .map_err(api_error)?;

    Ok(StatusCode::NO_CONTENT)
}
