//! File upload API handlers
//!
//! Files are uploaded under an event as multipart form data. The part is
//! streamed into the upload directory first and the metadata record inserted
//! afterwards; a failed insert removes the written object again.

use crate::api::utils::{required, MutationResponse};
use crate::error::AppError;
use crate::state::{generate_id, AppState, RecordId};
use crate::store::{FileRecord, FileSummary};
use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::path::{Path as FsPath, PathBuf};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file part already written to the upload directory
#[derive(Debug)]
struct StoredPart {
    id: RecordId,
    path: PathBuf,
    file_name: String,
    file_type: String,
    size: u64,
}

/// Fields collected from an upload form
#[derive(Debug, Default)]
struct UploadParts {
    user_id: Option<String>,
    file: Option<StoredPart>,
}

/// Final path component of a client-supplied file name
fn base_name(name: &str) -> Option<String> {
    name.rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(str::to_string)
}

/// Read every multipart field into `parts`
///
/// On error, anything already stored in `parts.file` is still on disk and
/// must be removed by the caller.
async fn receive_parts(
    state: &AppState,
    multipart: &mut Multipart,
    parts: &mut UploadParts,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("");

        match field_name {
            "userId" => {
                parts.user_id = Some(field.text().await?);
            }
            "file" => {
                // A file input left empty arrives without a filename
                let Some(file_name) = field.file_name().and_then(base_name) else {
                    continue;
                };
                if parts.file.is_some() {
                    return Err(AppError::Validation(
                        "Only one file can be uploaded per request".to_string(),
                    ));
                }

                let file_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let id = generate_id();
                let path = state.uploads.object_path(&id, &file_name);
                let size = state
                    .uploads
                    .write_stream(&path, field, state.max_upload_bytes)
                    .await?;

                parts.file = Some(StoredPart {
                    id,
                    path,
                    file_name,
                    file_type,
                    size,
                });
            }
            _ => {}
        }
    }

    Ok(())
}

/// POST /api/events/:eventId/files - Upload a file for an event
///
/// Expects a `file` part and a `userId` text field.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(event_id): Path<RecordId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<MutationResponse>), AppError> {
    let mut multipart = multipart?;
    let mut parts = UploadParts::default();

    if let Err(e) = receive_parts(&state, &mut multipart, &mut parts).await {
        if let Some(stored) = &parts.file {
            state.uploads.remove_quietly(&stored.path).await;
        }
        return Err(e);
    }

    let Some(stored) = parts.file else {
        return Err(AppError::Validation("No file provided".to_string()));
    };
    let user_id = match required(parts.user_id, "userId") {
        Ok(user_id) => user_id,
        Err(e) => {
            state.uploads.remove_quietly(&stored.path).await;
            return Err(e);
        }
    };

    let record = FileRecord {
        id: stored.id,
        event_id,
        user_id,
        file_name: stored.file_name,
        file_type: Some(stored.file_type),
        file_path: stored.path.to_string_lossy().to_string(),
        file_size: stored.size as i64,
        uploaded_at: Utc::now(),
    };

    if let Err(e) = state.store.create_file(&record).await {
        warn!("Error saving file record {}: {}", record.id, e);
        state.uploads.remove_quietly(&stored.path).await;
        return Err(AppError::rejected(e));
    }

    info!(
        file_id = %record.id,
        event_id = %record.event_id,
        size = record.file_size,
        "File uploaded"
    );
    Ok((
        StatusCode::CREATED,
        Json(
            MutationResponse::file("File uploaded successfully", record.id)
                .with_file_name(record.file_name),
        ),
    ))
}

/// GET /api/events/:eventId/files - List files uploaded for an event
pub async fn list_event_files(
    State(state): State<AppState>,
    Path(event_id): Path<RecordId>,
) -> Result<Json<Vec<FileSummary>>, AppError> {
    Ok(Json(state.store.list_files_for_event(&event_id).await?))
}

/// `Content-Disposition` value offering the original name as an attachment
///
/// Carries an ASCII fallback plus the exact UTF-8 name (RFC 6266).
fn content_disposition(file_name: &str) -> HeaderValue {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    );

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// GET /api/files/:fileId/download - Stream a stored file back to the client
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<RecordId>,
) -> Result<Response, AppError> {
    let record = state
        .store
        .get_file(&file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    let file = state
        .uploads
        .open(FsPath::new(&record.file_path))
        .await?
        .ok_or_else(|| {
            warn!("File {} has no object at {}", record.id, record.file_path);
            AppError::NotFound("File does not exist on server".to_string())
        })?;
    let length = file
        .metadata()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to stat {}: {}", record.file_path, e))?
        .len();

    let content_type = record
        .file_type
        .as_deref()
        .and_then(|t| HeaderValue::from_str(t).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let headers = [
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_LENGTH, HeaderValue::from(length)),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(&record.file_name),
        ),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

/// DELETE /api/files/:fileId - Delete a file record and its stored object
pub async fn delete_file(
    State(state): State<AppState>,
    Path(file_id): Path<RecordId>,
) -> Result<Json<MutationResponse>, AppError> {
    let record = state
        .store
        .get_file(&file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    let deleted = state.store.delete_file(&file_id).await.map_err(|e| {
        warn!("Error deleting file {}: {}", file_id, e);
        AppError::rejected(e)
    })?;
    if !deleted {
        return Err(AppError::NotFound("File not found".to_string()));
    }

    // An object left behind here is picked up by the reconciliation sweep
    state
        .uploads
        .remove_quietly(FsPath::new(&record.file_path))
        .await;

    info!(file_id = %file_id, "File deleted");
    Ok(Json(MutationResponse::file(
        "File deleted successfully",
        file_id,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::utils::test_support::create_test_state;
    use axum::body::to_bytes;

    async fn store_object(state: &AppState, id: &str, name: &str, contents: &str) -> FileRecord {
        let path = state.uploads.object_path(id, name);
        std::fs::write(&path, contents).unwrap();
        let record = FileRecord {
            id: id.to_string(),
            event_id: "e1".to_string(),
            user_id: "u1".to_string(),
            file_name: name.to_string(),
            file_type: Some("text/plain".to_string()),
            file_path: path.to_string_lossy().to_string(),
            file_size: contents.len() as i64,
            uploaded_at: Utc::now(),
        };
        state.store.create_file(&record).await.unwrap();
        record
    }

    #[test]
    fn test_base_name_strips_directories() {
        assert_eq!(base_name("menu.pdf").as_deref(), Some("menu.pdf"));
        assert_eq!(base_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(base_name("C:\\Users\\jane\\plan.docx").as_deref(), Some("plan.docx"));
        assert_eq!(base_name(""), None);
        assert_eq!(base_name("dir/"), None);
    }

    #[test]
    fn test_content_disposition_has_ascii_fallback() {
        let value = content_disposition("menü \"final\".pdf");
        assert_eq!(
            value.to_str().unwrap(),
            "attachment; filename=\"men_ _final_.pdf\"; filename*=UTF-8''men%C3%BC%20%22final%22.pdf"
        );
    }

    #[tokio::test]
    async fn test_download_streams_object_with_headers() {
        let (state, _temp_dir) = create_test_state().await;
        store_object(&state, "f1", "notes.txt", "hello").await;

        let response = download_file(State(state), Path("f1".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "5");
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"notes.txt\""));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hello");
    }

    #[tokio::test]
    async fn test_download_missing_record_and_missing_object() {
        let (state, _temp_dir) = create_test_state().await;

        match download_file(State(state.clone()), Path("nope".to_string())).await {
            Err(AppError::NotFound(message)) => assert_eq!(message, "File not found"),
            other => panic!("Expected NotFound error, got: {:?}", other.map(|r| r.status())),
        }

        let record = store_object(&state, "f2", "gone.txt", "x").await;
        std::fs::remove_file(&record.file_path).unwrap();
        match download_file(State(state), Path("f2".to_string())).await {
            Err(AppError::NotFound(message)) => {
                assert_eq!(message, "File does not exist on server")
            }
            other => panic!("Expected NotFound error, got: {:?}", other.map(|r| r.status())),
        }
    }

    #[tokio::test]
    async fn test_delete_file_removes_record_and_object() {
        let (state, _temp_dir) = create_test_state().await;
        let record = store_object(&state, "f1", "notes.txt", "hello").await;

        let response = delete_file(State(state.clone()), Path("f1".to_string()))
            .await
            .unwrap();
        assert_eq!(response.file_id.as_deref(), Some("f1"));
        assert!(!FsPath::new(&record.file_path).exists());
        assert!(state.store.get_file("f1").await.unwrap().is_none());

        let again = delete_file(State(state), Path("f1".to_string())).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_file_without_object_still_removes_record() {
        let (state, _temp_dir) = create_test_state().await;
        let record = store_object(&state, "f1", "notes.txt", "hello").await;
        std::fs::remove_file(&record.file_path).unwrap();

        delete_file(State(state.clone()), Path("f1".to_string()))
            .await
            .unwrap();
        assert_eq!(state.store.count_files().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_event_files_hides_storage_path() {
        let (state, _temp_dir) = create_test_state().await;
        store_object(&state, "f1", "a.txt", "aa").await;
        store_object(&state, "f2", "b.txt", "bbb").await;

        let files = list_event_files(State(state.clone()), Path("e1".to_string()))
            .await
            .unwrap()
            .0;
        assert_eq!(files.len(), 2);

        let body = serde_json::to_value(&files).unwrap();
        assert!(body[0].get("filePath").is_none());
        assert!(body[0].get("fileName").is_some());

        let other = list_event_files(State(state), Path("e2".to_string()))
            .await
            .unwrap()
            .0;
        assert!(other.is_empty());
    }
}
