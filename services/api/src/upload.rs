//! The picture upload pipeline
//!
//! The pipeline is a state machine whose states are carried by types:
//!
//! ```text
//! Multipart (received) -> StagedUpload (staged) -> StoredObject (uploaded)
//!                                               -> Pic (recorded)
//! ```
//!
//! A request without a file part never leaves `received` (400). Staging
//! streams the part to a scratch file under a generated name; a write that
//! does not produce a readable path is an IO error (500). Before the remote
//! upload the target gallery is resolved scoped to the caller, so an
//! invalid target (404) never creates an orphaned remote object. The object
//! key is `{generated}-{original}`; a store failure is an upload error
//! (502) and a failed record insert a persistence error (500).
//!
//! The scratch file is removed once the response has been produced,
//! whatever the terminal state: the handler calls [`StagedUpload::cleanup`]
//! after the pipeline settles, and [`ScratchFile`]'s `Drop` covers early
//! exits.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, Multipart};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{NewPic, Pic, User};
use crate::state::AppState;

/// A file staged in local scratch storage, deleted on cleanup or drop
pub struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    /// Path of the staged file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the scratch file now
    pub async fn cleanup(mut self) {
        self.armed = false;
        if let Err(err) = fs::remove_file(&self.path).await {
            warn!("failed to remove scratch file {:?}: {}", self.path, err);
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let path = std::mem::take(&mut self.path);
        // a guard dropped during shutdown unwinding has no runtime to
        // spawn on; remove the file in place instead
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = fs::remove_file(&path).await {
                        warn!("failed to remove scratch file {:?}: {}", path, err);
                    }
                });
            }
            Err(_) => {
                if let Err(err) = std::fs::remove_file(&path) {
                    warn!("failed to remove scratch file {:?}: {}", path, err);
                }
            }
        }
    }
}

/// A fully received and staged upload: the scratch file plus the metadata
/// needed for the remaining stages
pub struct StagedUpload {
    scratch: ScratchFile,
    generated_name: String,
    original_name: String,
    content_type: String,
    pub name: String,
    pub desc: String,
}

impl StagedUpload {
    /// Drive `received -> staged`: pull the `image`/`name`/`desc` parts out
    /// of the multipart body, streaming the file to scratch storage
    pub async fn receive(mut multipart: Multipart, scratch_dir: &Path) -> ApiResult<Self> {
        let mut staged: Option<(ScratchFile, String, String, String)> = None;
        let mut name = None;
        let mut desc = None;

        while let Some(mut field) = multipart.next_field().await? {
            let field_name = field.name().unwrap_or_default().to_string();
            match field_name.as_str() {
                "image" => {
                    let original_name = field
                        .file_name()
                        .unwrap_or("upload")
                        .rsplit(['/', '\\'])
                        .next()
                        .unwrap_or("upload")
                        .to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let generated_name = Uuid::new_v4().simple().to_string();
                    let scratch = stage_field(scratch_dir, &generated_name, &mut field).await?;
                    staged = Some((scratch, generated_name, original_name, content_type));
                }
                "name" => name = Some(field.text().await?),
                "desc" => desc = Some(field.text().await?),
                _ => {
                    // drain and ignore unknown parts
                    while field.chunk().await?.is_some() {}
                }
            }
        }

        let (scratch, generated_name, original_name, content_type) =
            staged.ok_or_else(|| ApiError::Validation("file not found".to_string()))?;
        let name = name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::Validation("name is required".to_string()))?;
        let desc = desc
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ApiError::Validation("desc is required".to_string()))?;

        debug!("staged upload {} as {}", original_name, generated_name);

        Ok(Self {
            scratch,
            generated_name,
            original_name,
            content_type,
            name,
            desc,
        })
    }

    /// Remote object key: `{generated}-{original}`
    pub fn object_key(&self) -> String {
        format!("{}-{}", self.generated_name, self.original_name)
    }

    /// Remove the scratch file; called by the handler once the response is
    /// settled, success or failure
    pub async fn cleanup(self) {
        self.scratch.cleanup().await;
    }
}

/// Drive `uploading -> uploaded -> recorded` for a staged upload
pub async fn store_and_record(
    state: &AppState,
    owner: &User,
    gallery_id: Uuid,
    staged: &StagedUpload,
) -> ApiResult<Pic> {
    // uploading: the target gallery must exist for this caller before any
    // bytes go out, so a bad target never leaves an orphaned remote object
    state
        .gallery_repository
        .find_for_owner(gallery_id, owner.id)
        .await?;

    let key = staged.object_key();
    let stored = state
        .storage
        .put_public(&key, &staged.content_type, staged.scratch.path())
        .await?;

    // recorded: the metadata row is the only reference this system keeps
    let pic = state
        .pic_repository
        .create(&NewPic {
            name: staged.name.clone(),
            description: staged.desc.clone(),
            object_key: stored.key,
            image_uri: stored.location,
            owner_id: owner.id,
            gallery_id,
        })
        .await?;

    debug!("recorded pic {} in gallery {}", pic.id, gallery_id);
    Ok(pic)
}

/// Stream one multipart field into a scratch file
///
/// The scratch guard is armed before the first write so a partial write is
/// still cleaned up.
async fn stage_field(
    scratch_dir: &Path,
    generated_name: &str,
    field: &mut Field<'_>,
) -> ApiResult<ScratchFile> {
    let path = scratch_dir.join(generated_name);
    let scratch = ScratchFile {
        path: path.clone(),
        armed: true,
    };

    let mut file = File::create(&path).await?;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    // the write must have produced a readable path
    fs::metadata(&path).await?;

    Ok(scratch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{header, Request};
    use std::time::Duration;

    const BOUNDARY: &str = "upload-test-boundary";

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gallery-upload-test-{}-{}", name, Uuid::new_v4()))
    }

    async fn scratch_dir(name: &str) -> PathBuf {
        let dir = scratch_path(name);
        fs::create_dir_all(&dir).await.unwrap();
        dir
    }

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        )
    }

    fn file_part(contents: &str) -> String {
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"cat.png\"\r\n\
             Content-Type: image/png\r\n\r\n{}\r\n",
            BOUNDARY, contents
        )
    }

    fn closing() -> String {
        format!("--{}--\r\n", BOUNDARY)
    }

    async fn receive_body(body: String, scratch_dir: &Path) -> ApiResult<StagedUpload> {
        let request = Request::builder()
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        let multipart = Multipart::from_request(request, &()).await.unwrap();
        StagedUpload::receive(multipart, scratch_dir).await
    }

    async fn dir_is_empty(dir: &Path) -> bool {
        let mut entries = fs::read_dir(dir).await.unwrap();
        entries.next_entry().await.unwrap().is_none()
    }

    #[tokio::test]
    async fn test_receive_without_file_is_validation_error() {
        let dir = scratch_dir("no-file").await;
        let body = format!(
            "{}{}{}",
            text_part("name", "cat"),
            text_part("desc", "a cat"),
            closing()
        );

        assert!(matches!(
            receive_body(body, &dir).await,
            Err(ApiError::Validation(_))
        ));
        assert!(dir_is_empty(&dir).await);

        fs::remove_dir(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_receive_rejects_missing_or_empty_fields() {
        let dir = scratch_dir("empty-fields").await;

        let missing_name = format!("{}{}{}", file_part("pixels"), text_part("desc", "a cat"), closing());
        assert!(matches!(
            receive_body(missing_name, &dir).await,
            Err(ApiError::Validation(_))
        ));

        let empty_desc = format!(
            "{}{}{}{}",
            file_part("pixels"),
            text_part("name", "cat"),
            text_part("desc", ""),
            closing()
        );
        assert!(matches!(
            receive_body(empty_desc, &dir).await,
            Err(ApiError::Validation(_))
        ));

        // staged file removal runs on a spawned task
        for _ in 0..50 {
            if dir_is_empty(&dir).await {
                fs::remove_dir(&dir).await.unwrap();
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("staged files were not removed after the failed receive");
    }

    #[tokio::test]
    async fn test_receive_stages_complete_upload() {
        let dir = scratch_dir("complete").await;
        let body = format!(
            "{}{}{}{}",
            file_part("pixels"),
            text_part("name", "cat"),
            text_part("desc", "a cat"),
            closing()
        );

        let staged = receive_body(body, &dir).await.expect("receive should succeed");
        assert_eq!(staged.name, "cat");
        assert_eq!(staged.desc, "a cat");
        assert!(staged.object_key().ends_with("-cat.png"));
        assert_eq!(fs::read(staged.scratch.path()).await.unwrap(), b"pixels");

        staged.cleanup().await;
        assert!(dir_is_empty(&dir).await);
        fs::remove_dir(&dir).await.unwrap();
    }

    #[test]
    fn test_object_key_derivation() {
        let staged = StagedUpload {
            scratch: ScratchFile {
                path: PathBuf::new(),
                armed: false,
            },
            generated_name: "abc123".to_string(),
            original_name: "cat.png".to_string(),
            content_type: "image/png".to_string(),
            name: "cat".to_string(),
            desc: "a cat".to_string(),
        };
        assert_eq!(staged.object_key(), "abc123-cat.png");
    }

    #[tokio::test]
    async fn test_cleanup_removes_file() {
        let path = scratch_path("cleanup");
        fs::write(&path, b"pixels").await.unwrap();

        let scratch = ScratchFile {
            path: path.clone(),
            armed: true,
        };
        scratch.cleanup().await;

        assert!(fs::metadata(&path).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_drop_removes_file() {
        let path = scratch_path("drop");
        fs::write(&path, b"pixels").await.unwrap();

        drop(ScratchFile {
            path: path.clone(),
            armed: true,
        });

        // drop cleanup runs on a spawned task
        for _ in 0..50 {
            if fs::metadata(&path).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("scratch file was not removed after drop");
    }

    #[test]
    fn test_drop_outside_runtime_removes_file() {
        let path = scratch_path("drop-no-runtime");
        std::fs::write(&path, b"pixels").unwrap();

        drop(ScratchFile {
            path: path.clone(),
            armed: true,
        });

        // without a runtime the removal happens before drop returns
        assert!(std::fs::metadata(&path).is_err());
    }

    #[tokio::test]
    async fn test_cleanup_of_missing_file_is_quiet() {
        let scratch = ScratchFile {
            path: scratch_path("missing"),
            armed: true,
        };
        // nothing was ever written; cleanup only logs
        scratch.cleanup().await;
    }
}
