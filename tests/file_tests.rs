/// Photo upload tests: multipart intake, size and type checks, and storage
use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::{header, Request, StatusCode},
};
use devcamper_api::uploads::{
    ensure_image, photo_file_name, read_photo, store_photo, too_large, PhotoUpload,
};
use mongodb::bson::oid::ObjectId;
use tempfile::{NamedTempFile, TempDir};

const BOUNDARY: &str = "devcamper-test-boundary";

// Test utilities for multipart bodies
mod file_test_utils {
    use super::*;

    pub struct Part<'a> {
        pub name: &'a str,
        pub file_name: Option<&'a str>,
        pub content_type: Option<&'a str>,
        pub data: Vec<u8>,
    }

    pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
            if let Some(file_name) = part.file_name {
                disposition.push_str(&format!("; filename=\"{}\"", file_name));
            }
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"\r\n");
            if let Some(content_type) = part.content_type {
                body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(&part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    pub async fn multipart(parts: &[Part<'_>]) -> Multipart {
        let request = Request::builder()
            .method("PUT")
            .uri("/api/v1/bootcamps/5d713995b721c3bb38c1f5d0/photo")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();

        Multipart::from_request(request, &())
            .await
            .expect("Failed to build multipart extractor")
    }

    pub fn image(size: usize) -> Part<'static> {
        Part {
            name: "file",
            file_name: Some("Campus.JPG"),
            content_type: Some("image/jpeg"),
            data: vec![0xAB; size],
        }
    }
}

use file_test_utils::*;

#[cfg(test)]
mod naming_tests {
    use super::*;

    #[test]
    fn test_photo_file_name() {
        let id = ObjectId::parse_str("5d713995b721c3bb38c1f5d0").unwrap();
        assert_eq!(
            photo_file_name(&id, ".jpg"),
            "photo_5d713995b721c3bb38c1f5d0.jpg"
        );
    }

    #[test]
    fn test_extension_from_file_name() {
        let upload = PhotoUpload {
            file_name: Some("Campus.JPG".to_string()),
            content_type: "image/jpeg".to_string(),
            data: bytes::Bytes::from_static(b"x"),
        };
        assert_eq!(upload.extension(), ".jpg");
    }

    #[test]
    fn test_extension_falls_back_to_media_type() {
        let upload = PhotoUpload {
            file_name: Some("campus".to_string()),
            content_type: "image/png".to_string(),
            data: bytes::Bytes::from_static(b"x"),
        };
        assert_eq!(upload.extension(), ".png");

        let upload = PhotoUpload {
            file_name: None,
            ..upload
        };
        assert_eq!(upload.extension(), ".png");
    }

    #[test]
    fn test_extension_never_carries_path_segments() {
        let id = ObjectId::parse_str("5d713995b721c3bb38c1f5d0").unwrap();

        for (file_name, content_type) in [
            (None, "image/../../etc"),
            (Some("campus"), "image/..%2F..%2Fpasswd"),
            (Some("campus.j/pg"), "image/a\\b"),
            (Some("campus."), "image/svg+xml"),
        ] {
            let upload = PhotoUpload {
                file_name: file_name.map(str::to_string),
                content_type: content_type.to_string(),
                data: bytes::Bytes::from_static(b"x"),
            };
            let stored = photo_file_name(&id, &upload.extension());

            assert_eq!(stored, "photo_5d713995b721c3bb38c1f5d0");
            assert!(!stored.contains('/') && !stored.contains('\\') && !stored.contains(".."));
        }
    }

    #[test]
    fn test_only_images_are_accepted() {
        assert!(ensure_image(Some("image/png")).is_ok());
        assert!(ensure_image(Some("image/jpeg")).is_ok());

        for content_type in [Some("text/plain"), Some("application/pdf"), None] {
            let err = ensure_image(content_type).unwrap_err();
            assert_eq!(err.status(), StatusCode::NOT_FOUND);
            assert_eq!(err.message, "Please upload an image file");
        }
    }

    #[test]
    fn test_size_message() {
        let err = too_large(1_000_000);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Please upload an image less than 1000000 bytes");
    }
}

#[cfg(test)]
mod intake_tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_image_within_limit() {
        let mut multipart = multipart(&[
            Part {
                name: "caption",
                file_name: None,
                content_type: None,
                data: b"front door".to_vec(),
            },
            image(512),
        ])
        .await;

        let photo = read_photo(&mut multipart, 1024).await.unwrap();
        assert_eq!(photo.data.len(), 512);
        assert_eq!(photo.content_type, "image/jpeg");
        assert_eq!(photo.extension(), ".jpg");
    }

    #[tokio::test]
    async fn test_oversized_image_is_rejected() {
        let mut multipart = multipart(&[image(4096)]).await;

        let err = read_photo(&mut multipart, 1024).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Please upload an image less than 1024 bytes");
    }

    #[tokio::test]
    async fn test_non_image_is_rejected() {
        let mut multipart = multipart(&[Part {
            name: "file",
            file_name: Some("notes.txt"),
            content_type: Some("text/plain"),
            data: b"hello".to_vec(),
        }])
        .await;

        let err = read_photo(&mut multipart, 1024).await.unwrap_err();
        assert_eq!(err.message, "Please upload an image file");
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let mut multipart = multipart(&[Part {
            name: "photo",
            file_name: Some("campus.jpg"),
            content_type: Some("image/jpeg"),
            data: vec![1, 2, 3],
        }])
        .await;

        let err = read_photo(&mut multipart, 1024).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Please upload a file");
    }

    #[tokio::test]
    async fn test_empty_file_counts_as_missing() {
        let mut multipart = multipart(&[image(0)]).await;

        let err = read_photo(&mut multipart, 1024).await.unwrap_err();
        assert_eq!(err.message, "Please upload a file");
    }
}

#[cfg(test)]
mod storage_tests {
    use super::*;

    #[tokio::test]
    async fn test_store_photo_writes_file() {
        let dir = TempDir::new().unwrap();
        let upload_dir = dir.path().join("public").join("uploads");

        let path = store_photo(&upload_dir, "photo_abc.jpg", b"jpeg-bytes")
            .await
            .unwrap();

        assert_eq!(path, upload_dir.join("photo_abc.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_store_photo_overwrites_previous_upload() {
        let dir = TempDir::new().unwrap();

        store_photo(dir.path(), "photo_abc.jpg", b"first").await.unwrap();
        let path = store_photo(dir.path(), "photo_abc.jpg", b"second")
            .await
            .unwrap();

        assert_eq!(std::fs::read(path).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_storage_failure_is_a_server_error() {
        // A regular file where the upload directory should be
        let blocker = NamedTempFile::new().unwrap();

        let err = store_photo(blocker.path(), "photo_abc.jpg", b"jpeg-bytes")
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Problem with file upload");
    }
}
