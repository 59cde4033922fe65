use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

use super::model::ProductImage;

pub const MAX_IMAGES: usize = 5;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: String,
    pub body: Bytes,
}

/// A product form as it comes off the wire: loose text fields plus the
/// `images` file parts.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub fields: HashMap<String, String>,
    pub images: Vec<UploadedImage>,
}

/// Extension and declared content-type must both name an allowed image
/// format; either check alone is spoofable from the form side.
pub fn validate_image(image: &UploadedImage) -> Result<&'static str, ApiError> {
    let ext = image
        .filename
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    let ext = ALLOWED
        .iter()
        .find(|allowed| **allowed == ext)
        .copied()
        .ok_or_else(|| {
            ApiError::InvalidParameter(
                "Only image files (jpeg, jpg, png, webp) are allowed".into(),
            )
        })?;

    let declared = image.content_type.to_ascii_lowercase();
    if !ALLOWED.iter().any(|allowed| declared.contains(allowed)) {
        return Err(ApiError::InvalidParameter(
            "Only image files (jpeg, jpg, png, webp) are allowed".into(),
        ));
    }

    if image.body.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::InvalidParameter(
            "Image exceeds the 5MB size limit".into(),
        ));
    }
    Ok(ext)
}

pub async fn read_product_form(mut multipart: Multipart) -> Result<ProductForm, ApiError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidParameter(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "images" || name == "images[]" {
            if form.images.len() >= MAX_IMAGES {
                return Err(ApiError::InvalidParameter(
                    "At most 5 images are allowed".into(),
                ));
            }
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let body = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidParameter(format!("Failed to read image: {e}")))?;
            form.images.push(UploadedImage {
                filename,
                content_type,
                body,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::InvalidParameter(format!("Failed to read field: {e}")))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Validates and persists the uploaded files. The first image becomes the
/// primary one; alt text is derived from the product name. Every file is
/// validated before the first write so a bad file cannot leave earlier
/// files orphaned in the store.
pub async fn store_images(
    state: &AppState,
    product_name: &str,
    images: Vec<UploadedImage>,
) -> Result<Vec<ProductImage>, ApiError> {
    let exts = images
        .iter()
        .map(validate_image)
        .collect::<Result<Vec<_>, _>>()?;

    let mut stored = Vec::with_capacity(images.len());
    for (index, (image, ext)) in images.into_iter().zip(exts).enumerate() {
        let key = format!("products/product-{}.{ext}", Uuid::new_v4());
        let url = state
            .storage
            .put_image(&key, image.body, &image.content_type)
            .await?;
        stored.push(ProductImage {
            url,
            alt: format!("{product_name} image {}", index + 1),
            is_primary: index == 0,
        });
    }
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(filename: &str, content_type: &str, len: usize) -> UploadedImage {
        UploadedImage {
            filename: filename.into(),
            content_type: content_type.into(),
            body: Bytes::from(vec![0u8; len]),
        }
    }

    #[test]
    fn accepts_allowed_formats() {
        assert_eq!(validate_image(&image("a.jpg", "image/jpeg", 10)).unwrap(), "jpg");
        assert_eq!(validate_image(&image("b.PNG", "image/png", 10)).unwrap(), "png");
        assert_eq!(
            validate_image(&image("c.webp", "image/webp", 10)).unwrap(),
            "webp"
        );
    }

    #[test]
    fn rejects_disallowed_extension() {
        assert!(validate_image(&image("malware.exe", "image/png", 10)).is_err());
        assert!(validate_image(&image("noext", "image/png", 10)).is_err());
    }

    #[test]
    fn rejects_mismatched_content_type() {
        assert!(validate_image(&image("photo.png", "application/octet-stream", 10)).is_err());
        assert!(validate_image(&image("photo.png", "text/html", 10)).is_err());
    }

    #[test]
    fn rejects_oversized_files() {
        assert!(validate_image(&image("big.jpg", "image/jpeg", MAX_IMAGE_BYTES + 1)).is_err());
        assert!(validate_image(&image("fits.jpg", "image/jpeg", MAX_IMAGE_BYTES)).is_ok());
    }

    #[tokio::test]
    async fn first_stored_image_is_primary_with_derived_alt() {
        let state = AppState::fake();
        let images = vec![
            image("one.jpg", "image/jpeg", 4),
            image("two.png", "image/png", 4),
        ];
        let stored = store_images(&state, "Smartphone X", images).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored[0].is_primary);
        assert!(!stored[1].is_primary);
        assert_eq!(stored[0].alt, "Smartphone X image 1");
        assert_eq!(stored[1].alt, "Smartphone X image 2");
        assert!(stored[0].url.starts_with("https://fake.local/uploads/products/"));
        assert!(stored[0].url.ends_with(".jpg"));
        assert!(stored[1].url.ends_with(".png"));
    }

    #[tokio::test]
    async fn one_bad_file_means_nothing_is_stored() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct CountingStore(Arc<AtomicUsize>);
        #[axum::async_trait]
        impl crate::storage::ImageStore for CountingStore {
            async fn put_image(
                &self,
                key: &str,
                _body: Bytes,
                _content_type: &str,
            ) -> anyhow::Result<String> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(format!("https://fake.local/uploads/{key}"))
            }
        }

        let puts = Arc::new(AtomicUsize::new(0));
        let mut state = AppState::fake();
        state.storage = Arc::new(CountingStore(puts.clone()));

        let images = vec![
            image("one.jpg", "image/jpeg", 4),
            image("malware.exe", "application/octet-stream", 4),
        ];
        assert!(store_images(&state, "Smartphone X", images).await.is_err());
        assert_eq!(puts.load(Ordering::SeqCst), 0);
    }
}
