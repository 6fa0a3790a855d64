use std::sync::Arc;

use tracing::{debug, info};

use crate::naming::{key_strategy_for, KeyStrategy};
use crate::transform::{ImageCodec, ImageTransform, TransformOutcome};
use crate::{
    BlobConfig, BlobError, BlobPut, BlobResult, BlobStore, StoreProbe, UploadBody, UploadReceipt,
};

/// Runs one upload: transform, name, store, receipt.
///
/// Holds no per-request state; one adapter serves every request.
pub struct UploadAdapter {
    store: Arc<dyn BlobStore>,
    keys: Arc<dyn KeyStrategy>,
    transform: ImageTransform,
    config: BlobConfig,
}

impl UploadAdapter {
    /// Create an adapter with the key strategy and image rules from `config`
    pub fn new<S: BlobStore + 'static>(store: S, config: BlobConfig) -> Self {
        Self::from_arc(Arc::new(store), config)
    }

    pub fn from_arc(store: Arc<dyn BlobStore>, config: BlobConfig) -> Self {
        let keys: Arc<dyn KeyStrategy> = Arc::from(key_strategy_for(config.naming, config.probe_attempts));
        Self {
            store,
            keys,
            transform: ImageTransform::new(config.image.clone()),
            config,
        }
    }

    /// Replace the key strategy
    pub fn with_key_strategy<K: KeyStrategy + 'static>(mut self, keys: K) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    /// Replace the image codec
    pub fn with_codec<C: ImageCodec + 'static>(mut self, codec: C) -> Self {
        self.transform = ImageTransform::with_codec(self.config.image.clone(), codec);
        self
    }

    /// Store one file and describe where it went
    pub async fn put(&self, put: BlobPut, body: UploadBody) -> BlobResult<UploadReceipt> {
        let declared = body.len().max(put.size);
        if declared > self.config.max_file_bytes {
            return Err(BlobError::TooLarge {
                size: declared,
                max: self.config.max_file_bytes,
            });
        }

        let (body, content_type) = self.prepare(&put, body).await?;

        let key = self
            .keys
            .resolve_key(&put.filename, &StoreProbe(self.store.as_ref()))
            .await?;

        let size = body.len();
        let result = self
            .store
            .put(&key, &content_type, size, body.into_stream())
            .await?;

        info!(
            key = %key,
            size = result.size_bytes,
            content_type = %content_type,
            etag = result.etag.as_deref().unwrap_or("-"),
            "upload stored"
        );

        Ok(UploadReceipt::new(self.store.public_url(&key), key, result.size_bytes)
            .with_filename(put.filename)
            .with_content_type(content_type))
    }

    /// Downsample image payloads; everything else passes through untouched.
    async fn prepare(&self, put: &BlobPut, body: UploadBody) -> BlobResult<(UploadBody, String)> {
        if !self.transform.applies_to(&put.content_type) {
            return Ok((body, put.content_type.clone()));
        }

        let bytes = body.collect(self.config.max_file_bytes).await?;
        let transform = self.transform.clone();
        let content_type = put.content_type.clone();

        let outcome = tokio::task::spawn_blocking(move || transform.apply(bytes, &content_type))
            .await
            .map_err(BlobError::backend)??;

        Ok(match outcome {
            TransformOutcome::Transformed {
                bytes,
                content_type,
                width,
                height,
            } => {
                debug!(width, height, size = bytes.len(), "image payload replaced");
                (UploadBody::Bytes(bytes), content_type)
            }
            TransformOutcome::Passthrough(bytes) => (UploadBody::Bytes(bytes), put.content_type.clone()),
        })
    }

    pub fn config(&self) -> &BlobConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::DecodedImage;
    use crate::{ExistenceProbe, ImageRules, NamingMode, PutResult};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::StreamExt;
    use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<HashMap<String, (String, Bytes)>>,
        probes: Mutex<Vec<String>>,
        reject: Option<(u16, String)>,
    }

    impl MemoryStore {
        fn rejecting(status: u16, body: &str) -> Self {
            Self {
                reject: Some((status, body.to_string())),
                ..Default::default()
            }
        }

        fn object(&self, key: &str) -> Option<(String, Bytes)> {
            self.objects.lock().unwrap().get(key).cloned()
        }

        fn object_count(&self) -> usize {
            self.objects.lock().unwrap().len()
        }

        fn probe_count(&self) -> usize {
            self.probes.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl BlobStore for MemoryStore {
        async fn exists(&self, key: &str) -> BlobResult<bool> {
            self.probes.lock().unwrap().push(key.to_string());
            Ok(self.objects.lock().unwrap().contains_key(key))
        }

        async fn put(
            &self,
            key: &str,
            content_type: &str,
            content_length: u64,
            mut stream: crate::ByteStream,
        ) -> BlobResult<PutResult> {
            if let Some((status, body)) = &self.reject {
                return Err(BlobError::Rejected {
                    status: *status,
                    body: body.clone(),
                });
            }
            let mut data = Vec::new();
            while let Some(chunk) = stream.next().await {
                data.extend_from_slice(&chunk?);
            }
            assert_eq!(data.len() as u64, content_length);
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), (content_type.to_string(), Bytes::from(data)));
            Ok(PutResult {
                etag: Some("\"etag-1\"".to_string()),
                size_bytes: content_length,
            })
        }

        fn public_url(&self, key: &str) -> String {
            format!("https://acct.blob.core.windows.net/uploads/{}", key)
        }
    }

    fn png(width: u32, height: u32) -> Bytes {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 100, 50]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut out, ImageFormat::Png).unwrap();
        Bytes::from(out.into_inner())
    }

    fn adapter(store: &Arc<MemoryStore>, config: BlobConfig) -> UploadAdapter {
        UploadAdapter::from_arc(store.clone(), config)
    }

    #[tokio::test]
    async fn text_file_gets_unique_key_and_receipt() {
        let store = Arc::new(MemoryStore::default());
        let adapter = adapter(&store, BlobConfig::default());

        let body = Bytes::from_static(b"hello blob");
        let put = BlobPut::new("notes.txt").with_content_type("text/plain").with_size(10);
        let receipt = adapter.put(put, UploadBody::Bytes(body.clone())).await.unwrap();

        assert!(receipt.key.ends_with(".txt"));
        assert_eq!(receipt.key.len(), 36 + 4);
        assert_eq!(receipt.url, format!("https://acct.blob.core.windows.net/uploads/{}", receipt.key));
        assert_eq!(receipt.filename, "notes.txt");
        assert_eq!(receipt.content_type, "text/plain");
        assert_eq!(receipt.size, 10);
        assert_eq!(store.probe_count(), 1);
        assert_eq!(store.object(&receipt.key), Some(("text/plain".to_string(), body)));
    }

    #[tokio::test]
    async fn original_naming_skips_probe() {
        let store = Arc::new(MemoryStore::default());
        let adapter = adapter(&store, BlobConfig::default().with_naming(NamingMode::Original));

        let put = BlobPut::new("my notes.txt").with_content_type("text/plain");
        let receipt = adapter
            .put(put, UploadBody::Bytes(Bytes::from_static(b"x")))
            .await
            .unwrap();

        assert_eq!(receipt.key, "my%20notes.txt");
        assert_eq!(receipt.filename, "my notes.txt");
        assert_eq!(store.probe_count(), 0);
    }

    #[tokio::test]
    async fn oversized_upload_never_reaches_store() {
        let store = Arc::new(MemoryStore::default());
        let adapter = adapter(&store, BlobConfig::default().with_max_file_bytes(4));

        let put = BlobPut::new("big.bin");
        let err = adapter
            .put(put, UploadBody::Bytes(Bytes::from_static(b"12345")))
            .await
            .unwrap_err();

        assert!(matches!(err, BlobError::TooLarge { size: 5, max: 4 }));
        assert_eq!(store.probe_count(), 0);
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn wide_image_is_stored_downsampled() {
        let store = Arc::new(MemoryStore::default());
        let config = BlobConfig::default().with_image_rules(ImageRules::new(100, 80));
        let adapter = adapter(&store, config);

        let source = png(400, 200);
        let put = BlobPut::new("banner.png")
            .with_content_type("image/png")
            .with_size(source.len() as u64);
        let receipt = adapter.put(put, UploadBody::Bytes(source)).await.unwrap();

        let (content_type, stored) = store.object(&receipt.key).unwrap();
        assert_eq!(content_type, "image/png");
        assert_eq!(receipt.size, stored.len() as u64);
        assert_eq!(image::load_from_memory(&stored).unwrap().dimensions(), (100, 50));
    }

    #[tokio::test]
    async fn image_transform_can_be_disabled() {
        let store = Arc::new(MemoryStore::default());
        let adapter = adapter(&store, BlobConfig::default().without_image_transform());

        let source = png(1200, 10);
        let put = BlobPut::new("wide.png").with_content_type("image/png");
        let receipt = adapter.put(put, UploadBody::Bytes(source.clone())).await.unwrap();

        assert_eq!(store.object(&receipt.key).unwrap().1, source);
    }

    #[tokio::test]
    async fn undecodable_image_is_stored_unchanged() {
        let store = Arc::new(MemoryStore::default());
        let adapter = adapter(&store, BlobConfig::default());

        let body = Bytes::from_static(b"definitely not a jpeg");
        let put = BlobPut::new("broken.jpg").with_content_type("image/jpeg");
        let receipt = adapter.put(put, UploadBody::Bytes(body.clone())).await.unwrap();

        assert_eq!(receipt.content_type, "image/jpeg");
        assert_eq!(store.object(&receipt.key), Some(("image/jpeg".to_string(), body)));
    }

    #[tokio::test]
    async fn storage_rejection_propagates() {
        let store = Arc::new(MemoryStore::rejecting(403, "AuthenticationFailed"));
        let adapter = adapter(&store, BlobConfig::default());

        let put = BlobPut::new("a.txt").with_content_type("text/plain");
        let err = adapter
            .put(put, UploadBody::Bytes(Bytes::from_static(b"a")))
            .await
            .unwrap_err();

        match err {
            BlobError::Rejected { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "AuthenticationFailed");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    /// Decodes anything to a fixed 1000x10 JPEG and records each encode call.
    #[derive(Clone, Default)]
    struct RecordingCodec {
        encodes: Arc<Mutex<Vec<(u8, (u32, u32))>>>,
    }

    impl ImageCodec for RecordingCodec {
        fn decode(&self, _bytes: &[u8], _content_type: &str) -> BlobResult<DecodedImage> {
            Ok(DecodedImage {
                format: ImageFormat::Jpeg,
                pixels: DynamicImage::new_rgb8(1000, 10),
            })
        }

        fn encode(&self, image: &DecodedImage, quality: u8) -> BlobResult<Vec<u8>> {
            self.encodes.lock().unwrap().push((quality, image.dimensions()));
            Ok(b"re-encoded".to_vec())
        }
    }

    struct FixedKey(&'static str);

    #[async_trait]
    impl KeyStrategy for FixedKey {
        async fn resolve_key(&self, _original_name: &str, _probe: &dyn ExistenceProbe) -> BlobResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn custom_codec_receives_configured_quality() {
        let store = Arc::new(MemoryStore::default());
        let codec = RecordingCodec::default();
        let config = BlobConfig::default().with_image_rules(ImageRules::new(100, 42));
        let adapter = adapter(&store, config).with_codec(codec.clone());

        let put = BlobPut::new("photo.jpg").with_content_type("image/jpeg");
        let receipt = adapter
            .put(put, UploadBody::Bytes(Bytes::from_static(b"raw camera bytes")))
            .await
            .unwrap();

        assert_eq!(*codec.encodes.lock().unwrap(), vec![(42, (100, 1))]);
        assert_eq!(receipt.size, 10);
        assert_eq!(receipt.content_type, "image/jpeg");
        assert_eq!(
            store.object(&receipt.key),
            Some(("image/jpeg".to_string(), Bytes::from_static(b"re-encoded")))
        );
    }

    #[tokio::test]
    async fn custom_key_strategy_decides_the_key() {
        let store = Arc::new(MemoryStore::default());
        let adapter = adapter(&store, BlobConfig::default()).with_key_strategy(FixedKey("fixed-key.txt"));

        let put = BlobPut::new("notes.txt").with_content_type("text/plain");
        let receipt = adapter
            .put(put, UploadBody::Bytes(Bytes::from_static(b"hi")))
            .await
            .unwrap();

        assert_eq!(receipt.key, "fixed-key.txt");
        assert_eq!(receipt.url, "https://acct.blob.core.windows.net/uploads/fixed-key.txt");
        assert_eq!(receipt.filename, "notes.txt");
        assert_eq!(store.probe_count(), 0);
        assert_eq!(
            store.object("fixed-key.txt"),
            Some(("text/plain".to_string(), Bytes::from_static(b"hi")))
        );
    }
}
