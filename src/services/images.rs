//! Property image lookup as an ordered chain of resolver strategies.

use crate::services::gateway::{GatewayClient, GatewayError};
use crate::services::storage::{ObjectStore, StorageError};
use async_trait::async_trait;
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

/// File extensions tried, in order, for `{property_id}.{ext}`
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Default placeholder size in pixels
pub const PLACEHOLDER_WIDTH: u32 = 480;
pub const PLACEHOLDER_HEIGHT: u32 = 320;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("image encoding error: {0}")]
    Encode(#[from] image::ImageError),
}

/// Where a resolved image came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    ObjectStore { key: String },
    LookupTable { url: String },
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub bytes: Vec<u8>,
    pub source: ImageSource,
}

/// One strategy in the chain
///
/// `Ok(None)` means "not found here, try the next one".
#[async_trait]
pub trait ImageResolver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, property_id: &str) -> Result<Option<ResolvedImage>, ImageError>;
}

/// `{id}.jpg`, `{id}.jpeg`, `{id}.png`, `{id}.webp` in the image bucket
pub struct ConventionalFilenameResolver {
    store: Arc<ObjectStore>,
    bucket: String,
}

impl ConventionalFilenameResolver {
    pub fn new(store: Arc<ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ImageResolver for ConventionalFilenameResolver {
    fn name(&self) -> &'static str {
        "conventional-filename"
    }

    async fn resolve(&self, property_id: &str) -> Result<Option<ResolvedImage>, ImageError> {
        for ext in IMAGE_EXTENSIONS {
            let key = format!("{}.{}", property_id, ext);
            match self.store.download(&self.bucket, &key).await {
                Ok(bytes) => {
                    return Ok(Some(ResolvedImage {
                        bytes,
                        source: ImageSource::ObjectStore { key },
                    }))
                }
                Err(StorageError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

/// Stored URL from the `property_images` lookup table
///
/// The stored value may be an absolute URL or a key inside the image bucket.
pub struct LookupTableResolver {
    gateway: Arc<GatewayClient>,
    store: Arc<ObjectStore>,
    bucket: String,
}

impl LookupTableResolver {
    pub fn new(gateway: Arc<GatewayClient>, store: Arc<ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            gateway,
            store,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ImageResolver for LookupTableResolver {
    fn name(&self) -> &'static str {
        "lookup-table"
    }

    async fn resolve(&self, property_id: &str) -> Result<Option<ResolvedImage>, ImageError> {
        let Some(url) = self.gateway.image_url_for(property_id).await? else {
            return Ok(None);
        };

        let fetched = if url.starts_with("http://") || url.starts_with("https://") {
            self.store.fetch_url(&url).await
        } else {
            self.store.download(&self.bucket, &url).await
        };

        match fetched {
            Ok(bytes) => Ok(Some(ResolvedImage {
                bytes,
                source: ImageSource::LookupTable { url },
            })),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Fixed placeholder, always found
pub struct PlaceholderResolver {
    bytes: Vec<u8>,
}

impl PlaceholderResolver {
    /// Light gray PNG with a darker border
    pub fn new(width: u32, height: u32) -> Result<Self, ImageError> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            let border = x < 4 || y < 4 || x + 4 >= width || y + 4 >= height;
            if border {
                image::Rgb([150, 156, 165])
            } else {
                image::Rgb([214, 218, 224])
            }
        });

        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png)?;

        Ok(Self {
            bytes: buf.into_inner(),
        })
    }
}

#[async_trait]
impl ImageResolver for PlaceholderResolver {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    async fn resolve(&self, _property_id: &str) -> Result<Option<ResolvedImage>, ImageError> {
        Ok(Some(ResolvedImage {
            bytes: self.bytes.clone(),
            source: ImageSource::Placeholder,
        }))
    }
}

/// Resolvers evaluated in order until the first hit
#[derive(Default)]
pub struct ImageResolverChain {
    resolvers: Vec<Box<dyn ImageResolver>>,
}

impl ImageResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl ImageResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// The standard chain: conventional filenames, lookup table, placeholder
    pub fn standard(
        gateway: Arc<GatewayClient>,
        store: Arc<ObjectStore>,
        bucket: &str,
        placeholder_size: (u32, u32),
    ) -> Result<Self, ImageError> {
        let (width, height) = placeholder_size;
        Ok(Self::new()
            .with(ConventionalFilenameResolver::new(store.clone(), bucket))
            .with(LookupTableResolver::new(gateway, store, bucket))
            .with(PlaceholderResolver::new(width.max(8), height.max(8))?))
    }

    /// First image found; resolver errors are logged and skipped
    pub async fn resolve(&self, property_id: &str) -> Option<ResolvedImage> {
        for resolver in &self.resolvers {
            match resolver.resolve(property_id).await {
                Ok(Some(image)) => {
                    tracing::debug!("Image for {} resolved by {}", property_id, resolver.name());
                    return Some(image);
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(
                        "Image resolver {} failed for {}, trying next: {}",
                        resolver.name(),
                        property_id,
                        e
                    );
                }
            }
        }

        tracing::debug!("No image resolved for {}", property_id);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Miss;

    #[async_trait]
    impl ImageResolver for Miss {
        fn name(&self) -> &'static str {
            "miss"
        }

        async fn resolve(&self, _property_id: &str) -> Result<Option<ResolvedImage>, ImageError> {
            Ok(None)
        }
    }

    struct Broken;

    #[async_trait]
    impl ImageResolver for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn resolve(&self, _property_id: &str) -> Result<Option<ResolvedImage>, ImageError> {
            Err(ImageError::Storage(StorageError::ApiError("boom".to_string())))
        }
    }

    struct Hit(&'static str);

    #[async_trait]
    impl ImageResolver for Hit {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn resolve(&self, _property_id: &str) -> Result<Option<ResolvedImage>, ImageError> {
            Ok(Some(ResolvedImage {
                bytes: self.0.as_bytes().to_vec(),
                source: ImageSource::ObjectStore {
                    key: self.0.to_string(),
                },
            }))
        }
    }

    #[tokio::test]
    async fn test_first_hit_wins() {
        let chain = ImageResolverChain::new().with(Miss).with(Hit("first")).with(Hit("second"));
        let image = chain.resolve("p1").await.unwrap();
        assert_eq!(image.bytes, b"first");
    }

    #[tokio::test]
    async fn test_errors_fall_through() {
        let chain = ImageResolverChain::new().with(Broken).with(Hit("after-error"));
        let image = chain.resolve("p1").await.unwrap();
        assert_eq!(image.bytes, b"after-error");
    }

    #[tokio::test]
    async fn test_placeholder_terminates_chain() {
        let chain = ImageResolverChain::new()
            .with(Miss)
            .with(Broken)
            .with(PlaceholderResolver::new(8, 8).unwrap());

        let image = chain.resolve("p1").await.unwrap();
        assert_eq!(image.source, ImageSource::Placeholder);
        assert_eq!(image::guess_format(&image.bytes).unwrap(), image::ImageFormat::Png);
    }

    #[tokio::test]
    async fn test_empty_chain_resolves_nothing() {
        assert!(ImageResolverChain::new().resolve("p1").await.is_none());
    }
}
