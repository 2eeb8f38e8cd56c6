//! AI product upload: photos in, reviewable product drafts out.
//!
//! The flow is a linear state machine:
//!
//! ```text
//! idle -> uploading -> processing -> enhancing -> results
//! ```
//!
//! - `uploading` validates the photos and base64-encodes them
//! - `processing` makes one call to the detection edge function
//! - `enhancing` moves inline enhanced images into storage
//! - `results` holds the drafts, all pre-selected, until saved or discarded
//!
//! Any failure drops the flow back to `idle`. Nothing is retried.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bizgrow_core::{Money, MoneyError, StoreId};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::supabase::{Caller, ProductInput, SupabaseClient, SupabaseError, extension_for};

/// Most photos accepted in one upload.
pub const MAX_FILES: usize = 10;

/// Largest accepted photo, in bytes.
pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

/// Session key holding the latest flow state.
pub const SESSION_KEY: &str = "ai_upload";

/// Errors that abort the upload flow.
#[derive(Debug, Error)]
pub enum AiUploadError {
    #[error("Select at least one photo")]
    NoImages,

    #[error("Upload at most 10 photos at a time (got {0})")]
    TooManyFiles(usize),

    #[error("{file} is not a JPEG, PNG or WebP image")]
    UnsupportedType { file: String },

    #[error("{file} is larger than 5 MB")]
    TooLarge { file: String },

    #[error("Product detection failed: {0}")]
    Detection(#[source] SupabaseError),

    #[error("Invalid price for {name}: {source}")]
    InvalidPrice {
        name: String,
        #[source]
        source: MoneyError,
    },

    #[error("Nothing selected to save")]
    NothingSelected,
}

impl AiUploadError {
    /// Query-string code used when redirecting back to the upload page.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoImages => "no_images",
            Self::TooManyFiles(_) => "too_many_files",
            Self::UnsupportedType { .. } => "unsupported_type",
            Self::TooLarge { .. } => "too_large",
            Self::Detection(_) => "detection_failed",
            Self::InvalidPrice { .. } => "invalid_price",
            Self::NothingSelected => "nothing_selected",
        }
    }
}

/// Phase of the upload flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiPhase {
    #[default]
    Idle,
    Uploading,
    Processing,
    Enhancing,
    Results,
}

impl AiPhase {
    /// Phases in the order a successful run visits them.
    pub const SEQUENCE: [Self; 5] = [
        Self::Idle,
        Self::Uploading,
        Self::Processing,
        Self::Enhancing,
        Self::Results,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Enhancing => "enhancing",
            Self::Results => "results",
        }
    }

    /// Label shown in the progress stepper.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Choose photos",
            Self::Uploading => "Uploading",
            Self::Processing => "Detecting products",
            Self::Enhancing => "Enhancing images",
            Self::Results => "Review",
        }
    }
}

impl fmt::Display for AiPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A photo received from the upload form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Request body of the detection function.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionRequest {
    pub images: Vec<String>,
}

/// Reply of the detection function.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionResponse {
    #[serde(default)]
    pub products: Vec<DetectedProduct>,
    #[serde(default)]
    pub errors: Vec<DetectionIssue>,
}

/// One product found in the photos.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectedProduct {
    pub name: String,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Public URL, data URL or bare base64 of the cleaned-up image.
    #[serde(default)]
    pub enhanced_image: Option<String>,
    /// Index of the photo the product was found in.
    #[serde(default)]
    pub source_index: Option<usize>,
}

/// Per-photo problem reported by the detection function.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DetectionIssue {
    Message(String),
    Detailed {
        #[serde(alias = "error")]
        message: String,
        #[serde(default)]
        source_index: Option<usize>,
    },
}

impl fmt::Display for DetectionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(message)
            | Self::Detailed {
                message,
                source_index: None,
            } => f.write_str(message),
            Self::Detailed {
                message,
                source_index: Some(index),
            } => write!(f, "Photo {}: {message}", index + 1),
        }
    }
}

/// Runs product detection on base64 photos.
pub trait ProductDetector {
    fn detect(
        &self,
        request: &DetectionRequest,
    ) -> impl Future<Output = Result<DetectionResponse, SupabaseError>> + Send;
}

/// Stores an image and returns its public URL.
pub trait ImageStore {
    fn store_image(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<String, SupabaseError>> + Send;
}

/// The backend acting for a signed-in merchant.
#[derive(Clone, Copy)]
pub struct MerchantBackend<'a> {
    pub client: &'a SupabaseClient,
    pub access_token: &'a SecretString,
}

impl ProductDetector for MerchantBackend<'_> {
    fn detect(
        &self,
        request: &DetectionRequest,
    ) -> impl Future<Output = Result<DetectionResponse, SupabaseError>> + Send {
        self.client.invoke_function(
            Caller::User(self.access_token),
            self.client.detect_function(),
            request,
        )
    }
}

impl ImageStore for MerchantBackend<'_> {
    fn store_image(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<String, SupabaseError>> + Send {
        self.client
            .upload_object(Caller::User(self.access_token), path, content_type, bytes)
    }
}

/// A detected product awaiting review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftProduct {
    pub name: String,
    pub price: Money,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub selected: bool,
}

/// Outcome of a finished run, kept in the session for review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResults {
    pub drafts: Vec<DraftProduct>,
    pub errors: Vec<String>,
}

impl AiResults {
    /// Build product rows from the review form.
    ///
    /// The form carries `selected_{i}` for ticked drafts and optional
    /// `name_{i}`, `price_{i}`, `category_{i}` and `description_{i}` edits.
    ///
    /// # Errors
    ///
    /// Returns [`AiUploadError::NothingSelected`] if no draft is ticked, or
    /// [`AiUploadError::InvalidPrice`] if an edited price does not parse.
    pub fn to_inputs(
        &self,
        store_id: StoreId,
        form: &HashMap<String, String>,
    ) -> Result<Vec<ProductInput>, AiUploadError> {
        let field = |name: &str, index: usize| {
            form.get(&format!("{name}_{index}"))
                .map(|v| v.trim().to_string())
        };

        let mut inputs = Vec::new();
        for (index, draft) in self.drafts.iter().enumerate() {
            if !form.contains_key(&format!("selected_{index}")) {
                continue;
            }
            let name = field("name", index)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| draft.name.clone());
            let price = match field("price", index) {
                Some(raw) if !raw.is_empty() => Money::parse_input(&raw)
                    .map_err(|source| AiUploadError::InvalidPrice {
                        name: name.clone(),
                        source,
                    })?,
                _ => draft.price,
            };
            let category = field("category", index).map_or_else(
                || draft.category.clone(),
                |c| Some(c).filter(|c| !c.is_empty()),
            );
            let description = field("description", index).map_or_else(
                || draft.description.clone(),
                |d| Some(d).filter(|d| !d.is_empty()),
            );
            inputs.push(ProductInput {
                store_id,
                name,
                description,
                price,
                category,
                image_url: draft.image_url.clone(),
                stock_quantity: 0,
                is_available: true,
            });
        }

        if inputs.is_empty() {
            return Err(AiUploadError::NothingSelected);
        }
        Ok(inputs)
    }
}

/// State kept in the session between the upload and review pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiUploadState {
    pub history: Vec<AiPhase>,
    pub results: Option<AiResults>,
}

impl AiUploadState {
    /// Current phase: the last one recorded.
    #[must_use]
    pub fn phase(&self) -> AiPhase {
        self.history.last().copied().unwrap_or_default()
    }
}

/// One run of the upload state machine.
#[derive(Debug, Clone)]
pub struct AiUploadFlow {
    history: Vec<AiPhase>,
}

impl Default for AiUploadFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl AiUploadFlow {
    #[must_use]
    pub fn new() -> Self {
        Self {
            history: vec![AiPhase::Idle],
        }
    }

    #[must_use]
    pub fn phase(&self) -> AiPhase {
        self.history.last().copied().unwrap_or_default()
    }

    /// Every phase entered so far, starting at `idle`.
    #[must_use]
    pub fn history(&self) -> &[AiPhase] {
        &self.history
    }

    fn enter(&mut self, phase: AiPhase) {
        self.history.push(phase);
    }

    fn fail(&mut self, error: AiUploadError) -> AiUploadError {
        warn!(error = %error, phase = %self.phase(), "AI upload aborted");
        self.enter(AiPhase::Idle);
        error
    }

    /// Run the whole flow over `images`.
    ///
    /// # Errors
    ///
    /// Returns a validation error or [`AiUploadError::Detection`]; the flow
    /// is back in `idle` afterwards.
    #[instrument(skip_all, fields(store_id = %store_id, images = images.len()))]
    pub async fn run<B>(
        &mut self,
        backend: &B,
        store_id: StoreId,
        images: Vec<ImageUpload>,
    ) -> Result<AiResults, AiUploadError>
    where
        B: ProductDetector + ImageStore + Sync,
    {
        self.enter(AiPhase::Uploading);
        let prepared = match prepare_images(images) {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.fail(e)),
        };

        self.enter(AiPhase::Processing);
        let request = DetectionRequest {
            images: prepared.iter().map(|p| BASE64.encode(&p.bytes)).collect(),
        };
        let response = match backend.detect(&request).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(AiUploadError::Detection(e))),
        };

        self.enter(AiPhase::Enhancing);
        let mut errors: Vec<String> = response.errors.iter().map(ToString::to_string).collect();
        let mut drafts = Vec::with_capacity(response.products.len());
        for product in response.products {
            let image_url =
                resolve_image(backend, store_id, &product, &prepared, &mut errors).await;
            drafts.push(DraftProduct {
                name: product.name.trim().to_string(),
                price: product.price.unwrap_or(Money::ZERO),
                category: product.category.filter(|c| !c.trim().is_empty()),
                description: product.description.filter(|d| !d.trim().is_empty()),
                image_url,
                selected: true,
            });
        }

        self.enter(AiPhase::Results);
        info!(
            detected = drafts.len(),
            errors = errors.len(),
            "AI upload finished"
        );
        Ok(AiResults { drafts, errors })
    }

    /// Snapshot for the session.
    #[must_use]
    pub fn into_state(self, results: Option<AiResults>) -> AiUploadState {
        AiUploadState {
            history: self.history,
            results,
        }
    }
}

/// A validated photo.
#[derive(Debug)]
struct PreparedImage {
    content_type: &'static str,
    bytes: Vec<u8>,
}

fn prepare_images(images: Vec<ImageUpload>) -> Result<Vec<PreparedImage>, AiUploadError> {
    if images.is_empty() {
        return Err(AiUploadError::NoImages);
    }
    if images.len() > MAX_FILES {
        return Err(AiUploadError::TooManyFiles(images.len()));
    }
    images
        .into_iter()
        .map(|image| {
            if image.bytes.len() > MAX_FILE_BYTES {
                return Err(AiUploadError::TooLarge {
                    file: image.file_name,
                });
            }
            let content_type =
                sniff_image_type(&image.bytes).ok_or_else(|| AiUploadError::UnsupportedType {
                    file: image.file_name.clone(),
                })?;
            Ok(PreparedImage {
                content_type,
                bytes: image.bytes,
            })
        })
        .collect()
}

/// Detect JPEG, PNG or WebP from the file's magic bytes.
#[must_use]
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

/// Where a draft's image comes from.
#[derive(Debug, PartialEq, Eq)]
enum ImageSource {
    Url(String),
    Inline {
        content_type: &'static str,
        bytes: Vec<u8>,
    },
}

/// Classify an `enhanced_image` value.
fn parse_image_source(value: &str) -> Option<ImageSource> {
    let value = value.trim();
    if value.starts_with("https://") || value.starts_with("http://") {
        return Some(ImageSource::Url(value.to_string()));
    }
    let payload = match value.strip_prefix("data:") {
        Some(rest) => rest.split_once(";base64,")?.1,
        None => value,
    };
    let bytes = BASE64.decode(payload).ok()?;
    let content_type = sniff_image_type(&bytes)?;
    Some(ImageSource::Inline {
        content_type,
        bytes,
    })
}

/// Pick a stored URL for a draft's image.
///
/// Inline enhanced images are uploaded; without one, the source photo is
/// uploaded instead. Upload problems become per-item messages.
async fn resolve_image<S: ImageStore>(
    store: &S,
    store_id: StoreId,
    product: &DetectedProduct,
    prepared: &[PreparedImage],
    errors: &mut Vec<String>,
) -> Option<String> {
    let source = match product.enhanced_image.as_deref().map(parse_image_source) {
        Some(Some(source)) => source,
        Some(None) => {
            errors.push(format!("{}: enhanced image was unreadable", product.name));
            return None;
        }
        None => {
            let original = product.source_index.and_then(|i| prepared.get(i))?;
            ImageSource::Inline {
                content_type: original.content_type,
                bytes: original.bytes.clone(),
            }
        }
    };

    match source {
        ImageSource::Url(url) => Some(url),
        ImageSource::Inline {
            content_type,
            bytes,
        } => {
            let path = format!(
                "{store_id}/ai/{}.{}",
                Uuid::new_v4(),
                extension_for(content_type)
            );
            match store.store_image(&path, content_type, bytes).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(error = %e, product = %product.name, "Failed to store enhanced image");
                    errors.push(format!("{}: image could not be saved", product.name));
                    None
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0];

    struct FakeBackend {
        response: Result<serde_json::Value, u16>,
        requests: Mutex<Vec<usize>>,
        stored: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn replying(value: serde_json::Value) -> Self {
            Self {
                response: Ok(value),
                requests: Mutex::new(Vec::new()),
                stored: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                response: Err(status),
                requests: Mutex::new(Vec::new()),
                stored: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProductDetector for FakeBackend {
        fn detect(
            &self,
            request: &DetectionRequest,
        ) -> impl Future<Output = Result<DetectionResponse, SupabaseError>> + Send {
            self.requests.lock().unwrap().push(request.images.len());
            let result = match &self.response {
                Ok(value) => Ok(serde_json::from_value(value.clone()).unwrap()),
                Err(status) => Err(SupabaseError::Api {
                    status: *status,
                    message: "boom".to_string(),
                }),
            };
            async move { result }
        }
    }

    impl ImageStore for FakeBackend {
        fn store_image(
            &self,
            path: &str,
            _content_type: &str,
            _bytes: Vec<u8>,
        ) -> impl Future<Output = Result<String, SupabaseError>> + Send {
            self.stored.lock().unwrap().push(path.to_string());
            let url = format!("https://cdn.test/{path}");
            async move { Ok(url) }
        }
    }

    fn photo(name: &str, bytes: &[u8]) -> ImageUpload {
        ImageUpload {
            file_name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_successful_run_visits_every_phase() {
        let backend = FakeBackend::replying(json!({
            "products": [
                { "name": "Masala Chai", "price": 120, "category": "Beverages",
                  "enhanced_image": "https://cdn.test/chai.png", "source_index": 0 },
                { "name": "Rusk", "price": "40.50", "source_index": 1,
                  "enhanced_image": "https://cdn.test/rusk.png" }
            ],
            "errors": []
        }));
        let mut flow = AiUploadFlow::new();
        let results = flow
            .run(
                &backend,
                StoreId::random(),
                vec![photo("a.png", PNG), photo("b.jpg", JPEG)],
            )
            .await
            .unwrap();

        assert_eq!(flow.history(), &AiPhase::SEQUENCE);
        assert_eq!(results.drafts.len(), 2);
        assert!(results.drafts.iter().all(|d| d.selected));
        assert_eq!(results.drafts[1].price, Money::parse_input("40.50").unwrap());
        assert_eq!(*backend.requests.lock().unwrap(), vec![2]);
        assert!(backend.stored.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inline_images_are_uploaded() {
        let data_url = format!("data:image/png;base64,{}", BASE64.encode(PNG));
        let backend = FakeBackend::replying(json!({
            "products": [{ "name": "Chai", "price": 10, "enhanced_image": data_url }]
        }));
        let store_id = StoreId::random();
        let mut flow = AiUploadFlow::new();
        let results = flow
            .run(&backend, store_id, vec![photo("a.png", PNG)])
            .await
            .unwrap();

        let url = results.drafts[0].image_url.clone().unwrap();
        assert!(url.starts_with(&format!("https://cdn.test/{store_id}/ai/")));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_missing_enhanced_image_uses_source_photo() {
        let backend = FakeBackend::replying(json!({
            "products": [{ "name": "Chai", "source_index": 0 }]
        }));
        let mut flow = AiUploadFlow::new();
        let results = flow
            .run(&backend, StoreId::random(), vec![photo("a.jpg", JPEG)])
            .await
            .unwrap();

        assert!(results.drafts[0].image_url.as_deref().unwrap().ends_with(".jpg"));
        assert_eq!(results.drafts[0].price, Money::ZERO);
    }

    #[tokio::test]
    async fn test_detection_errors_are_collected() {
        let backend = FakeBackend::replying(json!({
            "products": [{ "name": "Chai", "enhanced_image": "not base64!" }],
            "errors": ["rate limited", { "message": "blurry", "source_index": 1 }]
        }));
        let mut flow = AiUploadFlow::new();
        let results = flow
            .run(&backend, StoreId::random(), vec![photo("a.png", PNG)])
            .await
            .unwrap();

        assert_eq!(
            results.errors,
            vec![
                "rate limited".to_string(),
                "Photo 2: blurry".to_string(),
                "Chai: enhanced image was unreadable".to_string(),
            ]
        );
        assert_eq!(results.drafts[0].image_url, None);
    }

    #[tokio::test]
    async fn test_detection_failure_returns_to_idle() {
        let backend = FakeBackend::failing(500);
        let mut flow = AiUploadFlow::new();
        let err = flow
            .run(&backend, StoreId::random(), vec![photo("a.png", PNG)])
            .await
            .unwrap_err();

        assert!(matches!(err, AiUploadError::Detection(_)));
        assert_eq!(flow.phase(), AiPhase::Idle);
        assert_eq!(
            flow.history(),
            &[
                AiPhase::Idle,
                AiPhase::Uploading,
                AiPhase::Processing,
                AiPhase::Idle
            ]
        );
    }

    #[tokio::test]
    async fn test_validation_happens_before_detection() {
        let backend = FakeBackend::replying(json!({ "products": [] }));
        let mut flow = AiUploadFlow::new();

        let err = flow
            .run(&backend, StoreId::random(), vec![photo("notes.txt", b"hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, AiUploadError::UnsupportedType { .. }));

        let err = flow
            .run(&backend, StoreId::random(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AiUploadError::NoImages));

        let many = (0..=MAX_FILES).map(|i| photo(&format!("{i}.png"), PNG)).collect();
        let err = flow.run(&backend, StoreId::random(), many).await.unwrap_err();
        assert!(matches!(err, AiUploadError::TooManyFiles(11)));

        let mut big = PNG.to_vec();
        big.resize(MAX_FILE_BYTES + 1, 0);
        let err = flow
            .run(&backend, StoreId::random(), vec![photo("big.png", &big)])
            .await
            .unwrap_err();
        assert!(matches!(err, AiUploadError::TooLarge { .. }));

        assert!(backend.requests.lock().unwrap().is_empty());
        assert_eq!(flow.phase(), AiPhase::Idle);
    }

    #[test]
    fn test_sniff_image_type() {
        assert_eq!(sniff_image_type(PNG), Some("image/png"));
        assert_eq!(sniff_image_type(JPEG), Some("image/jpeg"));
        assert_eq!(sniff_image_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_type(b"GIF89a"), None);
    }

    #[test]
    fn test_parse_image_source_bare_base64() {
        let source = parse_image_source(&BASE64.encode(JPEG)).unwrap();
        assert!(matches!(
            source,
            ImageSource::Inline {
                content_type: "image/jpeg",
                ..
            }
        ));
    }

    fn results() -> AiResults {
        AiResults {
            drafts: vec![
                DraftProduct {
                    name: "Chai".to_string(),
                    price: Money::from_rupees(120),
                    category: Some("Beverages".to_string()),
                    description: None,
                    image_url: Some("https://cdn.test/chai.png".to_string()),
                    selected: true,
                },
                DraftProduct {
                    name: "Rusk".to_string(),
                    price: Money::from_rupees(40),
                    category: None,
                    description: None,
                    image_url: None,
                    selected: true,
                },
            ],
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_to_inputs_applies_edits_to_selected() {
        let form: HashMap<String, String> = [
            ("selected_1", "on"),
            ("name_1", "Milk Rusk"),
            ("price_1", "45"),
            ("category_1", "Snacks"),
            ("name_0", "ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let store_id = StoreId::random();
        let inputs = results().to_inputs(store_id, &form).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "Milk Rusk");
        assert_eq!(inputs[0].price, Money::from_rupees(45));
        assert_eq!(inputs[0].category.as_deref(), Some("Snacks"));
        assert_eq!(inputs[0].store_id, store_id);
        assert!(inputs[0].is_available);
    }

    #[test]
    fn test_to_inputs_rejects_empty_selection_and_bad_price() {
        let none = HashMap::new();
        assert!(matches!(
            results().to_inputs(StoreId::random(), &none),
            Err(AiUploadError::NothingSelected)
        ));

        let bad: HashMap<String, String> = [("selected_0", "on"), ("price_0", "abc")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(matches!(
            results().to_inputs(StoreId::random(), &bad),
            Err(AiUploadError::InvalidPrice { .. })
        ));
    }
}
