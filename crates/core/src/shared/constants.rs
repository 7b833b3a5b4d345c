use std::time::Duration;

pub const DEFAULT_DETECTION_ENDPOINT: &str = "http://bounding:5001/detect";
pub const DEFAULT_CLASSIFICATION_ENDPOINT: &str = "http://classifier:5002/classify";
pub const DEFAULT_ANONYMIZATION_ENDPOINT: &str = "http://pixelator:5003/pixelate";

/// Per-call timeout for every collaborator round-trip.
pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Umbrella timeout for one inbound request at the server boundary.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Score above which the classification service reports a face as a minor.
pub const MINOR_SCORE_THRESHOLD: f64 = 0.38;

/// Multipart field carrying the whole image (inbound and detection).
pub const IMAGE_FIELD: &str = "image";
/// Multipart field carrying a single face crop.
pub const FACE_FIELD: &str = "face";

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Kernel size of the local Gaussian blur used when redacting without the
/// anonymization service.
pub const DEFAULT_FALLBACK_BLUR_KERNEL: usize = 51;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];
