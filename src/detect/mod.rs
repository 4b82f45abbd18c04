mod backend;
pub mod backends;
mod config;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
pub use config::{resolve_model_path, DetectorConfig, ModelInfo, KNOWN_MODELS};
pub use registry::{available_backends, build_detector};
pub use result::{Detection, PERSON_CLASS_ID, PERSON_CLASS_NAME};
