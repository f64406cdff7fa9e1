pub mod http;
pub mod memory;
pub mod types;

pub use http::{HttpControlPlane, HttpRuntime, HttpSettings};
pub use memory::MemoryPlatform;
pub use types::{ControlPlane, InferenceRuntime, PlatformError, PlatformResult, ResourceKind};
