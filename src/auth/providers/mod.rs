//! 认证provider插件层

pub mod r#trait;
pub mod handle;
pub mod registry;
pub mod insecure_example;

pub use r#trait::{AuthProvider, ProviderBase, DEFAULT_TITLE};
pub use handle::{ProviderHandle, Readiness};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use insecure_example::InsecureExampleProvider;
