//! 存储层抽象
//!
//! 身份状态归store所有，后端只负责load和save快照。

pub mod r#trait;
pub mod memory;

pub use r#trait::AuthPersistence;
pub use memory::MemoryStorage;
