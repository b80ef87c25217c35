pub mod file;
pub mod memory;

pub use file::FileMailStore;
pub use memory::MemoryMailStore;
