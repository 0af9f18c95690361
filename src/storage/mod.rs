//! Word list sources for puzzle generation

pub mod memory;
pub mod traits;

pub use memory::MemoryWordSource;
pub use traits::WordSource;
