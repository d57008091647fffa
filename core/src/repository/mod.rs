pub mod file;
pub mod traits;

// Re-export
pub use file::FileStateRepository;
pub use traits::StateRepository;
