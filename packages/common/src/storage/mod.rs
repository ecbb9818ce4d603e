mod content_id;
mod error;
mod traits;

#[cfg(feature = "pinata")]
pub mod pinata;

pub use content_id::BlobCid;
pub use error::StorageError;
pub use traits::BlobStore;
