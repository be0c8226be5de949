pub mod codec;
pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod store;
pub mod traits;

pub use codec::{Encode, Scalar};
pub use config::StoreConfig;
pub use error::{Result, TinyDbError};
pub use file::LocalFs;
pub use memory::MemoryFs;
pub use store::{LINE_SEPARATOR, TinyDb};
pub use traits::FileSystem;
