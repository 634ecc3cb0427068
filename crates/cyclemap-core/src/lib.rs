pub mod config_manager;
pub mod error;
pub mod filters;
pub mod hierarchy;
pub mod serde_helpers;
pub mod source;
pub mod traits;
pub mod types;

pub use config_manager::*;
pub use error::*;
pub use filters::*;
pub use hierarchy::*;
pub use source::*;
pub use traits::*;
pub use types::*;
