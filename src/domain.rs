mod image;
pub mod inventory;
pub mod policy;
pub mod registry;
pub mod traits;

pub use image::{Container, Image, NONE_DIGEST, NONE_TAG, short_id};
pub use inventory::Inventory;
pub use policy::RetentionPolicy;
pub use registry::{ImageKey, ImageRegistry, RegistryError};
pub use traits::ImageRuntime;
