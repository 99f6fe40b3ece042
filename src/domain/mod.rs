pub mod error;
pub mod image_mapping;
pub mod template;
