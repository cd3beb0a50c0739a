pub mod custom_resource;
pub mod lifecycle;
pub mod reporter;
