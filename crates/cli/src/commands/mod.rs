pub mod demo;
pub mod screenshot;
pub mod stream;
pub mod version;
