pub mod recorder;
pub mod sessions;
pub mod upstream;
