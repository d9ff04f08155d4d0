pub mod exercises;
pub mod sessions;
