pub mod engine;
pub mod event;
pub mod gesture;
pub mod save;
pub mod world;
