pub mod hand_feed;
pub mod input;
pub mod renderer;
