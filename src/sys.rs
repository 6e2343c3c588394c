pub mod driver;
pub mod executor;
pub mod geometry;
pub mod hotkey;
pub mod process;
pub mod screen;
