pub mod engine;
pub mod systems;


pub use engine::{LayoutCommand, LayoutEngine, LayoutOutcome};
pub use systems::{Columns, Direction, LayoutSystem, LayoutSystemKind, Max};
