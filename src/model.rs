pub mod groups;
pub mod registry;

pub use groups::{GroupError, GroupId, GroupManager};
pub use registry::{WindowRegistry, WindowState};
