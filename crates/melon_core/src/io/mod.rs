pub mod definitions;
pub mod frame;
