pub mod tool;

pub use tool::{MuxRequest, Mp4BoxTool};
