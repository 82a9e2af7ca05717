pub mod tools;

pub use tools::DoviTool;
