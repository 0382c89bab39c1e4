pub mod cli;
pub mod git;
pub mod interpreter;
pub mod keyboard;
pub mod render;
pub mod session;
pub mod state;
pub mod tool_arg;
pub mod types;
pub mod util;
