pub mod abilities;
pub mod api;
pub mod async_loop;
pub mod task;
pub mod tongsim;
pub mod utils;
pub mod world_context;

pub use abilities::*;
pub use async_loop::*;
pub use task::TaskHandle;
pub use tongsim::*;
pub use utils::UtilFuncs;
pub use world_context::*;
