pub mod connection;
pub mod entity;
pub mod logger;
pub mod math;
pub mod stream;

pub use connection::*;
pub use entity::*;
pub use logger::*;
pub use math::*;
pub use stream::*;
