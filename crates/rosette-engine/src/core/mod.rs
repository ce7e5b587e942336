//! Contract between the window runtime and the application.
//!
//! The runtime owns the platform loop; applications only see a per-frame
//! context with the GPU handles and a way to issue runtime commands.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, FrameTime, WindowCtx};
