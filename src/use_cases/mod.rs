// Use cases layer: the layout controller and the task that drives it.

pub mod controller;
pub mod sim;
pub mod types;

pub use controller::LayoutController;
pub use types::{LayoutCommand, TickPayload};
