//! Pipelines built from partial images and lifecycle callbacks.
//!
//! - [`open_lazy`]: header now, pixels on first pull
//! - [`open_delayed_save`]: buffer writes, encode at close
//! - [`read_native`]: byte-swap foreign-order native files on the fly
//! - [`set_progress`]: percent-complete feedback on every new handle

mod byte_order;
mod delayed_save;
mod lazy;
mod progress;

pub use byte_order::read_native;
pub use delayed_save::{open_delayed_save, SaveDescriptor};
pub use lazy::open_lazy;
pub use progress::{progress_enabled, set_progress, Progress};

pub(crate) use progress::attach_progress;
