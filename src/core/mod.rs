//! # Core Module
//!
//! Shared-state containers used by the rest of the crate.
//!
//! ## Key Components
//! - `MtResource`: thread-safe value behind a mutex and condition variable,
//!   used for everything workers and the consumer both touch
//! - `StResource`: single-threaded value with interior mutability, used for
//!   everything only the consumer thread may touch
//!
//! ## Usage
//! ```rust
//! use live_preview::core::{MtResource, StResource};
//!
//! let in_flight = MtResource::new(0usize);
//! *in_flight.get_mut() += 1;
//! assert_eq!(*in_flight.get(), 1);
//!
//! let scene_state = StResource::new(String::from("idle"));
//! scene_state.get_mut().push_str(" -> drawing");
//! assert_eq!(&*scene_state.get(), "idle -> drawing");
//! ```

pub mod mt_resource;
pub mod st_resource;

pub use mt_resource::MtResource;
pub use st_resource::StResource;
