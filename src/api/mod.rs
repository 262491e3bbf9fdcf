//! mod `api` provides the topmost fundamental APIs for users using sentinel-guard.
//! Users build a [`Sentinel`] instance first, which owns the rule managers and the slot chain.
//! Sentinel supports three ways to perform initialization:
//!
//!  1. `Sentinel::new()`, using the system environment and the default config.
//!  2. `Sentinel::with_config(config_entity)`, using customized config entity.
//!  3. `Sentinel::from_yaml(config_path)`, using yaml file.
//!
//! Here is the example code to use Sentinel:
//!
//! ```
//! use sentinel_guard::{base, Sentinel};
//!
//! let sentinel = Sentinel::new().unwrap();
//! let mut handlers = Vec::new();
//! let sentinel = std::sync::Arc::new(sentinel);
//! for _ in 0..10 {
//!     let sentinel = sentinel.clone();
//!     handlers.push(std::thread::spawn(move || {
//!         for _ in 0..100 {
//!             let entry_builder = sentinel
//!                 .entry_builder("some-test")
//!                 .with_traffic_type(base::TrafficType::Inbound);
//!             if let Ok(entry) = entry_builder.build() {
//!                 // Passed, wrap the logic here.
//!                 std::thread::sleep(std::time::Duration::from_millis(
//!                     rand::random::<u64>() % 10,
//!                 ));
//!                 // Be sure the entry is exited finally.
//!                 entry.exit()
//!             } else {
//!                 // Blocked. We could get the block reason from the BlockError.
//!                 std::thread::sleep(std::time::Duration::from_millis(
//!                     rand::random::<u64>() % 10,
//!                 ));
//!             }
//!         }
//!     }));
//! }
//! for h in handlers {
//!     h.join().expect("Couldn't join on the associated thread");
//! }
//! ```

pub mod api;
pub mod init;
pub mod slot_chain;

pub use api::*;
pub use init::*;
pub use slot_chain::*;
