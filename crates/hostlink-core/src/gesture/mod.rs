//! Touch gesture recognition.

mod tap;

pub use tap::{MultiTapListener, TapGestureDetector};
