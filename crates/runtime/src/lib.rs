pub mod debounce;
pub mod tween;

pub use debounce::*;
pub use tween::*;
