pub mod core;
pub mod selection;
pub use self::core::*;
pub use selection::select_model;
