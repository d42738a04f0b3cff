mod error;
pub use error::Error;

pub(crate) mod macros;

pub mod extensions;

mod element_type;
pub use element_type::ElementType;

mod string_data;
pub use string_data::*;

mod object_id;
pub use object_id::*;

mod uuid;
pub use uuid::*;

mod date_time;
pub use date_time::*;

mod timestamp;
pub use timestamp::*;

mod decimal128;
pub use decimal128::*;

mod misc;
pub use misc::*;

mod element_value;
pub use element_value::{DisplayHint, ElementValue};

mod document;
pub use document::*;

mod array;
pub use array::*;

mod stdlib_layout;
pub use stdlib_layout::*;

mod context;
pub use context::*;

mod decoration;
pub use decoration::*;

mod lock_manager;
pub use lock_manager::*;

mod dump;
pub use dump::*;
