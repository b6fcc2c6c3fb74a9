mod client;
pub use client::{Client, RequestError};

mod order;
pub use order::{Sort, SortExt};

mod view;
pub use view::{format_age, Forum};

pub mod api {
    pub use forum_api::*;
}

pub mod prelude {
    pub use crate::SortExt;
}
