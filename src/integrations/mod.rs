//! External service integrations.

pub mod store {
    pub use crate::store::*;
}

pub mod transport {
    pub use crate::transport::*;
}
