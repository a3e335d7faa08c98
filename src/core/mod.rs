// Domain-layer modules and shared errors/models
pub mod schemas {
    pub use crate::schemas::*;
}

pub mod form {
    pub use crate::form::*;
}

pub mod calculator {
    pub use crate::calculator::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
