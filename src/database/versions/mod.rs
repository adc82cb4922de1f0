pub mod v1;
pub mod v2;

pub mod prelude {
    pub use super::v2 as current;
    pub use super::{v1, v2};
}
