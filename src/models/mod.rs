pub mod agenda;
pub mod company;
pub mod product;
pub mod topic;
pub mod user;
pub mod wire;

pub use agenda::*;
pub use company::*;
pub use product::*;
pub use topic::*;
pub use user::*;
pub use wire::*;
