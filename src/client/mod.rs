pub mod identity;

pub use identity::{HttpIdentityService, IdentityService, NoopIdentityService};
