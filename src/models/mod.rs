pub mod descriptor;
pub mod outcome;
pub mod payment;

pub use descriptor::*;
pub use outcome::*;
pub use payment::*;
