pub mod cart;
pub mod order;
pub mod payment;
pub mod product;

pub use cart::*;
pub use order::*;
pub use payment::*;
pub use product::*;
