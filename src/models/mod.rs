pub mod cash_flow;
pub mod valuation;
pub mod response;

pub use cash_flow::*;
pub use valuation::*;
pub use response::*;
