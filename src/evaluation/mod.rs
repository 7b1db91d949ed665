//! Post-hoc evaluation of negotiation results

pub mod judge;

pub use judge::{Criteria, Judgment, NegotiationJudge};
