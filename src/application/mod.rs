//! Application layer: single-shot resolution and the polling watch.
//!
//! `PaymentStatusResolver` owns an injected lookup and answers "what state is
//! this order's payment in?". `Watch` repeats that question on a timer until it
//! gets a final answer or is told to give up.

pub mod resolver;
pub mod watch;
