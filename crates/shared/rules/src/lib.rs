//! Rule functions
//!
//! A rule function is a fixed sequence of stack-machine operations read from the
//! settings tree, for example the square of the rating:
//!
//! ```json
//! [{"operation": "push", "arg": "r"}, {"operation": "pow", "p": 2.0}]
//! ```
//!
//! Binary operations pop two values; the first value popped is the left
//! operand. Evaluation must leave exactly one value on the stack.

mod function;
mod rules;

pub use function::{Operation, RuleFunction};
pub use rules::{RATING_ARG, Rules};
