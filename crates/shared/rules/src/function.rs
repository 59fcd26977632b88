//! Stack-machine rule function

use curators_core::{Error, Result, Settings};
use serde::{Deserialize, Serialize};

/// One stack-machine instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum Operation {
    /// Push a constant
    Const { a: f64 },
    /// Push a named argument
    Push { arg: String },
    /// Duplicate the top value
    Dup,
    /// Raise the top value to `p`; without `p` the exponent is popped first
    Pow {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        p: Option<f64>,
    },
    Abs,
    Add,
    Sub,
    Mul,
    Div,
    Swap,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::Const { .. } => "const",
            Operation::Push { .. } => "push",
            Operation::Dup => "dup",
            Operation::Pow { .. } => "pow",
            Operation::Abs => "abs",
            Operation::Add => "add",
            Operation::Sub => "sub",
            Operation::Mul => "mul",
            Operation::Div => "div",
            Operation::Swap => "swap",
        }
    }
}

/// Configured scoring function
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFunction {
    operations: Vec<Operation>,
}

impl RuleFunction {
    pub fn new(operations: Vec<Operation>) -> Result<Self> {
        if operations.is_empty() {
            return Err(Error::config("rule function", "empty operation sequence"));
        }
        Ok(Self { operations })
    }

    /// Function that ignores its arguments
    pub fn constant(a: f64) -> Self {
        Self {
            operations: vec![Operation::Const { a }],
        }
    }

    /// Read the operation sequence stored at `path`
    pub fn from_settings(settings: &Settings, path: &str) -> Result<Self> {
        let operations: Vec<Operation> = settings.section(path)?;
        if operations.is_empty() {
            return Err(Error::config(path, "empty operation sequence"));
        }
        Ok(Self { operations })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Run the sequence with the given named arguments bound
    pub fn evaluate(&self, args: &[(&str, f64)]) -> Result<f64> {
        let mut stack: Vec<f64> = Vec::with_capacity(self.operations.len());

        for op in &self.operations {
            match op {
                Operation::Const { a } => stack.push(*a),
                Operation::Push { arg } => {
                    let value = args
                        .iter()
                        .find(|(name, _)| *name == arg.as_str())
                        .map(|(_, v)| *v)
                        .ok_or_else(|| Error::shape(format!("unbound rule argument `{arg}`")))?;
                    stack.push(value);
                }
                Operation::Dup => {
                    let top = *stack.last().ok_or_else(|| underflow(op))?;
                    stack.push(top);
                }
                Operation::Pow { p: Some(p) } => {
                    let top = stack.last_mut().ok_or_else(|| underflow(op))?;
                    *top = top.powf(*p);
                }
                Operation::Pow { p: None } => {
                    let (exponent, base) = pop_pair(&mut stack, op)?;
                    stack.push(base.powf(exponent));
                }
                Operation::Abs => {
                    let top = stack.last_mut().ok_or_else(|| underflow(op))?;
                    *top = top.abs();
                }
                Operation::Add => {
                    let (first, second) = pop_pair(&mut stack, op)?;
                    stack.push(first + second);
                }
                Operation::Sub => {
                    let (first, second) = pop_pair(&mut stack, op)?;
                    stack.push(first - second);
                }
                Operation::Mul => {
                    let (first, second) = pop_pair(&mut stack, op)?;
                    stack.push(first * second);
                }
                Operation::Div => {
                    let (first, second) = pop_pair(&mut stack, op)?;
                    stack.push(first / second);
                }
                Operation::Swap => {
                    let (first, second) = pop_pair(&mut stack, op)?;
                    stack.push(first);
                    stack.push(second);
                }
            }
        }

        match stack.as_slice() {
            [value] => Ok(*value),
            other => Err(Error::shape(format!(
                "rule function left {} values on the stack, expected 1",
                other.len()
            ))),
        }
    }
}

fn underflow(op: &Operation) -> Error {
    Error::shape(format!("stack underflow in `{}`", op.name()))
}

/// Pop two values: (first popped, second popped)
fn pop_pair(stack: &mut Vec<f64>, op: &Operation) -> Result<(f64, f64)> {
    let first = stack.pop().ok_or_else(|| underflow(op))?;
    let second = stack.pop().ok_or_else(|| underflow(op))?;
    Ok((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parse(json: &str) -> RuleFunction {
        RuleFunction::new(serde_json::from_str(json).unwrap()).unwrap()
    }

    #[test]
    fn test_power_of_argument() {
        let f = RuleFunction::new(vec![
            Operation::Push {
                arg: "a".to_string(),
            },
            Operation::Const { a: 2.0 },
            Operation::Pow { p: None },
        ])
        .unwrap();
        assert_eq!(f.evaluate(&[("a", 3.0)]).unwrap(), 9.0);
    }

    #[test]
    fn test_unary_power_with_exponent() {
        let f = parse(r#"[{"operation": "push", "arg": "r"}, {"operation": "pow", "p": 0.5}]"#);
        assert_relative_eq!(f.evaluate(&[("r", 16.0)]).unwrap(), 4.0);
    }

    #[test]
    fn test_first_popped_is_left_operand() {
        // stack: [1, 4] -> sub pops 4 then 1 -> 4 - 1
        let f = parse(
            r#"[{"operation": "const", "a": 1.0},
                {"operation": "const", "a": 4.0},
                {"operation": "sub"}]"#,
        );
        assert_eq!(f.evaluate(&[]).unwrap(), 3.0);

        let f = parse(
            r#"[{"operation": "const", "a": 2.0},
                {"operation": "const", "a": 8.0},
                {"operation": "div"}]"#,
        );
        assert_eq!(f.evaluate(&[]).unwrap(), 4.0);
    }

    #[test]
    fn test_swap_then_sub() {
        let f = parse(
            r#"[{"operation": "const", "a": 1.0},
                {"operation": "const", "a": 4.0},
                {"operation": "swap"},
                {"operation": "sub"}]"#,
        );
        assert_eq!(f.evaluate(&[]).unwrap(), -3.0);
    }

    #[test]
    fn test_dup_mul_abs() {
        let f = parse(
            r#"[{"operation": "push", "arg": "d"},
                {"operation": "dup"},
                {"operation": "mul"},
                {"operation": "const", "a": -1.0},
                {"operation": "mul"},
                {"operation": "abs"}]"#,
        );
        assert_eq!(f.evaluate(&[("d", -3.0)]).unwrap(), 9.0);
    }

    #[test]
    fn test_underflow_is_data_shape_error() {
        let f = parse(r#"[{"operation": "const", "a": 1.0}, {"operation": "add"}]"#);
        assert!(matches!(f.evaluate(&[]), Err(Error::DataShape(_))));

        let f = parse(r#"[{"operation": "dup"}]"#);
        assert!(matches!(f.evaluate(&[]), Err(Error::DataShape(_))));
    }

    #[test]
    fn test_leftover_values_are_rejected() {
        let f = parse(r#"[{"operation": "const", "a": 1.0}, {"operation": "const", "a": 2.0}]"#);
        assert!(matches!(f.evaluate(&[]), Err(Error::DataShape(_))));
    }

    #[test]
    fn test_unbound_argument() {
        let f = parse(r#"[{"operation": "push", "arg": "r"}]"#);
        assert!(matches!(f.evaluate(&[("d", 1.0)]), Err(Error::DataShape(_))));
    }

    #[test]
    fn test_unknown_operation_is_configuration_error() {
        let settings =
            Settings::from_json(r#"{"f": [{"operation": "log"}]}"#).unwrap();
        assert!(matches!(
            RuleFunction::from_settings(&settings, "f"),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_constant_function() {
        let f = RuleFunction::constant(0.25);
        assert_eq!(f.evaluate(&[("d", 4.0)]).unwrap(), 0.25);
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let f = parse(r#"[{"operation": "push", "arg": "r"}, {"operation": "const", "a": 1.0}, {"operation": "add"}]"#);
        assert_eq!(f.evaluate(&[("r", 1.0)]).unwrap(), 2.0);
        assert_eq!(f.evaluate(&[("r", 5.0)]).unwrap(), 6.0);
    }
}
