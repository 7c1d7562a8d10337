//! Elementary operation execution
//!
//! Division by zero deliberately produces NaN instead of an error: the
//! worker submits it like any other result, and the coordinator decides
//! on the receiving side that the whole expression has failed.

use calc_domain::Operation;

pub fn execute(operation: Operation, arg1: f64, arg2: f64) -> f64 {
    match operation {
        Operation::Add => arg1 + arg2,
        Operation::Sub => arg1 - arg2,
        Operation::Mul => arg1 * arg2,
        Operation::Div => {
            if arg2 == 0.0 {
                f64::NAN
            } else {
                arg1 / arg2
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(execute(Operation::Add, 2.0, 3.0), 5.0);
        assert_eq!(execute(Operation::Sub, 2.0, 3.0), -1.0);
        assert_eq!(execute(Operation::Mul, 2.0, 3.0), 6.0);
        assert_eq!(execute(Operation::Div, 6.0, 3.0), 2.0);
    }

    #[test]
    fn test_division_by_zero_yields_nan() {
        assert!(execute(Operation::Div, 10.0, 0.0).is_nan());
        assert!(execute(Operation::Div, 0.0, 0.0).is_nan());
        assert!(execute(Operation::Div, -5.0, 0.0).is_nan());
    }

    #[test]
    fn test_fractional_results() {
        assert_eq!(execute(Operation::Div, 1.0, 4.0), 0.25);
        assert_eq!(execute(Operation::Mul, 0.5, 0.5), 0.25);
    }

    #[test]
    fn test_negative_operands() {
        assert_eq!(execute(Operation::Add, -1.0, 4.0), 3.0);
        assert_eq!(execute(Operation::Mul, -2.0, -3.0), 6.0);
    }
}
