//! Binary arithmetic operations over exact decimals
//!
//! Operations are stateless: each one is a variant of [`Operation`] and the
//! registry is a static table from canonical name to variant. Lookup ignores
//! case.
//!
//! Results of the operations that can produce non-terminating expansions
//! (`divide`, `power`, `root`, `percent`) are rounded half-to-even to the
//! working precision, counted in significant digits. The remaining operations
//! are exact within the decimal range.

use crate::error::{CalculatorError, OperationFailure};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use std::fmt;
use std::str::FromStr;

/// Extra digits carried through the root computation before narrowing
const ROOT_GUARD_DIGITS: u32 = 4;

/// Most significant digits a decimal can hold
pub const MAX_PRECISION: u32 = 28;

/// A registered binary operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Root,
    Modulus,
    IntDivide,
    Percent,
    AbsDiff,
}

impl Operation {
    /// All operations in help-text order
    pub const ALL: [Operation; 10] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
        Operation::Power,
        Operation::Root,
        Operation::Modulus,
        Operation::IntDivide,
        Operation::Percent,
        Operation::AbsDiff,
    ];

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::Power => "power",
            Operation::Root => "root",
            Operation::Modulus => "modulus",
            Operation::IntDivide => "int_divide",
            Operation::Percent => "percent",
            Operation::AbsDiff => "abs_diff",
        }
    }

    /// Applies the operation to `a` and `b`.
    ///
    /// `precision` is the number of significant digits kept by the inexact
    /// operations.
    pub fn execute(
        self,
        a: Decimal,
        b: Decimal,
        precision: u32,
    ) -> Result<Decimal, OperationFailure> {
        let precision = precision.clamp(1, MAX_PRECISION);
        match self {
            Operation::Add => a.checked_add(b).ok_or(OperationFailure::Overflow),
            Operation::Subtract => a.checked_sub(b).ok_or(OperationFailure::Overflow),
            Operation::Multiply => a.checked_mul(b).ok_or(OperationFailure::Overflow),
            Operation::Divide => {
                if b.is_zero() {
                    return Err(OperationFailure::DivisionByZero("division by zero"));
                }
                narrow(a.checked_div(b).ok_or(OperationFailure::Overflow)?, precision)
            }
            Operation::Power => power(a, b, precision),
            Operation::Root => root(a, b, precision),
            Operation::Modulus => {
                if b.is_zero() {
                    return Err(OperationFailure::DivisionByZero("mod by zero"));
                }
                a.checked_rem(b).ok_or(OperationFailure::Overflow)
            }
            Operation::IntDivide => floor_divide(a, b),
            Operation::Percent => {
                if b.is_zero() {
                    return Err(OperationFailure::DivisionByZero("percent of zero base"));
                }
                let ratio = a.checked_div(b).ok_or(OperationFailure::Overflow)?;
                let percent = ratio
                    .checked_mul(Decimal::ONE_HUNDRED)
                    .ok_or(OperationFailure::Overflow)?;
                narrow(percent, precision)
            }
            Operation::AbsDiff => {
                a.checked_sub(b).map(|d| d.abs()).ok_or(OperationFailure::Overflow)
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = CalculatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve(s)
    }
}

/// Looks up an operation by name, ignoring case
pub fn resolve(name: &str) -> Result<Operation, CalculatorError> {
    let wanted = name.trim();
    Operation::ALL
        .into_iter()
        .find(|op| op.name().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| CalculatorError::UnknownOperation { name: name.to_string() })
}

/// Canonical names of every registered operation
pub fn operation_names() -> impl Iterator<Item = &'static str> {
    Operation::ALL.into_iter().map(Operation::name)
}

/// Rounds to `digits` significant digits without padding shorter values
fn narrow(value: Decimal, digits: u32) -> Result<Decimal, OperationFailure> {
    let rounded = value.round_sf(digits).ok_or(OperationFailure::Overflow)?;
    Ok(if rounded.scale() > value.scale() { value } else { rounded })
}

fn power(a: Decimal, b: Decimal, precision: u32) -> Result<Decimal, OperationFailure> {
    let exponent = b.trunc().to_i64().ok_or(OperationFailure::Overflow)?;
    if exponent < 0 && a.is_zero() {
        return Err(OperationFailure::DivisionByZero("zero raised to a negative power"));
    }
    let magnitude = a.checked_powu(exponent.unsigned_abs()).ok_or(OperationFailure::Overflow)?;
    let raw = if exponent < 0 {
        Decimal::ONE.checked_div(magnitude).ok_or(OperationFailure::Overflow)?.normalize()
    } else {
        magnitude
    };
    narrow(raw, precision)
}

/// b-th root of a as a^(1/b), carried at `precision + 4` digits then narrowed
fn root(a: Decimal, b: Decimal, precision: u32) -> Result<Decimal, OperationFailure> {
    if b.is_zero() {
        return Err(OperationFailure::DivisionByZero("zero root"));
    }
    let working = (precision + ROOT_GUARD_DIGITS).min(MAX_PRECISION);
    let exponent = narrow(Decimal::ONE.checked_div(b).ok_or(OperationFailure::Overflow)?, working)?;

    if a.is_zero() {
        return if exponent.is_sign_positive() {
            Ok(Decimal::ZERO)
        } else {
            Err(OperationFailure::DivisionByZero("zero root of negative index"))
        };
    }
    if a.is_sign_negative() {
        return Err(OperationFailure::InvalidDomain("root of a negative number"));
    }

    let raw = a.checked_powd(exponent).ok_or(OperationFailure::Overflow)?;
    narrow(narrow(raw, working)?, precision)
}

/// floor(a / b), computed from the remainder so no digits are lost
fn floor_divide(a: Decimal, b: Decimal) -> Result<Decimal, OperationFailure> {
    if b.is_zero() {
        return Err(OperationFailure::DivisionByZero("int divide by zero"));
    }
    let rem = a.checked_rem(b).ok_or(OperationFailure::Overflow)?;
    let whole = a.checked_sub(rem).ok_or(OperationFailure::Overflow)?;
    let truncated = whole.checked_div(b).ok_or(OperationFailure::Overflow)?;
    // remainder takes the sign of the dividend
    let quotient = if !rem.is_zero() && rem.is_sign_negative() != b.is_sign_negative() {
        truncated.checked_sub(Decimal::ONE).ok_or(OperationFailure::Overflow)?
    } else {
        truncated
    };
    Ok(quotient.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const PRECISION: u32 = 6;

    fn run(name: &str, a: Decimal, b: Decimal) -> Result<Decimal, OperationFailure> {
        resolve(name).unwrap().execute(a, b, PRECISION)
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(resolve("ADD").unwrap(), Operation::Add);
        assert_eq!(resolve("Int_Divide").unwrap(), Operation::IntDivide);
        assert_eq!("abs_diff".parse::<Operation>().unwrap(), Operation::AbsDiff);
    }

    #[test]
    fn test_resolve_unknown_operation() {
        let err = resolve("sqrt").unwrap_err();
        assert!(matches!(err, CalculatorError::UnknownOperation { ref name } if name == "sqrt"));
    }

    #[test]
    fn test_every_name_resolves_to_itself() {
        for op in Operation::ALL {
            assert_eq!(resolve(op.name()).unwrap(), op);
            assert_eq!(op.to_string(), op.name());
        }
        assert_eq!(operation_names().count(), 10);
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(run("add", dec!(2), dec!(3)).unwrap(), dec!(5));
        assert_eq!(run("subtract", dec!(10), dec!(4)).unwrap(), dec!(6));
        assert_eq!(run("multiply", dec!(2.5), dec!(4)).unwrap(), dec!(10));
        assert_eq!(run("divide", dec!(6), dec!(2)).unwrap(), dec!(3));
        assert_eq!(run("abs_diff", dec!(5), dec!(9)).unwrap(), dec!(4));
    }

    #[test]
    fn test_exact_decimal_addition() {
        assert_eq!(run("add", dec!(0.1), dec!(0.2)).unwrap(), dec!(0.3));
    }

    #[test]
    fn test_divide_rounds_to_precision() {
        assert_eq!(run("divide", dec!(1), dec!(3)).unwrap(), dec!(0.333333));
        assert_eq!(run("divide", dec!(2), dec!(3)).unwrap(), dec!(0.666667));
    }

    #[test]
    fn test_power_truncates_exponent() {
        assert_eq!(run("power", dec!(2), dec!(3)).unwrap(), dec!(8));
        assert_eq!(run("power", dec!(2), dec!(3.9)).unwrap(), dec!(8));
        assert_eq!(run("power", dec!(2), dec!(-2)).unwrap(), dec!(0.25));
        assert_eq!(run("power", dec!(7), dec!(0)).unwrap(), dec!(1));
    }

    #[test]
    fn test_negative_power_has_canonical_text() {
        assert_eq!(run("power", dec!(2), dec!(-1)).unwrap().to_string(), "0.5");
        assert_eq!(run("power", dec!(2), dec!(-2)).unwrap().to_string(), "0.25");
        assert_eq!(run("power", dec!(4), dec!(-1)).unwrap().to_string(), "0.25");
    }

    #[test]
    fn test_power_of_zero_with_negative_exponent() {
        assert!(matches!(
            run("power", dec!(0), dec!(-1)),
            Err(OperationFailure::DivisionByZero(_))
        ));
    }

    #[test]
    fn test_power_overflow() {
        assert_eq!(run("power", dec!(1000000), dec!(10)), Err(OperationFailure::Overflow));
    }

    #[test]
    fn test_root() {
        let square = run("root", dec!(9), dec!(2)).unwrap();
        assert!((square - dec!(3)).abs() < dec!(0.00001), "got {square}");

        let cube = run("root", dec!(27), dec!(3)).unwrap();
        assert!((cube - dec!(3)).abs() < dec!(0.00001), "got {cube}");

        let inverse = run("root", dec!(4), dec!(-2)).unwrap();
        assert!((inverse - dec!(0.5)).abs() < dec!(0.00001), "got {inverse}");

        assert_eq!(run("root", dec!(0), dec!(2)).unwrap(), dec!(0));
    }

    #[test]
    fn test_root_failures() {
        assert!(matches!(run("root", dec!(9), dec!(0)), Err(OperationFailure::DivisionByZero(_))));
        assert!(matches!(run("root", dec!(-8), dec!(3)), Err(OperationFailure::InvalidDomain(_))));
    }

    #[test]
    fn test_modulus_and_int_divide() {
        assert_eq!(run("modulus", dec!(10), dec!(3)).unwrap(), dec!(1));
        assert_eq!(run("modulus", dec!(-10), dec!(3)).unwrap(), dec!(-1));
        assert_eq!(run("int_divide", dec!(7), dec!(2)).unwrap(), dec!(3));
        assert_eq!(run("int_divide", dec!(-7), dec!(2)).unwrap(), dec!(-4));
        assert_eq!(run("int_divide", dec!(7.5), dec!(-2)).unwrap(), dec!(-4));
        assert_eq!(run("int_divide", dec!(6), dec!(3)).unwrap().to_string(), "2");
    }

    #[test]
    fn test_percent() {
        assert_eq!(run("percent", dec!(50), dec!(200)).unwrap(), dec!(25));
        assert_eq!(run("percent", dec!(1), dec!(3)).unwrap(), dec!(33.3333));
    }

    #[test]
    fn test_zero_divisors_fail() {
        for name in ["divide", "modulus", "int_divide", "percent"] {
            assert!(
                matches!(run(name, dec!(1), dec!(0)), Err(OperationFailure::DivisionByZero(_))),
                "{name} should reject a zero divisor"
            );
        }
    }

    #[test]
    fn test_precision_is_an_explicit_parameter() {
        let op = Operation::Divide;
        assert_eq!(op.execute(dec!(1), dec!(3), 2).unwrap(), dec!(0.33));
        assert_eq!(op.execute(dec!(1), dec!(3), 4).unwrap(), dec!(0.3333));
        // a later call with another precision is unaffected by the earlier one
        assert_eq!(op.execute(dec!(1), dec!(3), 2).unwrap(), dec!(0.33));
    }
}
