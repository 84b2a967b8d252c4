//! Aggregate math functions
//!
//! Every function takes its arguments as strings, exactly as they come out of
//! reference substitution, and returns the display string of the result.

use crate::error::{FormulaError, FormulaResult};
use crate::number::{coerce_number, format_number};

/// Coerce every argument to a number
fn numeric_args(function: &str, args: &[String]) -> FormulaResult<Vec<f64>> {
    if args.is_empty() {
        return Err(FormulaError::ArgumentsMustBeProvided(function.to_string()));
    }

    args.iter()
        .map(|arg| {
            coerce_number(arg).ok_or_else(|| FormulaError::ArgumentsMustBeNumbers {
                function: function.to_string(),
                argument: arg.clone(),
            })
        })
        .collect()
}

fn finish(function: &str, n: f64) -> FormulaResult<String> {
    if n.is_finite() {
        Ok(format_number(n))
    } else {
        Err(FormulaError::InvalidResultType(format!(
            "{} produced {}",
            function,
            format_number(n)
        )))
    }
}

/// SUM / SUMA
pub fn fn_sum(args: &[String]) -> FormulaResult<String> {
    let numbers = numeric_args("SUM", args)?;
    finish("SUM", numbers.iter().sum())
}

/// AVERAGE / PROMEDIO / AVG
pub fn fn_average(args: &[String]) -> FormulaResult<String> {
    let numbers = numeric_args("AVERAGE", args)?;
    let sum: f64 = numbers.iter().sum();
    finish("AVERAGE", sum / numbers.len() as f64)
}

/// COUNT / CONTAR
///
/// Counts the arguments supplied, numeric or not.
pub fn fn_count(args: &[String]) -> FormulaResult<String> {
    if args.is_empty() {
        return Err(FormulaError::ArgumentsMustBeProvided("COUNT".into()));
    }
    Ok(args.len().to_string())
}

/// MAX
pub fn fn_max(args: &[String]) -> FormulaResult<String> {
    let numbers = numeric_args("MAX", args)?;
    finish("MAX", numbers.into_iter().fold(f64::NEG_INFINITY, f64::max))
}

/// MIN
pub fn fn_min(args: &[String]) -> FormulaResult<String> {
    let numbers = numeric_args("MIN", args)?;
    finish("MIN", numbers.into_iter().fold(f64::INFINITY, f64::min))
}

/// SUBTRACT / RESTAR: `0 - a - b - ...`
pub fn fn_subtract(args: &[String]) -> FormulaResult<String> {
    let numbers = numeric_args("SUBTRACT", args)?;
    finish("SUBTRACT", numbers.into_iter().fold(0.0, |acc, n| acc - n))
}

/// MULTIPLY / MULTIPLICAR: `1 * a * b * ...`
pub fn fn_multiply(args: &[String]) -> FormulaResult<String> {
    let numbers = numeric_args("MULTIPLY", args)?;
    finish("MULTIPLY", numbers.into_iter().product())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoja_core::CellError;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sum() {
        assert_eq!(fn_sum(&args(&["5", "10"])).unwrap(), "15");
        assert_eq!(fn_sum(&args(&["1.5", "1"])).unwrap(), "2.5");
        // Empty cells read as zero
        assert_eq!(fn_sum(&args(&["1", ""])).unwrap(), "1");
    }

    #[test]
    fn test_average() {
        assert_eq!(fn_average(&args(&["1", "2", "3", "4"])).unwrap(), "2.5");
        assert_eq!(fn_average(&args(&["-1"])).unwrap(), "-1");
    }

    #[test]
    fn test_count_does_not_coerce() {
        assert_eq!(fn_count(&args(&["a", "", "3"])).unwrap(), "3");
        assert_eq!(
            fn_count(&[]).unwrap_err().code(),
            CellError::ArgumentsMustBeProvided
        );
    }

    #[test]
    fn test_max_min() {
        assert_eq!(fn_max(&args(&["3", "-7", "12"])).unwrap(), "12");
        assert_eq!(fn_min(&args(&["3", "-7", "12"])).unwrap(), "-7");
        assert_eq!(fn_max(&args(&["-3"])).unwrap(), "-3");
    }

    #[test]
    fn test_subtract_and_multiply_folds() {
        assert_eq!(fn_subtract(&args(&["10", "3"])).unwrap(), "-13");
        assert_eq!(fn_subtract(&args(&["4"])).unwrap(), "-4");
        assert_eq!(fn_multiply(&args(&["2", "3", "4"])).unwrap(), "24");
        assert_eq!(fn_multiply(&args(&["0.5"])).unwrap(), "0.5");
    }

    #[test]
    fn test_argument_errors() {
        for f in [fn_sum, fn_average, fn_max, fn_min, fn_subtract, fn_multiply] {
            assert_eq!(f(&[]).unwrap_err().code(), CellError::ArgumentsMustBeProvided);
            assert_eq!(
                f(&args(&["1", "abc"])).unwrap_err().code(),
                CellError::ArgumentsMustBeNumbers
            );
        }
    }

    #[test]
    fn test_overflow_is_invalid_result() {
        let err = fn_multiply(&args(&["1e308", "10"])).unwrap_err();
        assert_eq!(err.code(), CellError::InvalidResultType);
    }
}
