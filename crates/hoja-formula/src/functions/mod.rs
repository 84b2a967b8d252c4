//! Built-in functions

pub mod math;

use crate::error::{FormulaError, FormulaResult};
use std::collections::HashMap;

/// Function implementation signature
///
/// Arguments arrive as strings after reference substitution; the result is
/// the display string.
pub type FunctionImpl = fn(&[String]) -> FormulaResult<String>;

/// Function definition
#[derive(Clone, Copy)]
pub struct FunctionDef {
    /// Canonical name (uppercase)
    pub name: &'static str,
    /// Other accepted spellings (uppercase)
    pub aliases: &'static [&'static str],
    /// Minimum arguments
    pub min_args: usize,
    /// Implementation
    pub implementation: FunctionImpl,
}

/// Function registry
///
/// Owned by whoever evaluates formulas; lookups are case-insensitive.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Create a registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_math_functions();
        registry
    }

    /// Look up a function by any of its names
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Is `name` an accepted function name?
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Register a function under its name and aliases
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
        for alias in def.aliases {
            self.functions.insert(alias.to_uppercase(), def);
        }
    }

    /// Every accepted spelling, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Call a function by name
    pub fn call(&self, name: &str, args: &[String]) -> FormulaResult<String> {
        let def = self
            .get(name)
            .ok_or_else(|| FormulaError::InvalidFunctionName(name.to_uppercase()))?;

        if args.len() < def.min_args {
            return Err(FormulaError::ArgumentsMustBeProvided(def.name.to_string()));
        }

        (def.implementation)(args)
    }

    fn register_math_functions(&mut self) {
        // SUM
        self.register(FunctionDef {
            name: "SUM",
            aliases: &["SUMA"],
            min_args: 1,
            implementation: math::fn_sum,
        });

        // AVERAGE
        self.register(FunctionDef {
            name: "AVERAGE",
            aliases: &["PROMEDIO", "AVG"],
            min_args: 1,
            implementation: math::fn_average,
        });

        // COUNT
        self.register(FunctionDef {
            name: "COUNT",
            aliases: &["CONTAR"],
            min_args: 1,
            implementation: math::fn_count,
        });

        // MAX
        self.register(FunctionDef {
            name: "MAX",
            aliases: &[],
            min_args: 1,
            implementation: math::fn_max,
        });

        // MIN
        self.register(FunctionDef {
            name: "MIN",
            aliases: &[],
            min_args: 1,
            implementation: math::fn_min,
        });

        // SUBTRACT
        self.register(FunctionDef {
            name: "SUBTRACT",
            aliases: &["RESTAR"],
            min_args: 1,
            implementation: math::fn_subtract,
        });

        // MULTIPLY
        self.register(FunctionDef {
            name: "MULTIPLY",
            aliases: &["MULTIPLICAR"],
            min_args: 1,
            implementation: math::fn_multiply,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoja_core::CellError;

    #[test]
    fn test_aliases_share_implementation() {
        let registry = FunctionRegistry::new();
        let args = vec!["2".to_string(), "4".to_string()];
        assert_eq!(registry.call("SUMA", &args).unwrap(), "6");
        assert_eq!(registry.call("promedio", &args).unwrap(), "3");
        assert_eq!(registry.call("Avg", &args).unwrap(), "3");
        assert_eq!(registry.call("contar", &args).unwrap(), "2");
        assert_eq!(registry.call("RESTAR", &args).unwrap(), "-6");
        assert_eq!(registry.call("multiplicar", &args).unwrap(), "8");
        assert_eq!(registry.get("suma").map(|d| d.name), Some("SUM"));
    }

    #[test]
    fn test_names() {
        let registry = FunctionRegistry::new();
        let names = registry.names();
        assert_eq!(names.len(), 13);
        assert!(names.contains(&"MULTIPLICAR"));
        assert!(!registry.contains("IF"));
    }

    #[test]
    fn test_call_errors() {
        let registry = FunctionRegistry::new();
        let err = registry.call("foo", &[]).unwrap_err();
        assert_eq!(err.to_display(), "#INVALID_FUNCTION_NAME (FOO)");
        assert_eq!(
            registry.call("MAX", &[]).unwrap_err().code(),
            CellError::ArgumentsMustBeProvided
        );
    }

    #[test]
    fn test_empty_registry() {
        let mut registry = FunctionRegistry::empty();
        assert!(registry.names().is_empty());
        registry.register(FunctionDef {
            name: "TOTAL",
            aliases: &[],
            min_args: 1,
            implementation: math::fn_sum,
        });
        assert!(registry.contains("total"));
    }
}
