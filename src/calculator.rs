//! The four arithmetic operations served by the calculator.

use rpc_lite::{DomainError, Operation, RpcServer, RpcServerError};
use std::fmt;

/// Fault message sent back when the divisor is zero.
pub const DIVIDE_BY_ZERO: &str = "Cannot divide by zero!";

/// A calculator operation. Every variant takes two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Arithmetic {
    pub const ALL: [Arithmetic; 4] = [
        Arithmetic::Add,
        Arithmetic::Subtract,
        Arithmetic::Multiply,
        Arithmetic::Divide,
    ];

    /// Name the operation is registered under on the server.
    pub fn name(self) -> &'static str {
        match self {
            Arithmetic::Add => "add",
            Arithmetic::Subtract => "subtract",
            Arithmetic::Multiply => "multiply",
            Arithmetic::Divide => "divide",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Arithmetic::Add => "+",
            Arithmetic::Subtract => "-",
            Arithmetic::Multiply => "*",
            Arithmetic::Divide => "/",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    pub fn apply(self, a: f64, b: f64) -> Result<f64, DomainError> {
        match self {
            Arithmetic::Add => Ok(a + b),
            Arithmetic::Subtract => Ok(a - b),
            Arithmetic::Multiply => Ok(a * b),
            // Also catches -0.0
            Arithmetic::Divide if b == 0.0 => Err(DomainError::new(DIVIDE_BY_ZERO)),
            Arithmetic::Divide => Ok(a / b),
        }
    }
}

impl Operation for Arithmetic {
    fn arity(&self) -> usize {
        2
    }

    fn invoke(&self, args: &[f64]) -> Result<f64, DomainError> {
        self.apply(args[0], args[1])
    }
}

impl fmt::Display for Arithmetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Register all four operations on `server`.
pub fn register_calculator(server: &mut RpcServer) -> Result<(), RpcServerError> {
    for op in Arithmetic::ALL {
        server.register(op.name(), op)?;
    }
    Ok(())
}
