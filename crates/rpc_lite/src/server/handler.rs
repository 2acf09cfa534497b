use std::fmt;

use crate::error::DomainError;

/// A named server-side function over `f64` arguments.
///
/// The registry checks the argument count against [`Operation::arity`]
/// before calling [`Operation::invoke`], so implementations may index
/// `args` directly.
pub trait Operation: Send + Sync {
    /// Number of arguments the operation takes.
    fn arity(&self) -> usize;

    fn invoke(&self, args: &[f64]) -> Result<f64, DomainError>;
}

/// An [`Operation`] backed by a closure.
///
/// # Example
/// ```ignore
/// let negate = FnOperation::new(1, |args| Ok(-args[0]));
/// server.register("negate", negate)?;
/// ```
pub struct FnOperation<F> {
    arity: usize,
    f: F,
}

impl<F> FnOperation<F> {
    pub fn new(arity: usize, f: F) -> Self
    where
        F: Fn(&[f64]) -> Result<f64, DomainError> + Send + Sync,
    {
        Self { arity, f }
    }
}

impl<F> Operation for FnOperation<F>
where
    F: Fn(&[f64]) -> Result<f64, DomainError> + Send + Sync,
{
    fn arity(&self) -> usize {
        self.arity
    }

    fn invoke(&self, args: &[f64]) -> Result<f64, DomainError> {
        (self.f)(args)
    }
}

impl<F> fmt::Debug for FnOperation<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperation")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}
