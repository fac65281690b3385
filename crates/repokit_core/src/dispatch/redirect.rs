//! Call redirection from a façade to its delegate.

use super::interceptor::{CallOutcome, InterceptorChain, Invocation};
use crate::unit::UnitError;
use log::{error, warn};
use std::any::Any;
use std::fmt::{Debug, Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Failure of a delegate call as seen by the invocation primitive.
pub enum InvocationError<E> {
    /// The delegate returned this error.
    Target(E),
    /// The delegate panicked with this payload.
    Panicked(Box<dyn Any + Send + 'static>),
}

impl<E> InvocationError<E> {
    /// Returns the delegate's own error, or resumes its panic unchanged.
    pub fn into_cause(self) -> E {
        match self {
            Self::Target(err) => err,
            Self::Panicked(payload) => panic::resume_unwind(payload),
        }
    }
}

impl<E: Debug> Debug for InvocationError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(err) => f.debug_tuple("Target").field(err).finish(),
            Self::Panicked(_) => f.write_str("Panicked(..)"),
        }
    }
}

/// Calls `call` on `delegate`, capturing both its error and any panic.
pub fn invoke_delegate<D, T, E>(
    delegate: &D,
    call: impl FnOnce(&D) -> Result<T, E>,
) -> Result<T, InvocationError<E>>
where
    D: ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| call(delegate))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(InvocationError::Target(err)),
        Err(payload) => Err(InvocationError::Panicked(payload)),
    }
}

/// Forwarding rule owned by one façade.
pub struct Redirect<D: ?Sized> {
    repository: &'static str,
    delegate: Arc<D>,
    interceptors: InterceptorChain,
}

impl<D: ?Sized> Redirect<D> {
    pub fn new(
        repository: &'static str,
        delegate: Arc<D>,
        interceptors: InterceptorChain,
    ) -> Self {
        Self {
            repository,
            delegate,
            interceptors,
        }
    }

    pub fn repository(&self) -> &'static str {
        self.repository
    }

    pub fn delegate(&self) -> &Arc<D> {
        &self.delegate
    }

    /// Forwards one façade call to the delegate.
    ///
    /// The delegate's value or error is returned as is; a delegate panic is
    /// resumed after interceptors have seen it. An `around` failure surfaces
    /// as `E::from(UnitError)` unless the delegate itself failed.
    pub fn invoke<T, E>(
        &self,
        method: &'static str,
        call: impl FnOnce(&D) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: Display + From<UnitError>,
    {
        let invocation = Invocation {
            repository: self.repository,
            method,
        };
        let mut pending = Some(call);
        let mut outcome = None;
        let around = {
            let mut proceed = || match pending.take() {
                Some(call) => outcome = Some(self.forward(&invocation, call)),
                None => warn!(
                    "event=repository_call module=dispatch status=warn repository={} method={} \
                     reason=proceed_repeated",
                    invocation.repository, invocation.method
                ),
            };
            self.interceptors.around(&invocation, &mut proceed)
        };

        let (outcome, around) = match (outcome, pending) {
            (Some(outcome), _) => (outcome, around),
            (None, Some(call)) => {
                around?;
                error!(
                    "event=repository_call module=dispatch status=error repository={} method={} \
                     reason=proceed_not_called",
                    invocation.repository, invocation.method
                );
                (self.forward(&invocation, call), Ok(()))
            }
            (None, None) => unreachable!("delegate call taken without an outcome"),
        };

        match (outcome, around) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(wrapped), Err(err)) => {
                warn!(
                    "event=repository_call module=dispatch status=warn repository={} method={} \
                     around_error={}",
                    invocation.repository, invocation.method, err
                );
                Err(wrapped.into_cause())
            }
            (Err(wrapped), Ok(())) => Err(wrapped.into_cause()),
        }
    }

    fn forward<T, E>(
        &self,
        invocation: &Invocation,
        call: impl FnOnce(&D) -> Result<T, E>,
    ) -> Result<T, InvocationError<E>>
    where
        E: Display,
    {
        self.interceptors.before(invocation);
        let outcome = invoke_delegate(&*self.delegate, call);
        let observed = match &outcome {
            Ok(_) => CallOutcome::Returned,
            Err(InvocationError::Target(err)) => CallOutcome::Failed(err),
            Err(InvocationError::Panicked(_)) => CallOutcome::Panicked,
        };
        self.interceptors.after(invocation, &observed);
        outcome
    }
}

impl<D: ?Sized> Debug for Redirect<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redirect")
            .field("repository", &self.repository)
            .field("interceptors", &self.interceptors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{invoke_delegate, InvocationError, Redirect};
    use crate::dispatch::{CallInterceptor, InterceptorChain, Invocation};
    use crate::unit::{UnitError, UnitResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use thiserror::Error;

    #[derive(Debug, PartialEq, Eq, Error)]
    enum DoubleError {
        #[error("negative input {0}")]
        Negative(i64),
        #[error("unit: {0}")]
        Unit(String),
    }

    impl From<UnitError> for DoubleError {
        fn from(err: UnitError) -> Self {
            Self::Unit(err.to_string())
        }
    }

    #[derive(Default)]
    struct Doubler {
        calls: AtomicUsize,
    }

    impl Doubler {
        fn double(&self, value: i64) -> Result<i64, DoubleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if value < 0 {
                return Err(DoubleError::Negative(value));
            }
            Ok(value * 2)
        }
    }

    enum Around {
        Refuse,
        Skip,
        Twice,
        FailAfter,
    }

    impl CallInterceptor for Around {
        fn around(&self, _invocation: &Invocation, proceed: &mut dyn FnMut()) -> UnitResult<()> {
            match self {
                Self::Refuse => Err(UnitError::NotStarted),
                Self::Skip => Ok(()),
                Self::Twice => {
                    proceed();
                    proceed();
                    Ok(())
                }
                Self::FailAfter => {
                    proceed();
                    Err(UnitError::NotStarted)
                }
            }
        }
    }

    fn redirect_with(around: Around) -> Redirect<Doubler> {
        let around: Arc<dyn CallInterceptor> = Arc::new(around);
        let chain = InterceptorChain::new(vec![around]);
        Redirect::new("Doubler", Arc::new(Doubler::default()), chain)
    }

    fn calls(redirect: &Redirect<Doubler>) -> usize {
        redirect.delegate().calls.load(Ordering::SeqCst)
    }

    #[test]
    fn invoke_delegate_wraps_target_error() {
        let result = invoke_delegate(&Doubler::default(), |d| d.double(-1));
        assert!(matches!(
            result,
            Err(InvocationError::Target(DoubleError::Negative(-1)))
        ));
    }

    #[test]
    fn invoke_delegate_wraps_panic_payload() {
        let result: Result<(), InvocationError<String>> =
            invoke_delegate(&Doubler::default(), |_| panic!("boom"));
        match result {
            Err(InvocationError::Panicked(payload)) => {
                assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
            }
            other => panic!("expected panic payload, got {other:?}"),
        }
    }

    #[test]
    fn redirect_returns_delegate_value_and_error_unwrapped() {
        let redirect = Redirect::new(
            "Doubler",
            Arc::new(Doubler::default()),
            InterceptorChain::default(),
        );
        assert_eq!(redirect.invoke("double", |d| d.double(21)), Ok(42));
        assert_eq!(
            redirect.invoke("double", |d| d.double(-3)),
            Err(DoubleError::Negative(-3))
        );
    }

    #[test]
    fn around_error_without_proceed_skips_delegate() {
        let redirect = redirect_with(Around::Refuse);
        let result = redirect.invoke("double", |d| d.double(1));
        assert_eq!(
            result,
            Err(DoubleError::Unit(UnitError::NotStarted.to_string()))
        );
        assert_eq!(calls(&redirect), 0);
    }

    #[test]
    fn delegate_runs_once_when_around_never_proceeds() {
        let redirect = redirect_with(Around::Skip);
        assert_eq!(redirect.invoke("double", |d| d.double(4)), Ok(8));
        assert_eq!(calls(&redirect), 1);
    }

    #[test]
    fn repeated_proceed_calls_delegate_once() {
        let redirect = redirect_with(Around::Twice);
        assert_eq!(redirect.invoke("double", |d| d.double(5)), Ok(10));
        assert_eq!(calls(&redirect), 1);
    }

    #[test]
    fn around_error_after_success_replaces_value() {
        let redirect = redirect_with(Around::FailAfter);
        assert!(matches!(
            redirect.invoke("double", |d| d.double(2)),
            Err(DoubleError::Unit(_))
        ));
        assert_eq!(calls(&redirect), 1);
    }

    #[test]
    fn delegate_error_wins_over_around_error() {
        let redirect = redirect_with(Around::FailAfter);
        assert_eq!(
            redirect.invoke("double", |d| d.double(-2)),
            Err(DoubleError::Negative(-2))
        );
    }
}
