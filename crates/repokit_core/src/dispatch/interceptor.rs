//! Call interception for façade methods.

use crate::unit::UnitResult;
use log::{debug, warn};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// One façade method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub repository: &'static str,
    pub method: &'static str,
}

/// How a delegate call finished.
pub enum CallOutcome<'a> {
    Returned,
    Failed(&'a dyn Display),
    Panicked,
}

impl Debug for CallOutcome<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Returned => write!(f, "Returned"),
            Self::Failed(err) => write!(f, "Failed({err})"),
            Self::Panicked => write!(f, "Panicked"),
        }
    }
}

/// Cross-cutting hook around every façade call.
///
/// `before` and `after` observe calls; they cannot alter arguments or results.
/// `around` wraps the whole call and may fail it, e.g. when it begins a unit of
/// work that cannot be opened.
pub trait CallInterceptor: Send + Sync {
    fn before(&self, _invocation: &Invocation) {}

    fn after(&self, _invocation: &Invocation, _outcome: &CallOutcome<'_>) {}

    /// Wraps the call; `proceed` runs the inner interceptors and the delegate.
    ///
    /// `proceed` never unwinds: a delegate panic is resumed only after every
    /// `around` has returned. An error returned here reaches the caller
    /// through the method's error type. Returning an error without calling
    /// `proceed` skips the delegate.
    fn around(&self, _invocation: &Invocation, proceed: &mut dyn FnMut()) -> UnitResult<()> {
        proceed();
        Ok(())
    }
}

/// Ordered interceptors shared by every façade of one installer.
///
/// `around` nests in registration order, the first interceptor outermost.
/// Inside the innermost `around`, `before` runs in registration order and
/// `after` in reverse.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Arc<Vec<Arc<dyn CallInterceptor>>>,
}

impl InterceptorChain {
    pub fn new(interceptors: Vec<Arc<dyn CallInterceptor>>) -> Self {
        Self {
            interceptors: Arc::new(interceptors),
        }
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub(crate) fn before(&self, invocation: &Invocation) {
        for interceptor in self.interceptors.iter() {
            interceptor.before(invocation);
        }
    }

    pub(crate) fn after(&self, invocation: &Invocation, outcome: &CallOutcome<'_>) {
        for interceptor in self.interceptors.iter().rev() {
            interceptor.after(invocation, outcome);
        }
    }

    /// Runs `innermost` inside every interceptor's `around`.
    ///
    /// An inner error wins over an outer one.
    pub(crate) fn around(
        &self,
        invocation: &Invocation,
        innermost: &mut dyn FnMut(),
    ) -> UnitResult<()> {
        self.around_from(0, invocation, innermost)
    }

    fn around_from(
        &self,
        index: usize,
        invocation: &Invocation,
        innermost: &mut dyn FnMut(),
    ) -> UnitResult<()> {
        let Some(interceptor) = self.interceptors.get(index) else {
            innermost();
            return Ok(());
        };
        let mut inner = Ok(());
        let outer = {
            let mut proceed = || {
                inner = self.around_from(index + 1, invocation, &mut *innermost);
            };
            interceptor.around(invocation, &mut proceed)
        };
        inner.and(outer)
    }
}

impl Debug for InterceptorChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.len())
            .finish()
    }
}

/// Logs every repository call outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInterceptor;

impl CallInterceptor for LoggingInterceptor {
    fn after(&self, invocation: &Invocation, outcome: &CallOutcome<'_>) {
        match outcome {
            CallOutcome::Returned => debug!(
                "event=repository_call module=dispatch status=ok repository={} method={}",
                invocation.repository, invocation.method
            ),
            CallOutcome::Failed(err) => warn!(
                "event=repository_call module=dispatch status=error repository={} method={} \
                 error={}",
                invocation.repository, invocation.method, err
            ),
            CallOutcome::Panicked => warn!(
                "event=repository_call module=dispatch status=panic repository={} method={}",
                invocation.repository, invocation.method
            ),
        }
    }
}
