use std::{any::Any, error, fmt, sync::Arc};

/// The outcome of running an [`Effect`](super::Effect).
pub type Exit<A, E> = Result<A, Cause<E>>;

/// Why an [`Effect`](super::Effect) did not succeed.
#[derive(Debug)]
pub enum Cause<E> {
    /// A failure declared in the effect's error type.
    Fail(E),
    /// A failure the effect's type never declared. A bug, not an expected case.
    Die(Defect),
}

impl<E> Cause<E> {
    pub fn map<E2>(self, f: impl FnOnce(E) -> E2) -> Cause<E2> {
        match self {
            Cause::Fail(err) => Cause::Fail(f(err)),
            Cause::Die(defect) => Cause::Die(defect),
        }
    }

    pub fn failure(&self) -> Option<&E> {
        match self {
            Cause::Fail(err) => Some(err),
            Cause::Die(_) => None,
        }
    }

    pub fn defect(&self) -> Option<&Defect> {
        match self {
            Cause::Fail(_) => None,
            Cause::Die(defect) => Some(defect),
        }
    }

    pub fn is_die(&self) -> bool {
        matches!(self, Cause::Die(_))
    }
}

impl<E> Cause<E>
where
    E: error::Error + Send + Sync + 'static,
{
    /// Reduce the cause to the single error that best describes it.
    pub fn squash(self) -> Arc<dyn error::Error + Send + Sync> {
        match self {
            Cause::Fail(err) => Arc::new(err),
            Cause::Die(defect) => defect.into_inner(),
        }
    }
}

impl<E: fmt::Display> fmt::Display for Cause<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Fail(err) => write!(f, "Fail({err})"),
            Cause::Die(defect) => write!(f, "Die({defect})"),
        }
    }
}

/// An undeclared failure.
#[derive(Clone)]
pub struct Defect(Arc<dyn error::Error + Send + Sync>);

impl Defect {
    pub fn new(err: impl error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_string(),
                Err(_) => "Box<dyn Any>".to_string(),
            },
        };

        Self::new(Panic(message))
    }

    pub fn get(&self) -> &(dyn error::Error + Send + Sync + 'static) {
        &*self.0
    }

    pub fn into_inner(self) -> Arc<dyn error::Error + Send + Sync> {
        self.0
    }
}

impl fmt::Debug for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Defect").field(&self.0).finish()
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A panic caught while running an effect.
#[derive(Debug, Clone, thiserror::Error)]
#[error("panicked: {0}")]
pub struct Panic(pub String);
