use std::any::Any;
use std::fmt;

use crate::error::SetupError;

/// Constructor arguments for a configured throw, outermost constructor order.
#[derive(Default)]
pub struct CtorArgs(Vec<Box<dyn Any + Send>>);

impl CtorArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg<T: Send + 'static>(mut self, value: T) -> Self {
        self.0.push(Box::new(value));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The argument at `index`, if present and of type `T`.
    pub fn get<T: 'static>(&self, index: usize) -> Option<&T> {
        self.0.get(index)?.downcast_ref::<T>()
    }
}

/// A throwable payload type. `construct` plays the role of constructor lookup:
/// it receives the caller-supplied arguments and either builds the exception
/// or reports why no constructor accepts them.
pub trait Exception: Send + Sync + 'static {
    fn construct(args: &CtorArgs) -> std::result::Result<Self, String>
    where
        Self: Sized;
}

/// The panic payload raised by a throwing stub. Tests recover the typed
/// exception with [`Thrown::downcast`] after `catch_unwind`.
pub struct Thrown {
    pub type_name: &'static str,
    payload: Box<dyn Any + Send>,
}

impl Thrown {
    pub fn is<E: 'static>(&self) -> bool {
        self.payload.is::<E>()
    }

    pub fn downcast<E: 'static>(self) -> std::result::Result<E, Thrown> {
        let type_name = self.type_name;
        match self.payload.downcast::<E>() {
            Ok(payload) => Ok(*payload),
            Err(payload) => Err(Thrown { type_name, payload }),
        }
    }
}

impl fmt::Debug for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thrown `{}`", self.type_name)
    }
}

/// A validated throw configuration: constructs the exception once at setup
/// time, then raises a fresh clone per call.
pub struct ExceptionSpec {
    type_name: &'static str,
    raise: Box<dyn Fn() -> Thrown + Send + Sync>,
}

impl fmt::Debug for ExceptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExceptionSpec for `{}`", self.type_name)
    }
}

impl ExceptionSpec {
    /// Validates the constructor arguments by constructing a prototype.
    /// Fails with `ExceptionConstruction` when no constructor matches.
    pub fn of<E: Exception + Clone>(args: CtorArgs) -> Result<Self, SetupError> {
        let type_name = std::any::type_name::<E>();
        let prototype = E::construct(&args).map_err(|reason| SetupError::ExceptionConstruction {
            type_name,
            reason,
        })?;
        Ok(Self {
            type_name,
            raise: Box::new(move || Thrown {
                type_name,
                payload: Box::new(prototype.clone()),
            }),
        })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn raise(&self) -> Thrown {
        (self.raise)()
    }
}
