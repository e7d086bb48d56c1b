use crate::error::Result;
use crate::handle::MockHandle;
use crate::manager::HOOK_MANAGER;
use crate::matcher::Matcher;
use crate::reflect::ArgTuple;
use crate::resolve::{resolve, resolve_expr, Descriptor, TargetExpr};
use crate::stub::{synthesize, StubSpec};
use crate::throw::{CtorArgs, Exception, ExceptionSpec};

/// A resolvable redirection target: a descriptor or a parsed expression body.
pub enum Target {
    Descriptor(Descriptor),
    Expr(TargetExpr),
}

impl From<Descriptor> for Target {
    fn from(descriptor: Descriptor) -> Self {
        Target::Descriptor(descriptor)
    }
}

impl From<TargetExpr> for Target {
    fn from(expr: TargetExpr) -> Self {
        Target::Expr(expr)
    }
}

/// Resolve, synthesize, install: the single path every setup variant funnels
/// through. A failure at any step leaves the target untouched.
fn install(target: Target, spec: StubSpec) -> Result<MockHandle> {
    let identity = match target {
        Target::Descriptor(descriptor) => resolve(&descriptor)?,
        Target::Expr(expr) => resolve_expr(expr)?,
    };
    let stub = synthesize(&identity, spec)?;
    let layer = HOOK_MANAGER.install(&identity, stub)?;
    Ok(MockHandle::new(identity, layer))
}

/// Entry points of the mocking surface.
pub struct Mock;

impl Mock {
    /// Starts a setup for a value-returning or void member.
    pub fn setup(target: impl Into<Target>) -> Setup {
        Setup {
            target: target.into(),
        }
    }

    /// Starts a setup for a void member; only callbacks and throws apply.
    pub fn setup_action(target: impl Into<Target>) -> ActionSetup {
        ActionSetup {
            target: target.into(),
        }
    }

    /// Starts a setup for a property getter.
    pub fn setup_property(target: impl Into<Target>) -> PropertySetup {
        PropertySetup {
            target: target.into(),
        }
    }

    /// Installs a stub that calls through to nothing. Legal only for void
    /// non-property members.
    pub fn setup_default(target: impl Into<Target>) -> Result<MockHandle> {
        install(target.into(), StubSpec::Noop)
    }
}

pub struct Setup {
    target: Target,
}

impl Setup {
    /// The mocked member returns a clone of `value` on every call.
    pub fn returns<O: Clone + Send + Sync + 'static>(self, value: O) -> Result<MockHandle> {
        install(self.target, StubSpec::returns(value))
    }

    /// Like [`returns`](Self::returns) but declared async; only legal for
    /// future-returning members.
    pub fn returns_async<O: Clone + Send + Sync + 'static>(self, value: O) -> Result<MockHandle> {
        install(self.target, StubSpec::returns_async(value))
    }

    /// The mocked member computes its result from the call arguments.
    pub fn returns_with<I, O, F>(self, factory: F) -> Result<MockHandle>
    where
        I: ArgTuple,
        O: Send + 'static,
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        install(self.target, StubSpec::returns_with(factory))
    }

    /// The mocked member runs a side-effect callback (void members only).
    pub fn callback<I, F>(self, callback: F) -> Result<MockHandle>
    where
        I: ArgTuple,
        F: Fn(I) + Send + Sync + 'static,
    {
        install(self.target, StubSpec::callback(callback))
    }

    /// The mocked member throws `E`, constructed from `args` — validated now,
    /// raised per call.
    pub fn throws<E: Exception + Clone>(self, args: CtorArgs) -> Result<MockHandle> {
        let spec = ExceptionSpec::of::<E>(args)?;
        install(self.target, StubSpec::throws(spec))
    }

    /// Guards the setup with argument matchers; a redirected call whose
    /// arguments miss the guard panics.
    pub fn matching<I, M>(self, matchers: M) -> MatchedSetup<I>
    where
        I: ArgTuple + PartialEq,
        M: Into<Matcher<I>>,
    {
        MatchedSetup {
            target: self.target,
            matcher: matchers.into(),
        }
    }
}

pub struct MatchedSetup<I> {
    target: Target,
    matcher: Matcher<I>,
}

impl<I> MatchedSetup<I>
where
    I: ArgTuple + PartialEq + Sync,
{
    pub fn returns_with<O, F>(self, factory: F) -> Result<MockHandle>
    where
        O: Send + 'static,
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        let MatchedSetup { target, matcher } = self;
        install(
            target,
            StubSpec::returns_with(move |input: I| {
                if !matcher.matches(&input) {
                    panic!("redirected call arguments did not satisfy the configured matchers");
                }
                factory(input)
            }),
        )
    }

    pub fn returns<O: Clone + Send + Sync + 'static>(self, value: O) -> Result<MockHandle> {
        self.returns_with(move |_| value.clone())
    }
}

pub struct ActionSetup {
    target: Target,
}

impl ActionSetup {
    pub fn callback<I, F>(self, callback: F) -> Result<MockHandle>
    where
        I: ArgTuple,
        F: Fn(I) + Send + Sync + 'static,
    {
        install(self.target, StubSpec::callback(callback))
    }

    pub fn throws<E: Exception + Clone>(self, args: CtorArgs) -> Result<MockHandle> {
        let spec = ExceptionSpec::of::<E>(args)?;
        install(self.target, StubSpec::throws(spec))
    }
}

pub struct PropertySetup {
    target: Target,
}

impl PropertySetup {
    pub fn returns<O: Clone + Send + Sync + 'static>(self, value: O) -> Result<MockHandle> {
        install(self.target, StubSpec::returns(value))
    }

    pub fn throws<E: Exception + Clone>(self, args: CtorArgs) -> Result<MockHandle> {
        let spec = ExceptionSpec::of::<E>(args)?;
        install(self.target, StubSpec::throws(spec))
    }
}
