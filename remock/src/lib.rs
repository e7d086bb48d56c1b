//! Scoped static mocking: temporarily redirect static methods, instance
//! methods, and property getters to configured stubs, and restore the
//! original behavior when the returned handle is disposed or dropped.
//!
//! Owner types declare their redirectable members through [`Redirectable`];
//! instrumented bodies consult the dispatch function matching their member
//! kind ([`redirect`], [`redirect_instance`], [`redirect_getter`],
//! [`redirect_future`], [`redirect_instance_future`], [`redirect_generic`])
//! and fall through to the real body when no redirection is active. A member's
//! kind is part of its identity, so a getter and a method sharing a name are
//! redirected independently. Setups on the same member stack: the last installed
//! layer wins, and disposing a handle reveals the next outer layer or the
//! original, in any disposal order.
//!
//! ```
//! use remock::{redirect, Descriptor, Mock, Redirectable, TypeMethods};
//!
//! struct Calculator;
//!
//! impl Redirectable for Calculator {
//!     fn reflect(methods: &mut TypeMethods) {
//!         methods.static_method::<(i32, i32), i32>("add");
//!     }
//! }
//!
//! impl Calculator {
//!     fn add(a: i32, b: i32) -> i32 {
//!         redirect::<Calculator, (i32, i32), i32>("add", (a, b)).unwrap_or_else(|| a + b)
//!     }
//! }
//!
//! let handle = Mock::setup(Descriptor::method::<Calculator>("add"))
//!     .returns_with(|(a, _b): (i32, i32)| a * 10)
//!     .unwrap();
//! assert_eq!(Calculator::add(2, 3), 20);
//! drop(handle);
//! assert_eq!(Calculator::add(2, 3), 5);
//! ```

mod dispatch;
mod engine;
mod error;
mod handle;
mod identity;
mod manager;
mod matcher;
mod reflect;
mod resolve;
mod setup;
mod stub;
mod throw;

pub use dispatch::{
    redirect, redirect_future, redirect_generic, redirect_getter, redirect_instance,
    redirect_instance_future,
};
pub use engine::LayerId;
pub use error::{ResolutionError, Result, SetupError, SignatureError};
pub use handle::MockHandle;
pub use identity::{BindingFlags, MethodIdentity, MethodKind, MethodShape, ReturnSig, TypeSig};
pub use matcher::{It, Matcher};
pub use reflect::{ArgTuple, MethodMetadata, Redirectable, SigTemplate, TypeMethods};
pub use resolve::{resolve, resolve_expr, Descriptor, TargetExpr};
pub use setup::{ActionSetup, MatchedSetup, Mock, PropertySetup, Setup, Target};
pub use stub::{
    synthesize, ActionCallback, BoxArgs, BoxFuture, BoxRet, FixedValue, NativeStub, StubSpec,
    ValueFactory,
};
pub use throw::{CtorArgs, Exception, ExceptionSpec, Thrown};
