use std::any::Any;
use std::future::Future;
use std::panic::panic_any;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{SetupError, SignatureError};
use crate::identity::{MethodIdentity, MethodKind, ReturnSig, TypeSig};
use crate::reflect::ArgTuple;
use crate::throw::ExceptionSpec;

/// Boxed argument tuple handed to a stub.
pub type BoxArgs = Box<dyn Any + Send>;
/// Boxed return value produced by a stub.
pub type BoxRet = Box<dyn Any + Send>;
/// The return shape of redirected async members.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// The replacement callable installed into an entry slot. Invoked with the
/// boxed argument tuple of the redirected call.
pub type NativeStub = Arc<dyn Fn(BoxArgs) -> BoxRet + Send + Sync>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum RetShape {
    Plain,
    Future,
}

pub struct FixedValue {
    ret: TypeSig,
    shape: RetShape,
    produce: Box<dyn Fn() -> BoxRet + Send + Sync>,
    produce_future: Box<dyn Fn() -> BoxRet + Send + Sync>,
}

pub struct ValueFactory {
    args: TypeSig,
    params: Vec<TypeSig>,
    ret: TypeSig,
    call: Box<dyn Fn(BoxArgs) -> BoxRet + Send + Sync>,
    call_future: Box<dyn Fn(BoxArgs) -> BoxRet + Send + Sync>,
}

pub struct ActionCallback {
    args: TypeSig,
    params: Vec<TypeSig>,
    call: Box<dyn Fn(BoxArgs) + Send + Sync>,
}

/// What the stub should do in place of the original body.
pub enum StubSpec {
    FixedValue(FixedValue),
    ValueFactory(ValueFactory),
    ActionCallback(ActionCallback),
    Exception(ExceptionSpec),
    /// Call through to nothing; only legal for void non-property members.
    Noop,
}

impl StubSpec {
    /// A fixed value, cloned per call. Against a future-of-`O` target the
    /// value is wrapped into a ready future.
    pub fn returns<O: Clone + Send + Sync + 'static>(value: O) -> Self {
        let value = Arc::new(value);
        let produce = {
            let value = Arc::clone(&value);
            Box::new(move || -> BoxRet { Box::new((*value).clone()) })
        };
        let produce_future = Box::new(move || -> BoxRet {
            let ready: BoxFuture<O> = Box::pin(std::future::ready((*value).clone()));
            Box::new(ready)
        });
        StubSpec::FixedValue(FixedValue {
            ret: TypeSig::of::<O>(),
            shape: RetShape::Plain,
            produce,
            produce_future,
        })
    }

    /// An explicitly async fixed value; only legal against future-of-`O`
    /// targets, where it behaves like [`returns`](Self::returns).
    pub fn returns_async<O: Clone + Send + Sync + 'static>(value: O) -> Self {
        let StubSpec::FixedValue(fixed) = Self::returns(value) else {
            unreachable!("returns always builds a fixed value");
        };
        StubSpec::FixedValue(FixedValue {
            shape: RetShape::Future,
            ..fixed
        })
    }

    /// A factory invoked with the call's argument tuple.
    pub fn returns_with<I, O, F>(factory: F) -> Self
    where
        I: ArgTuple,
        O: Send + 'static,
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        let factory = Arc::new(factory);
        let call = {
            let factory = Arc::clone(&factory);
            Box::new(move |args: BoxArgs| -> BoxRet {
                let input = *args
                    .downcast::<I>()
                    .expect("argument tuple shape was validated at setup");
                Box::new(factory(input))
            })
        };
        let call_future = Box::new(move |args: BoxArgs| -> BoxRet {
            let input = *args
                .downcast::<I>()
                .expect("argument tuple shape was validated at setup");
            let ready: BoxFuture<O> = Box::pin(std::future::ready(factory(input)));
            Box::new(ready)
        });
        StubSpec::ValueFactory(ValueFactory {
            args: I::tuple_sig(),
            params: I::type_sigs(),
            ret: TypeSig::of::<O>(),
            call,
            call_future,
        })
    }

    /// A side-effect callback; only legal for void targets.
    pub fn callback<I, F>(callback: F) -> Self
    where
        I: ArgTuple,
        F: Fn(I) + Send + Sync + 'static,
    {
        StubSpec::ActionCallback(ActionCallback {
            args: I::tuple_sig(),
            params: I::type_sigs(),
            call: Box::new(move |args: BoxArgs| {
                let input = *args
                    .downcast::<I>()
                    .expect("argument tuple shape was validated at setup");
                callback(input);
            }),
        })
    }

    pub fn throws(spec: ExceptionSpec) -> Self {
        StubSpec::Exception(spec)
    }
}

fn check_args(
    identity: &MethodIdentity,
    args: &TypeSig,
    params: &[TypeSig],
) -> Result<(), SignatureError> {
    if args.id == identity.key().args {
        return Ok(());
    }
    if params.len() != identity.params.len() {
        return Err(SignatureError::Arity {
            name: identity.display_name(),
            expected: identity.params.len(),
            found: params.len(),
        });
    }
    for (index, (expected, found)) in identity.params.iter().zip(params).enumerate() {
        if expected != found {
            return Err(SignatureError::Parameter {
                name: identity.display_name(),
                index,
                expected: expected.name,
                found: found.name,
            });
        }
    }
    // Element-wise equal tuples share a TypeId, so this is unreachable; treat
    // it as an arity problem rather than panicking in a validation path.
    Err(SignatureError::Arity {
        name: identity.display_name(),
        expected: identity.params.len(),
        found: params.len(),
    })
}

fn void_mismatch(identity: &MethodIdentity, detail: &'static str) -> SetupError {
    SetupError::VoidReturnMismatch {
        name: identity.display_name(),
        detail,
    }
}

fn return_mismatch(identity: &MethodIdentity, expected: &ReturnSig, found: String) -> SetupError {
    let expected = match expected {
        ReturnSig::Void => "()".to_string(),
        ReturnSig::Value(sig) => sig.name.to_string(),
        ReturnSig::Future(sig) => format!("future of `{}`", sig.name),
    };
    SignatureError::Return {
        name: identity.display_name(),
        expected,
        found,
    }
    .into()
}

/// Builds the native-callable replacement for `identity` out of `spec`,
/// validating arity, parameter types and return shape. Nothing is installed
/// here; a failed synthesis leaves the method untouched.
pub fn synthesize(identity: &MethodIdentity, spec: StubSpec) -> Result<NativeStub, SetupError> {
    match spec {
        StubSpec::FixedValue(fixed) => match identity.ret {
            ReturnSig::Void => Err(void_mismatch(
                identity,
                "a value-returning spec was supplied for a void method",
            )),
            ReturnSig::Value(sig) => {
                if fixed.shape == RetShape::Future {
                    return Err(return_mismatch(
                        identity,
                        &identity.ret,
                        format!("future of `{}`", fixed.ret.name),
                    ));
                }
                if fixed.ret != sig {
                    return Err(return_mismatch(identity, &identity.ret, fixed.ret.name.into()));
                }
                let produce = fixed.produce;
                Ok(Arc::new(move |_args| produce()))
            }
            ReturnSig::Future(sig) => {
                if fixed.ret != sig {
                    return Err(return_mismatch(identity, &identity.ret, fixed.ret.name.into()));
                }
                let produce = fixed.produce_future;
                Ok(Arc::new(move |_args| produce()))
            }
        },
        StubSpec::ValueFactory(factory) => {
            check_args(identity, &factory.args, &factory.params)?;
            match identity.ret {
                ReturnSig::Void => Err(void_mismatch(
                    identity,
                    "a value-returning spec was supplied for a void method",
                )),
                ReturnSig::Value(sig) => {
                    if factory.ret != sig {
                        return Err(return_mismatch(
                            identity,
                            &identity.ret,
                            factory.ret.name.into(),
                        ));
                    }
                    let call = factory.call;
                    Ok(Arc::new(move |args| call(args)))
                }
                ReturnSig::Future(sig) => {
                    if factory.ret != sig {
                        return Err(return_mismatch(
                            identity,
                            &identity.ret,
                            factory.ret.name.into(),
                        ));
                    }
                    let call = factory.call_future;
                    Ok(Arc::new(move |args| call(args)))
                }
            }
        }
        StubSpec::ActionCallback(action) => {
            check_args(identity, &action.args, &action.params)?;
            if !identity.ret.is_void() {
                return Err(return_mismatch(identity, &identity.ret, "()".into()));
            }
            let call = action.call;
            Ok(Arc::new(move |args| {
                call(args);
                Box::new(())
            }))
        }
        StubSpec::Exception(exception) => Ok(Arc::new(move |_args| panic_any(exception.raise()))),
        StubSpec::Noop => {
            if identity.kind == MethodKind::PropertyGetter {
                return Err(SetupError::PropertyNotSupported {
                    name: identity.display_name(),
                });
            }
            if !identity.ret.is_void() {
                return Err(void_mismatch(
                    identity,
                    "default setup is only supported for void methods",
                ));
            }
            Ok(Arc::new(|_args| Box::new(())))
        }
    }
}

#[cfg(test)]
mod test {
    use std::any::TypeId;

    use pretty_assertions::assert_eq;

    use crate::identity::{BindingFlags, MethodShape};
    use crate::throw::{CtorArgs, Exception, Thrown};

    use super::*;

    fn identity<I: ArgTuple, O: Send + 'static>(ret: ReturnSig) -> MethodIdentity {
        MethodIdentity::new(
            TypeSig::of::<u8>(),
            "target",
            TypeId::of::<I>(),
            MethodKind::Static,
            BindingFlags::default(),
            I::type_sigs(),
            vec![],
            ret,
            MethodShape::Redirectable,
        )
    }

    fn value_identity<I: ArgTuple, O: Send + 'static>() -> MethodIdentity {
        identity::<I, O>(ReturnSig::Value(TypeSig::of::<O>()))
    }

    // `NativeStub` has no `Debug` impl, so `unwrap_err` cannot be used here.
    fn synthesize_err(identity: &MethodIdentity, spec: StubSpec) -> SetupError {
        match synthesize(identity, spec) {
            Ok(_) => panic!("expected the synthesis to fail"),
            Err(err) => err,
        }
    }

    #[test]
    fn fixed_value_is_cloned_per_call() {
        let stub = synthesize(
            &value_identity::<(), String>(),
            StubSpec::returns("meow".to_string()),
        )
        .unwrap();
        for _ in 0..2 {
            let out = stub(Box::new(()));
            assert_eq!(*out.downcast::<String>().unwrap(), "meow");
        }
    }

    #[test]
    fn factory_receives_the_argument_tuple() {
        let stub = synthesize(
            &value_identity::<(i32, i32), i32>(),
            StubSpec::returns_with(|(a, b): (i32, i32)| a + b),
        )
        .unwrap();
        let out = stub(Box::new((20, 22)));
        assert_eq!(*out.downcast::<i32>().unwrap(), 42);
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let err = synthesize_err(
            &value_identity::<(i32, i32), i32>(),
            StubSpec::returns_with(|(a,): (i32,)| a),
        );
        assert!(matches!(
            err,
            SetupError::Signature(SignatureError::Arity {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn parameter_type_mismatch_names_the_index() {
        let err = synthesize_err(
            &value_identity::<(i32, String), i32>(),
            StubSpec::returns_with(|(a, _b): (i32, u8)| a),
        );
        assert!(matches!(
            err,
            SetupError::Signature(SignatureError::Parameter { index: 1, .. })
        ));
    }

    #[test]
    fn return_type_mismatch_is_rejected() {
        let err = synthesize_err(&value_identity::<(), i32>(), StubSpec::returns("nope"));
        assert!(matches!(
            err,
            SetupError::Signature(SignatureError::Return { .. })
        ));
    }

    #[test]
    fn value_spec_on_void_method_is_rejected() {
        let err = synthesize_err(&identity::<(), ()>(ReturnSig::Void), StubSpec::returns(1i32));
        assert!(matches!(err, SetupError::VoidReturnMismatch { .. }));
    }

    #[test]
    fn callback_runs_on_void_target() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let stub = synthesize(
            &identity::<(usize,), ()>(ReturnSig::Void),
            StubSpec::callback(|(n,): (usize,)| {
                CALLS.fetch_add(n, Ordering::SeqCst);
            }),
        )
        .unwrap();
        stub(Box::new((3usize,)));
        assert_eq!(CALLS.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn callback_on_value_target_is_rejected() {
        let err = synthesize_err(
            &value_identity::<(usize,), i32>(),
            StubSpec::callback(|(_,): (usize,)| {}),
        );
        assert!(matches!(
            err,
            SetupError::Signature(SignatureError::Return { .. })
        ));
    }

    #[test]
    fn plain_value_is_wrapped_for_future_targets() {
        let stub = synthesize(
            &identity::<(), i32>(ReturnSig::Future(TypeSig::of::<i32>())),
            StubSpec::returns(7i32),
        )
        .unwrap();
        let out = stub(Box::new(()));
        let future = *out.downcast::<BoxFuture<i32>>().unwrap();
        assert_eq!(async_std::task::block_on(future), 7);
    }

    #[test]
    fn async_spec_on_sync_target_is_rejected() {
        let err = synthesize_err(&value_identity::<(), i32>(), StubSpec::returns_async(7i32));
        assert!(matches!(
            err,
            SetupError::Signature(SignatureError::Return { .. })
        ));
    }

    #[test]
    fn noop_requires_a_void_non_property_target() {
        assert!(synthesize(&identity::<(), ()>(ReturnSig::Void), StubSpec::Noop).is_ok());

        let err = synthesize_err(&value_identity::<(), i32>(), StubSpec::Noop);
        assert!(matches!(err, SetupError::VoidReturnMismatch { .. }));

        let mut getter = value_identity::<(), i32>();
        getter.kind = MethodKind::PropertyGetter;
        let err = synthesize_err(&getter, StubSpec::Noop);
        assert!(matches!(err, SetupError::PropertyNotSupported { .. }));
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Boom {
        message: String,
    }

    impl Exception for Boom {
        fn construct(args: &CtorArgs) -> Result<Self, String> {
            match (args.len(), args.get::<&str>(0)) {
                (1, Some(message)) => Ok(Boom {
                    message: message.to_string(),
                }),
                _ => Err("expected a single message argument".into()),
            }
        }
    }

    #[test]
    fn throwing_stub_raises_the_configured_exception() {
        let spec = ExceptionSpec::of::<Boom>(CtorArgs::new().arg("bang")).unwrap();
        let stub = synthesize(&value_identity::<(), i32>(), StubSpec::throws(spec)).unwrap();

        let err = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            stub(Box::new(()));
        }))
        .unwrap_err();
        let thrown = err.downcast::<Thrown>().unwrap();
        assert_eq!(thrown.downcast::<Boom>().unwrap().message, "bang");
    }
}
