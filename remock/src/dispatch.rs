use std::any::TypeId;

use crate::identity::{MethodKey, MethodKind};
use crate::manager::HOOK_MANAGER;
use crate::reflect::{ArgTuple, Redirectable};
use crate::stub::BoxFuture;

fn key<T: Redirectable, I: ArgTuple>(
    name: &'static str,
    kind: MethodKind,
    generics: Vec<TypeId>,
) -> MethodKey {
    MethodKey {
        owner: TypeId::of::<T>(),
        name,
        kind,
        args: TypeId::of::<I>(),
        generics,
    }
}

fn invoke<I: ArgTuple, O: Send + 'static>(key: &MethodKey, input: I) -> Option<O> {
    // The stub is invoked outside every lock so it may freely call other
    // redirected methods.
    let stub = HOOK_MANAGER.live_stub(key)?;
    log::trace!("redirecting call to `{}`", key.name);
    let out = stub(Box::new(input));
    Some(
        *out.downcast::<O>()
            .expect("stub output type was validated at setup"),
    )
}

/// The call-side consult of a redirectable static method: instrumented bodies
/// call this first and fall through to the real body on `None`.
///
/// ```
/// use remock::{redirect, Descriptor, Mock, Redirectable, TypeMethods};
///
/// struct Calculator;
///
/// impl Redirectable for Calculator {
///     fn reflect(methods: &mut TypeMethods) {
///         methods.static_method::<(), i32>("magic");
///     }
/// }
///
/// impl Calculator {
///     fn magic() -> i32 {
///         redirect::<Calculator, (), i32>("magic", ()).unwrap_or(1)
///     }
/// }
///
/// let handle = Mock::setup(Descriptor::method::<Calculator>("magic"))
///     .returns(2)
///     .unwrap();
/// assert_eq!(Calculator::magic(), 2);
/// drop(handle);
/// assert_eq!(Calculator::magic(), 1);
/// ```
pub fn redirect<T: Redirectable, I: ArgTuple, O: Send + 'static>(
    name: &'static str,
    input: I,
) -> Option<O> {
    invoke(&key::<T, I>(name, MethodKind::Static, Vec::new()), input)
}

/// [`redirect`] for instance methods. The redirection applies to every
/// instance of the owner, so the receiver is not part of the key.
pub fn redirect_instance<T: Redirectable, I: ArgTuple, O: Send + 'static>(
    name: &'static str,
    input: I,
) -> Option<O> {
    invoke(&key::<T, I>(name, MethodKind::Instance, Vec::new()), input)
}

/// [`redirect`] for a property read. The accessor owns its own redirection
/// stack: a method sharing the property's name is a different identity.
pub fn redirect_getter<T: Redirectable, O: Send + 'static>(name: &'static str) -> Option<O> {
    invoke(
        &key::<T, ()>(name, MethodKind::PropertyGetter, Vec::new()),
        (),
    )
}

/// [`redirect`] for static members returning a boxed future: the instrumented
/// async body awaits the returned future when a redirection is active.
pub fn redirect_future<T: Redirectable, I: ArgTuple, O: Send + 'static>(
    name: &'static str,
    input: I,
) -> Option<BoxFuture<O>> {
    invoke(&key::<T, I>(name, MethodKind::Static, Vec::new()), input)
}

/// [`redirect_future`] for instance members.
pub fn redirect_instance_future<T: Redirectable, I: ArgTuple, O: Send + 'static>(
    name: &'static str,
    input: I,
) -> Option<BoxFuture<O>> {
    invoke(&key::<T, I>(name, MethodKind::Instance, Vec::new()), input)
}

/// [`redirect`] for closed generic instantiations; each distinct set of type
/// arguments owns an independent redirection stack.
pub fn redirect_generic<T: Redirectable, I: ArgTuple, O: Send + 'static>(
    name: &'static str,
    generics: Vec<TypeId>,
    input: I,
) -> Option<O> {
    invoke(&key::<T, I>(name, MethodKind::Static, generics), input)
}
