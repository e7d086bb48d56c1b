use std::any::TypeId;

use crate::identity::{BindingFlags, MethodKind, MethodShape, ReturnSig, TypeSig};

/// Implemented by owner types whose members can be redirected. The
/// implementation declares every redirectable member into the catalog; the
/// Method Resolver reads it back when a setup names the owner.
pub trait Redirectable: 'static {
    fn reflect(methods: &mut TypeMethods);
}

/// An argument tuple of a redirectable member. Implemented for tuples up to
/// eight elements.
pub trait ArgTuple: Send + 'static {
    fn type_sigs() -> Vec<TypeSig>;

    fn tuple_sig() -> TypeSig
    where
        Self: Sized,
    {
        TypeSig::of::<Self>()
    }
}

macro_rules! arg_tuple {
    ($($ty:ident),*) => {
        impl<$($ty: Send + 'static),*> ArgTuple for ($($ty,)*) {
            fn type_sigs() -> Vec<TypeSig> {
                vec![$(TypeSig::of::<$ty>()),*]
            }
        }
    };
}

arg_tuple!();
arg_tuple!(A);
arg_tuple!(A, B);
arg_tuple!(A, B, C);
arg_tuple!(A, B, C, D);
arg_tuple!(A, B, C, D, E);
arg_tuple!(A, B, C, D, E, F);
arg_tuple!(A, B, C, D, E, F, G);
arg_tuple!(A, B, C, D, E, F, G, H);

/// Signature of a declared member. Generic members stay open until a setup
/// closes them with concrete type arguments.
#[derive(Clone, Debug)]
pub enum SigTemplate {
    Closed {
        args: TypeId,
        params: Vec<TypeSig>,
        ret: ReturnSig,
    },
    Generic {
        arity: usize,
    },
}

#[derive(Clone, Debug)]
pub struct MethodMetadata {
    pub name: &'static str,
    pub kind: MethodKind,
    pub flags: BindingFlags,
    pub sig: SigTemplate,
    pub shape: MethodShape,
}

impl MethodMetadata {
    /// Marks the member non-public; it is then only resolvable with
    /// `BindingFlags::NON_PUBLIC` set.
    pub fn non_public(&mut self) -> &mut Self {
        self.flags.remove(BindingFlags::PUBLIC);
        self.flags.insert(BindingFlags::NON_PUBLIC);
        self
    }

    /// Declares that the member cannot host a redirection, e.g. because it is
    /// always inlined and its call sites no longer consult an entry slot.
    pub fn not_redirectable(&mut self, reason: &'static str) -> &mut Self {
        self.shape = MethodShape::NotRedirectable(reason);
        self
    }
}

/// The per-owner member catalog filled in by [`Redirectable::reflect`].
pub struct TypeMethods {
    owner: TypeSig,
    default_constructible: bool,
    entries: Vec<MethodMetadata>,
}

impl TypeMethods {
    pub(crate) fn new(owner: TypeSig) -> Self {
        Self {
            owner,
            default_constructible: false,
            entries: Vec::new(),
        }
    }

    pub(crate) fn owner(&self) -> TypeSig {
        self.owner
    }

    pub(crate) fn is_default_constructible(&self) -> bool {
        self.default_constructible
    }

    pub(crate) fn entries(&self) -> &[MethodMetadata] {
        &self.entries
    }

    /// Declares that the owner has a parameterless constructor, so instance
    /// members can be resolved without supplying a receiver.
    pub fn default_constructible(&mut self) -> &mut Self {
        self.default_constructible = true;
        self
    }

    pub fn static_method<I: ArgTuple, O: Send + 'static>(
        &mut self,
        name: &'static str,
    ) -> &mut MethodMetadata {
        self.push::<I>(
            name,
            MethodKind::Static,
            BindingFlags::PUBLIC | BindingFlags::STATIC,
            ReturnSig::Value(TypeSig::of::<O>()),
        )
    }

    pub fn instance_method<I: ArgTuple, O: Send + 'static>(
        &mut self,
        name: &'static str,
    ) -> &mut MethodMetadata {
        self.push::<I>(
            name,
            MethodKind::Instance,
            BindingFlags::PUBLIC | BindingFlags::INSTANCE,
            ReturnSig::Value(TypeSig::of::<O>()),
        )
    }

    pub fn void_static_method<I: ArgTuple>(&mut self, name: &'static str) -> &mut MethodMetadata {
        self.push::<I>(
            name,
            MethodKind::Static,
            BindingFlags::PUBLIC | BindingFlags::STATIC,
            ReturnSig::Void,
        )
    }

    pub fn void_instance_method<I: ArgTuple>(&mut self, name: &'static str) -> &mut MethodMetadata {
        self.push::<I>(
            name,
            MethodKind::Instance,
            BindingFlags::PUBLIC | BindingFlags::INSTANCE,
            ReturnSig::Void,
        )
    }

    /// A member returning `BoxFuture<O>`; instrumented bodies consult
    /// [`redirect_future`](crate::redirect_future).
    pub fn async_static_method<I: ArgTuple, O: Send + 'static>(
        &mut self,
        name: &'static str,
    ) -> &mut MethodMetadata {
        self.push::<I>(
            name,
            MethodKind::Static,
            BindingFlags::PUBLIC | BindingFlags::STATIC,
            ReturnSig::Future(TypeSig::of::<O>()),
        )
    }

    /// Like [`async_static_method`](Self::async_static_method) for instance
    /// members; consulted through
    /// [`redirect_instance_future`](crate::redirect_instance_future).
    pub fn async_instance_method<I: ArgTuple, O: Send + 'static>(
        &mut self,
        name: &'static str,
    ) -> &mut MethodMetadata {
        self.push::<I>(
            name,
            MethodKind::Instance,
            BindingFlags::PUBLIC | BindingFlags::INSTANCE,
            ReturnSig::Future(TypeSig::of::<O>()),
        )
    }

    /// A property read, resolved to its synthesized getter.
    pub fn getter<O: Send + 'static>(&mut self, name: &'static str) -> &mut MethodMetadata {
        self.push::<()>(
            name,
            MethodKind::PropertyGetter,
            BindingFlags::PUBLIC | BindingFlags::INSTANCE,
            ReturnSig::Value(TypeSig::of::<O>()),
        )
    }

    /// A generic member with `arity` type parameters. The signature is closed
    /// per instantiation by the setup that targets it.
    pub fn generic_static_method(&mut self, name: &'static str, arity: usize) -> &mut MethodMetadata {
        self.entries.push(MethodMetadata {
            name,
            kind: MethodKind::Static,
            flags: BindingFlags::PUBLIC | BindingFlags::STATIC,
            sig: SigTemplate::Generic { arity },
            shape: MethodShape::Redirectable,
        });
        self.entries.last_mut().unwrap()
    }

    fn push<I: ArgTuple>(
        &mut self,
        name: &'static str,
        kind: MethodKind,
        flags: BindingFlags,
        ret: ReturnSig,
    ) -> &mut MethodMetadata {
        self.entries.push(MethodMetadata {
            name,
            kind,
            flags,
            sig: SigTemplate::Closed {
                args: TypeId::of::<I>(),
                params: I::type_sigs(),
                ret,
            },
            shape: MethodShape::Redirectable,
        });
        self.entries.last_mut().unwrap()
    }
}

pub(crate) fn reflect_type<T: Redirectable>() -> TypeMethods {
    let mut methods = TypeMethods::new(TypeSig::of::<T>());
    T::reflect(&mut methods);
    methods
}
