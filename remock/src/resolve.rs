use std::any::{Any, TypeId};

use crate::error::{ResolutionError, SetupError, SignatureError};
use crate::identity::{BindingFlags, MethodIdentity, MethodKind, ReturnSig, TypeSig};
use crate::reflect::{
    reflect_type, ArgTuple, MethodMetadata, Redirectable, SigTemplate, TypeMethods,
};

/// Which member category a descriptor names.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum MemberTarget {
    Method,
    Property,
}

#[derive(Clone, Copy)]
struct ClosedSig {
    args: TypeId,
    ret: ReturnSig,
}

/// The (type, name, binding flags, generic args, parameter types, receiver)
/// form of naming a redirection target.
pub struct Descriptor {
    catalog: fn() -> TypeMethods,
    name: String,
    flags: BindingFlags,
    member: MemberTarget,
    param_types: Option<Vec<TypeSig>>,
    generics: Option<Vec<TypeSig>>,
    generic_params: Option<Vec<TypeSig>>,
    closed: Option<ClosedSig>,
    receiver: Option<Box<dyn Any + Send>>,
}

impl Descriptor {
    fn new<T: Redirectable>(name: impl Into<String>, member: MemberTarget) -> Self {
        Self {
            catalog: reflect_type::<T>,
            name: name.into(),
            flags: BindingFlags::default(),
            member,
            param_types: None,
            generics: None,
            generic_params: None,
            closed: None,
            receiver: None,
        }
    }

    /// Names a method on `T` by member name, with the default binding flags.
    pub fn method<T: Redirectable>(name: impl Into<String>) -> Self {
        Self::new::<T>(name, MemberTarget::Method)
    }

    /// Names a property on `T`; resolution targets its synthesized getter.
    pub fn property<T: Redirectable>(name: impl Into<String>) -> Self {
        Self::new::<T>(name, MemberTarget::Property)
    }

    pub fn with_flags(mut self, flags: BindingFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Explicit parameter types, required to disambiguate overloads.
    pub fn with_param_types(mut self, params: Vec<TypeSig>) -> Self {
        self.param_types = Some(params);
        self
    }

    /// Closes a generic member with concrete type arguments; `I`/`O` are the
    /// argument tuple and return type of the closed instantiation.
    pub fn with_generics<I: ArgTuple, O: Send + 'static>(mut self, generics: Vec<TypeSig>) -> Self {
        self.generics = Some(generics);
        self.generic_params = Some(I::type_sigs());
        self.closed = Some(ClosedSig {
            args: TypeId::of::<I>(),
            ret: ReturnSig::Value(TypeSig::of::<O>()),
        });
        self
    }

    /// Supplies the receiver instance required for instance members of owners
    /// without a parameterless constructor.
    pub fn with_instance<R: Send + 'static>(mut self, receiver: R) -> Self {
        self.receiver = Some(Box::new(receiver));
        self
    }
}

/// The parsed body shape handed over by the expression layer. Anything that
/// is not a direct call or a property read is rejected at resolution.
pub enum TargetExpr {
    Call(Descriptor),
    PropertyGet(Descriptor),
    /// A body the expression layer could not reduce to a single member
    /// access, described for the error message (e.g. "block", "arithmetic").
    Opaque(String),
}

/// Resolves a descriptor against the owner's declared member catalog.
pub fn resolve(descriptor: &Descriptor) -> Result<MethodIdentity, SetupError> {
    let methods = (descriptor.catalog)();
    let owner = methods.owner();

    let wants_property = descriptor.member == MemberTarget::Property;
    let mut candidates: Vec<&MethodMetadata> = methods
        .entries()
        .iter()
        .filter(|meta| meta.name == descriptor.name)
        .filter(|meta| (meta.kind == MethodKind::PropertyGetter) == wants_property)
        .filter(|meta| descriptor.flags.contains(meta.flags))
        .collect();

    if candidates.is_empty() {
        return Err(ResolutionError::MemberNotFound {
            owner: owner.name,
            name: descriptor.name.clone(),
        }
        .into());
    }

    if let Some(param_types) = &descriptor.param_types {
        candidates.retain(|meta| match &meta.sig {
            SigTemplate::Closed { params, .. } => params == param_types,
            SigTemplate::Generic { .. } => true,
        });
        if candidates.is_empty() {
            return Err(ResolutionError::MemberNotFound {
                owner: owner.name,
                name: descriptor.name.clone(),
            }
            .into());
        }
    }

    if candidates.len() > 1 {
        return Err(ResolutionError::AmbiguousOverload {
            owner: owner.name,
            name: descriptor.name.clone(),
            count: candidates.len(),
        }
        .into());
    }

    let meta = candidates[0];

    // Getters are instance members too: anything non-static needs a receiver
    // when the owner has no parameterless constructor.
    if meta.kind != MethodKind::Static
        && !methods.is_default_constructible()
        && descriptor.receiver.is_none()
    {
        return Err(ResolutionError::MissingInstance {
            owner: owner.name,
        }
        .into());
    }

    let name = meta.name;
    let display = format!("{}::{}", owner.name, name);
    match &meta.sig {
        SigTemplate::Closed { args, params, ret } => {
            if descriptor.generics.as_ref().is_some_and(|g| !g.is_empty()) {
                return Err(SignatureError::GenericArity {
                    name: display,
                    expected: 0,
                    found: descriptor.generics.as_ref().unwrap().len(),
                }
                .into());
            }
            Ok(MethodIdentity::new(
                owner,
                name,
                *args,
                meta.kind,
                meta.flags,
                params.clone(),
                Vec::new(),
                *ret,
                meta.shape,
            ))
        }
        SigTemplate::Generic { arity } => {
            let Some(generics) = descriptor.generics.clone() else {
                return Err(SignatureError::GenericArity {
                    name: display,
                    expected: *arity,
                    found: 0,
                }
                .into());
            };
            if generics.len() != *arity {
                return Err(SignatureError::GenericArity {
                    name: display,
                    expected: *arity,
                    found: generics.len(),
                }
                .into());
            }
            let closed = descriptor
                .closed
                .expect("with_generics always records the closed signature");
            Ok(MethodIdentity::new(
                owner,
                name,
                closed.args,
                meta.kind,
                meta.flags,
                descriptor.generic_params.clone().unwrap_or_default(),
                generics,
                closed.ret,
                meta.shape,
            ))
        }
    }
}

/// Resolves the expression form: the body must be a direct call or property
/// read, anything else fails with `UnsupportedExpressionShape`.
pub fn resolve_expr(expr: TargetExpr) -> Result<MethodIdentity, SetupError> {
    match expr {
        TargetExpr::Call(descriptor) => resolve(&descriptor),
        TargetExpr::PropertyGet(mut descriptor) => {
            descriptor.member = MemberTarget::Property;
            resolve(&descriptor)
        }
        TargetExpr::Opaque(shape) => {
            Err(ResolutionError::UnsupportedExpressionShape(shape).into())
        }
    }
}
