use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;

/// A runtime type tag: the `TypeId` used for matching plus a readable name
/// for diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct TypeSig {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeSig {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

impl PartialEq for TypeSig {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeSig {}

impl Hash for TypeSig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

bitflags! {
    /// Visibility and dispatch filters used when resolving a member by name.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct BindingFlags: u8 {
        const PUBLIC = 1;
        const NON_PUBLIC = 1 << 1;
        const STATIC = 1 << 2;
        const INSTANCE = 1 << 3;
    }
}

impl Default for BindingFlags {
    fn default() -> Self {
        BindingFlags::PUBLIC | BindingFlags::STATIC | BindingFlags::INSTANCE
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MethodKind {
    Static,
    Instance,
    /// The synthesized accessor of a property read.
    PropertyGetter,
}

/// Return shape of a redirectable member.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReturnSig {
    Void,
    Value(TypeSig),
    /// A `BoxFuture<T>`-returning member; holds the sig of `T`.
    Future(TypeSig),
}

impl ReturnSig {
    pub fn is_void(&self) -> bool {
        matches!(self, ReturnSig::Void)
    }
}

/// Whether the member can host a redirection at all.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MethodShape {
    Redirectable,
    /// The member cannot be redirected; installs fail with
    /// `UnsupportedMethodShape` carrying the reason.
    NotRedirectable(&'static str),
}

/// The hashable key a redirection stack is registered under. Two setups with
/// an equal key share one stack; anything else is independent.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodKey {
    pub owner: TypeId,
    pub name: &'static str,
    pub kind: MethodKind,
    /// `TypeId` of the argument tuple.
    pub args: TypeId,
    /// Closed generic arguments, one per generic parameter.
    pub generics: Vec<TypeId>,
}

/// Uniquely identifies a redirectable member, together with the signature
/// data the Stub Synthesizer validates against.
#[derive(Clone, Debug)]
pub struct MethodIdentity {
    pub(crate) key: MethodKey,
    pub owner: TypeSig,
    pub name: &'static str,
    pub kind: MethodKind,
    pub flags: BindingFlags,
    pub params: Vec<TypeSig>,
    pub generics: Vec<TypeSig>,
    pub ret: ReturnSig,
    pub shape: MethodShape,
}

impl MethodIdentity {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        owner: TypeSig,
        name: &'static str,
        args: TypeId,
        kind: MethodKind,
        flags: BindingFlags,
        params: Vec<TypeSig>,
        generics: Vec<TypeSig>,
        ret: ReturnSig,
        shape: MethodShape,
    ) -> Self {
        Self {
            key: MethodKey {
                owner: owner.id,
                name,
                kind,
                args,
                generics: generics.iter().map(|sig| sig.id).collect(),
            },
            owner,
            name,
            kind,
            flags,
            params,
            generics,
            ret,
            shape,
        }
    }

    pub(crate) fn key(&self) -> &MethodKey {
        &self.key
    }

    /// `Owner::name`, with the synthesized accessor prefix for getters.
    pub fn display_name(&self) -> String {
        match self.kind {
            MethodKind::PropertyGetter => format!("{}::get_{}", self.owner.name, self.name),
            _ => format!("{}::{}", self.owner.name, self.name),
        }
    }
}

impl PartialEq for MethodIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for MethodIdentity {}

impl Hash for MethodIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for MethodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}
