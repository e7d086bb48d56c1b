use std::fmt;

/// An argument expectation for one value (or one argument tuple).
pub enum Matcher<T> {
    /// Any value.
    Any,
    /// Equal to the value.
    Eq(T),
    /// Satisfies the predicate.
    Predicate(Box<dyn Fn(&T) -> bool + Send + Sync>),
    /// Element-wise tuple composition.
    Composite(Box<dyn CompositeMatcher<T> + Send + Sync>),
}

#[doc(hidden)]
pub trait CompositeMatcher<T> {
    fn matches(&self, input: &T) -> bool;
}

impl<T: PartialEq> Matcher<T> {
    pub fn matches(&self, input: &T) -> bool {
        match self {
            Matcher::Any => true,
            Matcher::Eq(value) => value == input,
            Matcher::Predicate(predicate) => predicate(input),
            Matcher::Composite(composite) => composite.matches(input),
        }
    }
}

impl<T> fmt::Debug for Matcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Any => f.write_str("Any"),
            Matcher::Eq(_) => f.write_str("Eq(..)"),
            Matcher::Predicate(_) => f.write_str("Predicate(..)"),
            Matcher::Composite(_) => f.write_str("Composite(..)"),
        }
    }
}

/// Argument-matcher constructors, in the `It.IsAny`/`It.Is` style.
pub struct It;

impl It {
    pub fn any<T>() -> Matcher<T> {
        Matcher::Any
    }

    pub fn eq<T: PartialEq>(value: T) -> Matcher<T> {
        Matcher::Eq(value)
    }

    pub fn is<T>(predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Matcher<T> {
        Matcher::Predicate(Box::new(predicate))
    }
}

macro_rules! tuple_matcher {
    ($name:ident, $($ty:ident => $idx:tt),+) => {
        struct $name<$($ty),+>(($(Matcher<$ty>,)+));

        impl<$($ty: PartialEq + Send + Sync + 'static),+> CompositeMatcher<($($ty,)+)>
            for $name<$($ty),+>
        {
            fn matches(&self, input: &($($ty,)+)) -> bool {
                $(self.0.$idx.matches(&input.$idx))&&+
            }
        }

        impl<$($ty: PartialEq + Send + Sync + 'static),+> From<($(Matcher<$ty>,)+)>
            for Matcher<($($ty,)+)>
        {
            fn from(matchers: ($(Matcher<$ty>,)+)) -> Self {
                Matcher::Composite(Box::new($name(matchers)))
            }
        }
    };
}

tuple_matcher!(TupleMatcher1, A => 0);
tuple_matcher!(TupleMatcher2, A => 0, B => 1);
tuple_matcher!(TupleMatcher3, A => 0, B => 1, C => 2);
tuple_matcher!(TupleMatcher4, A => 0, B => 1, C => 2, D => 3);
tuple_matcher!(TupleMatcher5, A => 0, B => 1, C => 2, D => 3, E => 4);
tuple_matcher!(TupleMatcher6, A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
