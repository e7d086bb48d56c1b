use thiserror::Error;

pub type Result<T> = std::result::Result<T, SetupError>;

/// The target of a setup could not be identified.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no member `{name}` matches the given binding flags on `{owner}`")]
    MemberNotFound { owner: &'static str, name: String },

    #[error("`{owner}::{name}` has {count} candidate overloads; supply parameter types to disambiguate")]
    AmbiguousOverload {
        owner: &'static str,
        name: String,
        count: usize,
    },

    #[error("unsupported expression shape ({0}); the body must be a direct call or property read")]
    UnsupportedExpressionShape(String),

    #[error("`{owner}` has no parameterless constructor; supply a receiver instance")]
    MissingInstance { owner: &'static str },
}

/// The replacement spec is incompatible with the resolved signature.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("`{name}` takes {expected} parameters but the replacement takes {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("parameter {index} of `{name}` is `{expected}` but the replacement takes `{found}`")]
    Parameter {
        name: String,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{name}` returns `{expected}` but the replacement produces `{found}`")]
    Return {
        name: String,
        expected: String,
        found: String,
    },

    #[error("`{name}` takes {expected} generic parameters but {found} were supplied")]
    GenericArity {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// Everything a `Setup` call can fail with, surfaced synchronously before any
/// redirection is installed.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("void/value mismatch on `{name}`: {detail}")]
    VoidReturnMismatch { name: String, detail: &'static str },

    #[error("default setup is only supported for void methods; `{name}` is a property getter")]
    PropertyNotSupported { name: String },

    #[error("`{name}` cannot be redirected: {reason}")]
    UnsupportedMethodShape { name: String, reason: &'static str },

    #[error("`{type_name}` has no constructor matching the given arguments: {reason}")]
    ExceptionConstruction {
        type_name: &'static str,
        reason: String,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolution_errors_convert_into_setup_errors() {
        let err: SetupError = ResolutionError::MemberNotFound {
            owner: "Calculator",
            name: "missing".into(),
        }
        .into();
        assert!(matches!(err, SetupError::Resolution(_)));
    }

    #[test]
    fn messages_name_the_member() {
        let err = SignatureError::Arity {
            name: "Calculator::add".into(),
            expected: 2,
            found: 3,
        };
        assert_eq!(
            err.to_string(),
            "`Calculator::add` takes 2 parameters but the replacement takes 3"
        );
    }

    #[test]
    fn property_message_states_the_rule() {
        let err = SetupError::PropertyNotSupported {
            name: "Cat::get_name".into(),
        };
        assert!(err.to_string().contains("only supported for void methods"));
    }
}
