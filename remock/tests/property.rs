use remock::{
    redirect, redirect_getter, Descriptor, Mock, Redirectable, ResolutionError, SetupError,
    TargetExpr, TypeMethods,
};

macro_rules! profile_fixture {
    ($name:ident) => {
        #[derive(Default)]
        struct $name {
            stored: String,
        }

        impl Redirectable for $name {
            fn reflect(methods: &mut TypeMethods) {
                methods.default_constructible();
                methods.getter::<String>("name");
            }
        }

        impl $name {
            fn name(&self) -> String {
                redirect_getter::<$name, String>("name").unwrap_or_else(|| self.stored.clone())
            }
        }
    };
}

#[test]
fn property_getter_can_be_mocked() {
    profile_fixture!(Profile);

    let profile = Profile {
        stored: "real".into(),
    };
    assert_eq!(profile.name(), "real");

    let handle = Mock::setup_property(Descriptor::property::<Profile>("name"))
        .returns("mocked".to_string())
        .unwrap();
    assert_eq!(profile.name(), "mocked");

    drop(handle);
    assert_eq!(profile.name(), "real");
}

#[test]
fn setup_default_on_a_getter_fails_synchronously() {
    profile_fixture!(Profile);

    let err = Mock::setup_default(Descriptor::property::<Profile>("name")).unwrap_err();
    assert!(matches!(err, SetupError::PropertyNotSupported { .. }));
    assert!(err.to_string().contains("only supported for void methods"));

    // Nothing was installed.
    let profile = Profile {
        stored: "still real".into(),
    };
    assert_eq!(profile.name(), "still real");
}

#[test]
fn getter_setup_through_the_expression_form() {
    profile_fixture!(Profile);

    let handle = Mock::setup_property(TargetExpr::PropertyGet(Descriptor::property::<Profile>(
        "name",
    )))
    .returns("from expr".to_string())
    .unwrap();

    let profile = Profile::default();
    assert_eq!(profile.name(), "from expr");
    drop(handle);
    assert_eq!(profile.name(), "");
}

#[test]
fn getter_on_an_owner_without_a_parameterless_ctor_needs_a_receiver() {
    struct Ledger {
        stored: i32,
    }

    impl Redirectable for Ledger {
        fn reflect(methods: &mut TypeMethods) {
            methods.getter::<i32>("total");
        }
    }

    impl Ledger {
        fn total(&self) -> i32 {
            redirect_getter::<Ledger, i32>("total").unwrap_or(self.stored)
        }
    }

    let err = Mock::setup_property(Descriptor::property::<Ledger>("total"))
        .returns(9)
        .unwrap_err();
    assert!(matches!(
        err,
        SetupError::Resolution(ResolutionError::MissingInstance { .. })
    ));

    // Nothing was installed.
    let ledger = Ledger { stored: 4 };
    assert_eq!(ledger.total(), 4);

    let _handle = Mock::setup_property(
        Descriptor::property::<Ledger>("total").with_instance(Ledger { stored: 0 }),
    )
    .returns(9)
    .unwrap();
    assert_eq!(ledger.total(), 9);
}

#[test]
fn getter_and_method_sharing_a_name_are_redirected_independently() {
    #[derive(Default)]
    struct Account;

    impl Redirectable for Account {
        fn reflect(methods: &mut TypeMethods) {
            methods.default_constructible();
            methods.static_method::<(), i32>("balance");
            methods.getter::<i32>("balance");
        }
    }

    impl Account {
        fn balance() -> i32 {
            redirect::<Account, (), i32>("balance", ()).unwrap_or(1)
        }

        fn get_balance(&self) -> i32 {
            redirect_getter::<Account, i32>("balance").unwrap_or(5)
        }
    }

    let account = Account;

    let on_getter = Mock::setup_property(Descriptor::property::<Account>("balance"))
        .returns(7)
        .unwrap();
    assert_eq!(account.get_balance(), 7);
    // The never-mocked static method keeps its original behavior.
    assert_eq!(Account::balance(), 1);

    drop(on_getter);
    assert_eq!(account.get_balance(), 5);

    let on_method = Mock::setup(Descriptor::method::<Account>("balance"))
        .returns(2)
        .unwrap();
    assert_eq!(Account::balance(), 2);
    assert_eq!(account.get_balance(), 5);
    drop(on_method);
    assert_eq!(Account::balance(), 1);
}
