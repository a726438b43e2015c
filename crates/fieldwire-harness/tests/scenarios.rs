#![forbid(unsafe_code)]

//! End-to-end scenarios: registration order, live updates, delegation,
//! validation, chaining, unmount.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{init_tracing, label, label_of, path};
use fieldwire_core::{FieldProps, Topic};
use fieldwire_harness::FormFixture;
use fieldwire_runtime::{
    DelegatedValidation, EngineConfig, FieldUpdate, FormHandle, ReactiveField, ReactiveProp,
    ResolveError, Resolved, Resolver,
};
use futures::channel::oneshot;
use serde_json::json;

#[test]
fn target_registered_before_subscriber() {
    init_tracing();
    let mut fx = FormFixture::new();
    fx.register(FieldProps::new(["a"]).with("value", "x"));

    let (resolver, calls) = label_of(&["a", "value"]);
    let field = ReactiveField::new(FieldProps::new(["b"])).with_reactive("label", resolver);
    let bindings = fx.mount(&field);
    fx.settle();

    assert_eq!(
        fx.form().updates(),
        [FieldUpdate::single(path(&["b"]), "label", json!("label:x"))]
    );
    assert_eq!(calls.get(), 1);

    let observers: Vec<_> = bindings.observers().collect();
    assert_eq!(observers.len(), 1);
    assert_eq!(observers[0].target(), &path(&["a"]));
    assert_eq!(observers[0].tracked_props(), ["value"]);
    assert!(observers[0].is_active());
    assert_eq!(bindings.pending_count(), 0);
}

#[test]
fn live_update_after_target_changes() {
    let mut fx = FormFixture::new();
    fx.register(FieldProps::new(["a"]).with("value", "x"));
    let (resolver, calls) = label_of(&["a", "value"]);
    let _bindings = fx.mount(&ReactiveField::new(FieldProps::new(["b"])).with_reactive("label", resolver));
    fx.settle();

    fx.set(&path(&["a"]), "value", "y");
    fx.settle();

    assert_eq!(fx.prop(&path(&["b"]), "label"), Some(json!("label:y")));
    assert_eq!(calls.get(), 2);
    // Default policy validates after a live change.
    let validations = fx.form().validations();
    assert_eq!(validations.len(), 1);
    assert_eq!(validations[0].field_path, path(&["b"]));
    assert!(validations[0].force);
    assert!(validations[0].force_props);
    assert_eq!(
        validations[0].field_props.get("label"),
        Some(&json!("label:y"))
    );
}

#[test]
fn target_registered_after_subscriber() {
    init_tracing();
    let mut fx = FormFixture::new();
    let (resolver, calls) = label_of(&["a", "value"]);
    let bindings = fx.mount(&ReactiveField::new(FieldProps::new(["b"])).with_reactive("label", resolver));
    fx.settle();

    assert_eq!(fx.form().updates_of(&path(&["b"]), "label"), [json!("label:<none>")]);
    assert_eq!(bindings.pending_count(), 1);
    assert_eq!(bindings.observers().count(), 0);
    assert_eq!(
        fx.form().events().listener_count(&Topic::Registered(path(&["a"]))),
        1
    );
    assert_eq!(Topic::Registered(path(&["a"])).event_name(), "aRegistered");

    fx.register(FieldProps::new(["a"]).with("value", "x"));
    fx.settle();

    assert_eq!(
        fx.form().updates_of(&path(&["b"]), "label"),
        [json!("label:<none>"), json!("label:x")]
    );
    // Re-analysis plus the delivered recomputation.
    assert_eq!(calls.get(), 3);
    // Subscriber value is empty: no validation.
    assert!(fx.form().validations().is_empty());

    let delegated: Vec<_> = bindings.delegated().collect();
    assert!(!delegated[0].is_pending());
    assert!(delegated[0].is_promoted());
    assert!(delegated[0].is_observing());
    assert_eq!(delegated[0].tracked_props(), Some(vec!["value".to_string()]));
    assert_eq!(
        fx.form().events().listener_count(&Topic::Registered(path(&["a"]))),
        0
    );
}

#[test]
fn delegated_promotion_validates_filled_subscriber() {
    let mut fx = FormFixture::new();
    let (resolver, _) = label_of(&["a", "value"]);
    let field = ReactiveField::new(FieldProps::new(["b"]).with("value", "typed"))
        .with_reactive("label", resolver);
    let _bindings = fx.mount(&field);
    fx.settle();

    fx.register(FieldProps::new(["a"]).with("value", "x"));
    fx.settle();

    let validations = fx.form().validations();
    assert_eq!(validations.len(), 1);
    assert_eq!(validations[0].field_path, path(&["b"]));
}

#[test]
fn delegated_promotion_reads_subscriber_value_at_registration() {
    let mut fx = FormFixture::new();
    let (resolver, _) = label_of(&["a", "value"]);
    let _bindings =
        fx.mount(&ReactiveField::new(FieldProps::new(["b"]).with("value", "")).with_reactive("label", resolver));
    fx.settle();

    // Filled after mount, before the target appears.
    fx.set(&path(&["b"]), "value", "typed");
    fx.register(FieldProps::new(["a"]).with("value", "x"));
    fx.settle();

    assert_eq!(fx.form().validations().len(), 1);
}

#[test]
fn delegated_validation_policy_is_configurable() {
    for (policy, filled, expected) in [
        (DelegatedValidation::Always, false, 1),
        (DelegatedValidation::Never, true, 0),
        (DelegatedValidation::WhenSubscriberHasValue, true, 1),
        (DelegatedValidation::WhenSubscriberHasValue, false, 0),
    ] {
        let mut fx = FormFixture::with_config(EngineConfig::default().with_delegated_validation(policy));
        let (resolver, _) = label_of(&["a", "value"]);
        let mut props = FieldProps::new(["b"]);
        if filled {
            props = props.with("value", "typed");
        }
        let _bindings = fx.mount(&ReactiveField::new(props).with_reactive("label", resolver));
        fx.register(FieldProps::new(["a"]).with("value", "x"));
        fx.settle();

        assert_eq!(
            fx.form().validations().len(),
            expected,
            "policy {policy:?}, filled {filled}"
        );
    }
}

#[test]
fn change_event_can_suppress_validation() {
    let mut fx = FormFixture::new();
    fx.register(FieldProps::new(["a"]).with("value", "x"));
    let (resolver, _) = label_of(&["a", "value"]);
    let _bindings = fx.mount(&ReactiveField::new(FieldProps::new(["b"])).with_reactive("label", resolver));
    fx.settle();

    let mut patch = serde_json::Map::new();
    patch.insert("value".into(), json!("y"));
    fx.form().change(&path(&["a"]), patch, Some(false)).unwrap();
    fx.settle();

    assert_eq!(fx.prop(&path(&["b"]), "label"), Some(json!("label:y")));
    assert!(fx.form().validations().is_empty());
}

#[test]
fn validate_on_change_can_be_disabled() {
    let mut fx = FormFixture::with_config(EngineConfig::default().with_validate_on_change(false));
    fx.register(FieldProps::new(["a"]).with("value", "x"));
    let (resolver, _) = label_of(&["a", "value"]);
    let _bindings = fx.mount(&ReactiveField::new(FieldProps::new(["b"])).with_reactive("label", resolver));
    fx.settle();

    fx.set(&path(&["a"]), "value", "y");
    fx.settle();

    assert_eq!(fx.prop(&path(&["b"]), "label"), Some(json!("label:y")));
    assert!(fx.form().validations().is_empty());
}

#[test]
fn multi_segment_paths() {
    let mut fx = FormFixture::new();
    fx.register(FieldProps::new(["billing", "address"]).with("value", "Main St"));
    let (resolver, _) = label_of(&["billing", "address", "value"]);
    let bindings = fx.mount(&ReactiveField::new(FieldProps::new(["shipping"])).with_reactive("hint", resolver));
    fx.settle();

    assert_eq!(fx.prop(&path(&["shipping"]), "hint"), Some(json!("label:Main St")));
    assert_eq!(
        bindings.observers().next().map(|o| o.target().clone()),
        Some(path(&["billing", "address"]))
    );
}

#[test]
fn static_reactive_prop_is_pushed_once() {
    let mut fx = FormFixture::new();
    let field = ReactiveField::new(FieldProps::new(["b"]))
        .with_reactive("disabled", ReactiveProp::Static(json!(true)));
    let bindings = fx.mount(&field);
    fx.settle();

    assert!(bindings.is_empty());
    assert_eq!(fx.prop(&path(&["b"]), "disabled"), Some(json!(true)));
    assert_eq!(fx.form().updates().len(), 1);
}

#[test]
fn deferred_resolver_result_is_awaited() {
    let mut fx = FormFixture::new();
    fx.register(FieldProps::new(["a"]).with("value", "x"));

    let pending: Rc<std::cell::RefCell<Vec<oneshot::Sender<String>>>> = Rc::default();
    let senders = Rc::clone(&pending);
    let resolver = Resolver::new(move |args| {
        let seen = args.get(&["a", "value"]);
        let (tx, rx) = oneshot::channel::<String>();
        senders.borrow_mut().push(tx);
        Ok(Resolved::deferred(async move {
            let suffix = rx.await.map_err(|_| ResolveError::new("cancelled"))?;
            Ok::<_, ResolveError>(json!(format!(
                "{}{suffix}",
                label(seen).as_str().unwrap_or_default()
            )))
        }))
    });
    let _bindings = fx.mount(&ReactiveField::new(FieldProps::new(["b"])).with_reactive("label", resolver));
    fx.settle();
    assert!(fx.form().updates().is_empty());

    let tx = pending.borrow_mut().remove(0);
    tx.send("!".into()).unwrap();
    fx.settle();

    assert_eq!(fx.prop(&path(&["b"]), "label"), Some(json!("label:x!")));
}

#[test]
fn resolver_sees_subscriber_props_and_form_context() {
    let form = fieldwire_harness::MemoryForm::with_context(json!({ "currency": "EUR" }));
    let mut fx = FormFixture::with_form(form, EngineConfig::default());
    fx.register(FieldProps::new(["amount"]).with("value", 12));

    let resolver = Resolver::from_fn(|args| {
        let amount = args.get(&["amount", "value"]).unwrap_or_default();
        let currency = args.form.get("currency").cloned().unwrap_or_default();
        json!(format!(
            "{} {} {}",
            args.field_props.field_path(),
            amount,
            currency.as_str().unwrap_or_default()
        ))
    });
    let _bindings =
        fx.mount(&ReactiveField::new(FieldProps::new(["total"])).with_reactive("caption", resolver));
    fx.settle();

    assert_eq!(fx.prop(&path(&["total"]), "caption"), Some(json!("total 12 EUR")));
}

#[test]
fn chained_reactive_props_propagate() {
    let mut fx = FormFixture::new();
    fx.register(FieldProps::new(["a"]).with("value", "x"));

    let (b_label, _) = label_of(&["a", "value"]);
    let _b = fx.mount(&ReactiveField::new(FieldProps::new(["b"])).with_reactive("label", b_label));
    let c_hint = Resolver::from_fn(|args| {
        let upstream = args.get(&["b", "label"]).unwrap_or_default();
        json!(format!("hint<{}>", upstream.as_str().unwrap_or_default()))
    });
    // `b.label` is not declared until its first push lands.
    fx.settle();
    let _c = fx.mount(&ReactiveField::new(FieldProps::new(["c"])).with_reactive("hint", c_hint));
    fx.settle();
    assert_eq!(fx.prop(&path(&["c"]), "hint"), Some(json!("hint<label:x>")));

    fx.set(&path(&["a"]), "value", "y");
    fx.settle();

    assert_eq!(fx.prop(&path(&["b"]), "label"), Some(json!("label:y")));
    assert_eq!(fx.prop(&path(&["c"]), "hint"), Some(json!("hint<label:y>")));
}

#[test]
fn unmount_stops_updates() {
    let mut fx = FormFixture::new();
    fx.register(FieldProps::new(["a"]).with("value", "x"));
    let (resolver, calls) = label_of(&["a", "value"]);
    let bindings = fx.mount(&ReactiveField::new(FieldProps::new(["b"])).with_reactive("label", resolver));
    fx.settle();

    drop(bindings);
    assert_eq!(fx.form().events().total_listeners(), 0);

    fx.set(&path(&["a"]), "value", "y");
    fx.settle();
    assert_eq!(calls.get(), 1);
    assert_eq!(fx.prop(&path(&["b"]), "label"), Some(json!("label:x")));
}

#[test]
fn unmount_before_target_registers_disarms_delegation() {
    let mut fx = FormFixture::new();
    let (resolver, calls) = label_of(&["a", "value"]);
    let bindings = fx.mount(&ReactiveField::new(FieldProps::new(["b"])).with_reactive("label", resolver));
    fx.settle();
    bindings.teardown();

    assert_eq!(fx.register(FieldProps::new(["a"]).with("value", "x")), 0);
    fx.settle();
    assert_eq!(calls.get(), 1);
}

#[test]
fn several_subscribers_share_one_target() {
    let mut fx = FormFixture::new();
    fx.register(FieldProps::new(["a"]).with("value", "x"));
    let hits = Rc::new(Cell::new(0));

    let mut all = Vec::new();
    for name in ["b", "c", "d"] {
        let hits = Rc::clone(&hits);
        let resolver = Resolver::from_fn(move |args| {
            hits.set(hits.get() + 1);
            label(args.get(&["a", "value"]))
        });
        all.push(fx.mount(&ReactiveField::new(FieldProps::new([name])).with_reactive("label", resolver)));
    }
    fx.settle();
    hits.set(0);

    fx.set(&path(&["a"]), "value", "z");
    fx.settle();

    assert_eq!(hits.get(), 3);
    for name in ["b", "c", "d"] {
        assert_eq!(fx.prop(&path(&[name]), "label"), Some(json!("label:z")));
    }
}

#[test]
fn nested_read_updates_live() {
    let mut fx = FormFixture::new();
    fx.register(FieldProps::new(["address"]).with("value", json!({ "street": "Main" })));
    let (resolver, calls) = label_of(&["address", "value", "street"]);
    let bindings = fx.mount(&ReactiveField::new(FieldProps::new(["b"])).with_reactive("hint", resolver));
    fx.settle();

    assert_eq!(fx.prop(&path(&["b"]), "hint"), Some(json!("label:Main")));
    assert_eq!(bindings.pending_count(), 0);
    let observer = bindings.observers().next().unwrap();
    assert_eq!(observer.target(), &path(&["address"]));
    assert_eq!(observer.tracked_props(), ["value"]);

    fx.set(&path(&["address"]), "value", json!({ "street": "Elm" }));
    fx.settle();

    assert_eq!(calls.get(), 2);
    assert_eq!(fx.prop(&path(&["b"]), "hint"), Some(json!("label:Elm")));
}

#[test]
fn dotted_and_nested_paths_are_observed_separately() {
    let mut fx = FormFixture::new();
    fx.register(FieldProps::new(["a.b"]).with("value", 1));
    fx.register(FieldProps::new(["a", "b"]).with("value", 2));
    let resolver = Resolver::from_fn(|args| {
        json!([args.get(&["a.b", "value"]), args.get(&["a", "b", "value"])])
    });
    let bindings = fx.mount(&ReactiveField::new(FieldProps::new(["c"])).with_reactive("pair", resolver));
    fx.settle();
    assert_eq!(bindings.observers().count(), 2);
    assert_eq!(fx.prop(&path(&["c"]), "pair"), Some(json!([1, 2])));

    fx.set(&path(&["a", "b"]), "value", 3);
    fx.settle();
    assert_eq!(fx.prop(&path(&["c"]), "pair"), Some(json!([1, 3])));

    fx.set(&path(&["a.b"]), "value", 4);
    fx.settle();
    assert_eq!(fx.prop(&path(&["c"]), "pair"), Some(json!([4, 3])));
}

#[test]
fn recompute_sees_owner_props_captured_at_wiring() {
    let mut fx = FormFixture::new();
    fx.register(FieldProps::new(["a"]).with("value", "x"));
    let resolver = Resolver::from_fn(|args| {
        args.get(&["a", "value"]);
        args.field_props.get("placeholder").cloned().unwrap_or_default()
    });
    let field = ReactiveField::new(FieldProps::new(["b"]).with("placeholder", "wired"))
        .with_reactive("echo", resolver);
    let _bindings = fx.mount(&field);
    fx.settle();

    fx.set(&path(&["b"]), "placeholder", "edited");
    fx.set(&path(&["a"]), "value", "y");
    fx.settle();

    assert_eq!(fx.prop(&path(&["b"]), "echo"), Some(json!("wired")));
}
