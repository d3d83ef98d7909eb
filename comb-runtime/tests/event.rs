// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_runtime::event::Bus;

struct Foo;
struct Bar(usize);

#[test]
fn basic() {
    use std::sync::atomic::{AtomicBool, Ordering};

    let bus = Bus::default();

    let received = AtomicBool::new(false);

    bus.add_listener::<_, _>(|_: &Foo| received.store(true, Ordering::SeqCst));

    bus.dispatch(Foo);

    drop(bus);

    assert!(received.load(Ordering::SeqCst));
}

#[test]
fn dispatch_is_typed() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let bus = Bus::default();

    let sum = AtomicUsize::new(0);

    bus.add_listener::<_, _>(|bar: &Bar| {
        sum.fetch_add(bar.0, Ordering::SeqCst);
    });

    bus.dispatch(Foo);
    bus.dispatch(Bar(3));
    bus.dispatch(Bar(4));

    drop(bus);

    assert_eq!(sum.load(Ordering::SeqCst), 7);
}

#[test]
fn multiple_listeners() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let bus = Bus::default();

    let count = AtomicUsize::new(0);

    bus.add_listener::<_, _>(|_: &Foo| {
        count.fetch_add(1, Ordering::SeqCst);
    });
    bus.add_listener::<_, _>(|_: &Foo| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    bus.dispatch(Foo);

    drop(bus);

    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn send_sync() {
    fn helper<T: Send + Sync>() {}
    helper::<Bus<'static>>();
}
