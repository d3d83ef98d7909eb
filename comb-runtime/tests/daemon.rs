// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use comb_runtime::daemon::Daemon;

#[tokio::test]
async fn shutdown_in_priority_order() {
    let daemon = Daemon::new();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let running = Arc::new(AtomicUsize::new(0));

    // Spawn out of priority order on purpose.
    for (name, priority) in [("solidifier", 2u8), ("intake", 0), ("milestone", 1)] {
        let order = order.clone();
        let running = running.clone();

        daemon.spawn(name, priority, move |mut shutdown| async move {
            running.fetch_add(1, Ordering::SeqCst);
            shutdown.wait().await;
            order.lock().push(name);
        });
    }

    // Give the workers a chance to start.
    while running.load(Ordering::SeqCst) < 3 {
        tokio::task::yield_now().await;
    }

    daemon.shutdown().await;

    assert_eq!(*order.lock(), vec!["intake", "milestone", "solidifier"]);
}

#[tokio::test]
async fn drive_ends_with_the_stream() {
    let daemon = Daemon::new();
    let (tx, rx) = futures::channel::mpsc::unbounded::<usize>();
    let (result_tx, result_rx) = tokio::sync::oneshot::channel();

    daemon.spawn("summer", 0, move |mut shutdown| async move {
        let mut rx = rx;
        let mut acc = 0;

        while let Some(item) = shutdown.drive(&mut rx).await {
            acc += item;
        }

        let _ = result_tx.send(acc);
    });

    for i in 0..=100 {
        tx.unbounded_send(i).unwrap();
    }
    drop(tx);

    assert_eq!(result_rx.await.unwrap(), 5050);

    daemon.shutdown().await;
}

#[tokio::test]
async fn shutdown_interrupts_a_busy_worker() {
    let daemon = Daemon::new();
    let (tx, rx) = futures::channel::mpsc::unbounded::<usize>();
    let processed = Arc::new(AtomicUsize::new(0));

    {
        let processed = processed.clone();
        daemon.spawn("slow", 0, move |mut shutdown| async move {
            let mut rx = rx;

            while shutdown.drive(&mut rx).await.is_some() {
                processed.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });
    }

    // The channel stays open; only the shutdown can end the worker.
    for i in 0..=100 {
        tx.unbounded_send(i).unwrap();
    }

    daemon.shutdown().await;

    assert!(processed.load(Ordering::SeqCst) < 101);
}
