// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! A typed publish/subscribe bus for node events.
//!
//! Listeners are registered per event type and must be non-blocking; anything
//! that needs to do real work forwards the event into its own queue.

use std::any::{Any, TypeId};

use dashmap::DashMap;

type Listener<'a> = dyn Fn(&dyn Any) + Send + Sync + 'a;

/// An event bus dispatching events to listeners registered on their type.
#[derive(Default)]
pub struct Bus<'a> {
    listeners: DashMap<TypeId, Vec<Box<Listener<'a>>>>,
}

impl<'a> Bus<'a> {
    /// Dispatches an event to every listener registered for its type.
    pub fn dispatch<E: Any>(&self, event: E) {
        if let Some(listeners) = self.listeners.get(&TypeId::of::<E>()) {
            listeners.iter().for_each(|listener| listener(&event));
        }
    }

    /// Registers a listener for events of type `E`.
    pub fn add_listener<E: Any, F: Fn(&E) + Send + Sync + 'a>(&self, handler: F) {
        self.listeners
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Box::new(move |event| {
                handler(event.downcast_ref().expect("invalid event"))
            }));
    }
}
