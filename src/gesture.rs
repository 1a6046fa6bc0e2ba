use std::{collections::HashMap, thread};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::{
    presentation::{IndicatorId, Presenter},
    types::GestureEvent,
};

/// Gestures the hand module can fire; each has an indicator surface.
pub const GESTURE_NAMES: [&str; 14] = [
    "click",
    "fist",
    "full_pinch",
    "spreadfingers",
    "swipe_down",
    "swipe_left",
    "swipe_right",
    "swipe_up",
    "tap",
    "thumb_down",
    "thumb_up",
    "two_fingers_pinch_open",
    "v_sign",
    "wave",
];

const GESTURE_QUEUE_DEPTH: usize = 64;

pub fn indicator_ids() -> impl Iterator<Item = IndicatorId> {
    GESTURE_NAMES.iter().map(|name| IndicatorId::for_gesture(name))
}

pub fn is_known_gesture(name: &str) -> bool {
    GESTURE_NAMES.contains(&name)
}

/// Channel carrying gesture events out of the hand module's callback thread.
pub fn gesture_channel() -> (Sender<GestureEvent>, Receiver<GestureEvent>) {
    bounded(GESTURE_QUEUE_DEPTH)
}

/// Forwards a fired gesture without blocking the hand module.
pub fn forward_gesture(tx: &Sender<GestureEvent>, name: &str) {
    match tx.try_send(GestureEvent::new(name)) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            log::debug!("gesture queue full, dropping {}", event.name);
        }
        Err(TrySendError::Disconnected(_)) => {}
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum GestureState {
    #[default]
    NoGesture,
    Named(String),
}

impl GestureState {
    pub fn name(&self) -> Option<&str> {
        match self {
            GestureState::NoGesture => None,
            GestureState::Named(name) => Some(name.as_str()),
        }
    }
}

pub type GestureHandler = Box<dyn FnMut(&GestureEvent) + Send>;

/// Gesture name to command binding; unbound gestures do nothing.
#[derive(Default)]
pub struct GestureHandlers {
    handlers: HashMap<String, GestureHandler>,
}

impl GestureHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: GestureHandler) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn dispatch(&mut self, event: &GestureEvent) {
        if let Some(handler) = self.handlers.get_mut(&event.name) {
            handler(event);
        }
    }
}

/// Tracks the current gesture and keeps exactly one indicator visible.
pub struct GestureDispatcher {
    state: GestureState,
    presenter: Presenter,
    handlers: GestureHandlers,
    transitions: usize,
}

impl GestureDispatcher {
    pub fn new(presenter: Presenter, handlers: GestureHandlers) -> Self {
        Self {
            state: GestureState::NoGesture,
            presenter,
            handlers,
            transitions: 0,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn transitions(&self) -> usize {
        self.transitions
    }

    /// Returns true when the event changed the current gesture.
    pub fn handle(&mut self, event: &GestureEvent) -> bool {
        self.presenter.set_label(event.name.clone());

        let changed = self.state.name() != Some(event.name.as_str());
        if changed {
            for indicator in indicator_ids() {
                self.presenter.set_indicator_visible(indicator, false);
            }
            if is_known_gesture(&event.name) {
                self.presenter
                    .set_indicator_visible(IndicatorId::for_gesture(&event.name), true);
            } else {
                log::warn!("no indicator for gesture {}", event.name);
            }
            log::debug!(
                "gesture changed: {:?} -> {}",
                self.state.name(),
                event.name
            );
            self.state = GestureState::Named(event.name.clone());
            self.transitions += 1;
        }

        self.handlers.dispatch(event);
        changed
    }

    /// Consumes events until every sender is dropped.
    pub fn run(mut self, events: Receiver<GestureEvent>) -> Self {
        while let Ok(event) = events.recv() {
            self.handle(&event);
        }
        log::debug!("gesture dispatcher stopped after {} transitions", self.transitions);
        self
    }
}

pub fn spawn_dispatcher(
    dispatcher: GestureDispatcher,
    events: Receiver<GestureEvent>,
) -> thread::JoinHandle<GestureDispatcher> {
    thread::spawn(move || dispatcher.run(events))
}
