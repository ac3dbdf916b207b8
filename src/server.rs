use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::reactor::{Reactor, WmEvent};

/// Event channel between backend threads and the reactor loop.
pub fn channel() -> (Sender<WmEvent>, Receiver<WmEvent>) { unbounded() }

/// Drains events one at a time until a shutdown arrives or every sender is
/// dropped. All state lives in the reactor; nothing here is shared.
pub fn run(mut reactor: Reactor, events: Receiver<WmEvent>) {
    info!("event loop started");
    for event in events {
        let shutdown = matches!(event, WmEvent::Shutdown);
        reactor.handle_event(event);
        if shutdown {
            break;
        }
    }
    info!("event loop stopped");
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}
