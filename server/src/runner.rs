use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::{debug, info};
use tokio::{
    sync::mpsc::{self, UnboundedReceiver},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::{Events, Server};

/// Owns the task driving a [`Server`]'s simulation loop. The loop is aborted
/// when the handle is dropped
pub struct ServerHandle {
    server: Arc<Mutex<Server>>,
    events: UnboundedReceiver<Events>,
    task: Option<JoinHandle<()>>,
}

/// Moves `server` onto a tokio task that updates it once per tick interval
pub fn spawn_loop(server: Server) -> ServerHandle {
    let tick_interval = server.tick_interval();
    let server = Arc::new(Mutex::new(server));
    let (sender, events) = mpsc::unbounded_channel();

    let shared = server.clone();
    let task = tokio::spawn(async move {
        let mut interval = time::interval(tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();
        loop {
            interval.tick().await;
            let now = Instant::now();
            let elapsed: Duration = now - last;
            last = now;

            // never held across the await above
            let (batch, closed) = {
                let mut server = lock(&shared);
                server.update(elapsed);
                (server.take_events(), server.is_closed())
            };
            if !batch.is_empty() && sender.send(batch).is_err() {
                debug!("server events receiver dropped");
            }
            if closed {
                info!("server loop stopped, session closed");
                break;
            }
        }
    });

    ServerHandle {
        server,
        events,
        task: Some(task),
    }
}

fn lock(server: &Arc<Mutex<Server>>) -> MutexGuard<'_, Server> {
    server.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ServerHandle {
    /// Locks the server for commands between ticks. Do not hold the guard
    /// across an await point
    pub fn lock(&self) -> MutexGuard<'_, Server> {
        lock(&self.server)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Server) -> R) -> R {
        f(&mut self.lock())
    }

    /// Returns every batch of events the loop produced since the last call,
    /// merged in order
    pub fn events(&mut self) -> Events {
        let mut merged = Events::default();
        while let Ok(batch) = self.events.try_recv() {
            merged.append(batch);
        }
        merged
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Closes the session, telling peers why, and stops the loop
    pub fn shutdown(mut self, reason: impl Into<String>) {
        self.lock().close(reason);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
