use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Sender};
use std::thread::JoinHandle;

use crate::error::{Result, SchematicError};
use crate::world::WorldMutation;

/// A unit of work that runs on the world-owning context.
pub type WorldJob = Box<dyn FnOnce(&mut dyn WorldMutation) + Send + 'static>;

/// The context that is allowed to mutate the world.
///
/// Jobs run one at a time in submission order. Jobs from other sources may
/// run in between.
pub trait WorldExecutor: Send + Sync {
    fn execute(&self, job: WorldJob) -> Result<()>;
}

enum WorldMessage<W> {
    Run(Box<dyn FnOnce(&mut W) + Send + 'static>),
    Shutdown,
}

/// Dedicated thread that owns a world and drains a FIFO job queue.
///
/// A job that panics is dropped and the thread moves on to the next one.
pub struct WorldThread<W> {
    sender: Sender<WorldMessage<W>>,
    handle: Option<JoinHandle<W>>,
}

impl<W> WorldThread<W>
where
    W: WorldMutation + Send + 'static,
{
    pub fn spawn(mut world: W) -> Result<Self> {
        let (sender, receiver) = channel::<WorldMessage<W>>();
        let handle = std::thread::Builder::new()
            .name("world".to_string())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    match message {
                        WorldMessage::Run(job) => {
                            let world = &mut world;
                            if panic::catch_unwind(AssertUnwindSafe(move || job(world))).is_err() {
                                tracing::error!("world job panicked, continuing with the next one");
                            }
                        }
                        WorldMessage::Shutdown => break,
                    }
                }
                tracing::debug!("world thread stopped");
                world
            })?;
        Ok(Self {
            sender,
            handle: Some(handle),
        })
    }

    /// Queue a job with typed access to the world.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce(&mut W) + Send + 'static,
    {
        self.sender
            .send(WorldMessage::Run(Box::new(job)))
            .map_err(|_| SchematicError::EngineStopped)
    }

    /// Run `f` on the world thread and block until it returns.
    pub fn run<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut W) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = channel();
        self.submit(move |world| {
            let _ = tx.send(f(world));
        })?;
        rx.recv().map_err(|_| SchematicError::EngineStopped)
    }

    /// Stop after the jobs already queued and hand the world back.
    pub fn shutdown(mut self) -> Result<W> {
        let _ = self.sender.send(WorldMessage::Shutdown);
        let handle = self.handle.take().ok_or(SchematicError::EngineStopped)?;
        handle.join().map_err(|_| SchematicError::EngineStopped)
    }
}

impl<W> WorldExecutor for WorldThread<W>
where
    W: WorldMutation + Send + 'static,
{
    fn execute(&self, job: WorldJob) -> Result<()> {
        self.submit(move |world: &mut W| job(world))
    }
}

impl<W> Drop for WorldThread<W> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.sender.send(WorldMessage::Shutdown);
            let _ = handle.join();
        }
    }
}
