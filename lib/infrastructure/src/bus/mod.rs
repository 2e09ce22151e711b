use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

/// Named broadcast channel. Every listener sees every event emitted after it subscribed.
pub struct EventBus<T> {
    name: &'static str,
    tx: broadcast::Sender<T>,
}

pub struct EventListener<T> {
    name: &'static str,
    rx: broadcast::Receiver<T>,
}

#[derive(Clone)]
pub struct EventEmitter<T> {
    name: &'static str,
    tx: broadcast::Sender<T>,
}

impl<T: Clone + std::fmt::Debug> EventBus<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { name, tx }
    }

    pub fn subscribe(&self) -> EventListener<T> {
        EventListener {
            name: self.name,
            rx: self.tx.subscribe(),
        }
    }

    pub fn emitter(&self) -> EventEmitter<T> {
        EventEmitter {
            name: self.name,
            tx: self.tx.clone(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone> EventListener<T> {
    /// Next event, waiting for it if needed. Events lost to lagging are logged and skipped,
    /// `None` means every emitter is gone.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Closed) => {
                    tracing::debug!("Event bus {} closed", self.name);
                    return None;
                }
                Err(RecvError::Lagged(count)) => self.lagged(count),
            }
        }
    }

    /// Next event if one is buffered.
    pub fn try_recv(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(count)) => self.lagged(count),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    fn lagged(&self, count: u64) {
        tracing::warn!("Listener of event bus {} lagged behind, {} events lost", self.name, count);
    }
}

impl<T: Clone + std::fmt::Debug> EventEmitter<T> {
    /// Returns how many listeners the event reached.
    pub fn send(&self, event: T) -> usize {
        match self.tx.send(event) {
            Ok(listeners) => listeners,
            Err(e) => {
                tracing::warn!("Event bus {} has no listener, dropping {:?}", self.name, e.0);
                0
            }
        }
    }

    pub fn subscribe(&self) -> EventListener<T> {
        EventListener {
            name: self.name,
            rx: self.tx.subscribe(),
        }
    }
}
