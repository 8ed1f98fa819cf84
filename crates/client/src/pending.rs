use crate::errors::ClientError;
use schema::DetectionResponse;
use tokio::sync::oneshot;

pub(crate) type Reply = Result<DetectionResponse, ClientError>;

/// Holder for the one request allowed in flight.
///
/// Ids let a caller release only its own claim, so a late guard cannot free
/// a slot that a newer request has taken.
#[derive(Debug, Default)]
pub(crate) struct PendingSlot {
    current: Option<(u64, oneshot::Sender<Reply>)>,
    next_id: u64,
}

impl PendingSlot {
    pub fn is_occupied(&self) -> bool {
        self.current.is_some()
    }

    /// `None` when a request is already outstanding.
    pub fn claim(&mut self) -> Option<(u64, oneshot::Receiver<Reply>)> {
        if self.current.is_some() {
            return None;
        }
        self.next_id += 1;
        let (tx, rx) = oneshot::channel();
        self.current = Some((self.next_id, tx));
        Some((self.next_id, rx))
    }

    /// Complete the outstanding request. Returns false when nothing was waiting.
    pub fn resolve(&mut self, reply: Reply) -> bool {
        match self.current.take() {
            Some((_, tx)) => {
                let _ = tx.send(reply);
                true
            }
            None => false,
        }
    }

    pub fn release(&mut self, id: u64) {
        if matches!(self.current, Some((current, _)) if current == id) {
            self.current = None;
        }
    }
}
