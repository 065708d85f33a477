//! Work queue between the directory scanner and the extraction worker.
//!
//! Single producer, single consumer over `std::sync::mpsc`. The scanner sends
//! image paths in order; the worker receives and processes them.

use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};

/// One photo waiting for extraction.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub image_path: PathBuf,
    /// Position in the batch (1-based)
    pub index: u32,
    pub queued_at: DateTime<Local>,
}

impl WorkItem {
    pub fn new(image_path: PathBuf, index: u32) -> Self {
        Self {
            image_path,
            index,
            queued_at: Local::now(),
        }
    }
}

/// Creates an unbounded work queue. Items pile up if extraction is slower
/// than scanning.
pub fn create_work_queue() -> (Sender<WorkItem>, Receiver<WorkItem>) {
    channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_arrive_in_order() {
        let (sender, receiver) = create_work_queue();

        for i in 1..=5 {
            let item = WorkItem::new(PathBuf::from(format!("photo_{}.jpg", i)), i);
            sender.send(item).expect("Failed to send");
        }

        for i in 1..=5 {
            let received = receiver.recv().expect("Failed to receive");
            assert_eq!(received.index, i);
            assert_eq!(received.image_path, PathBuf::from(format!("photo_{}.jpg", i)));
        }
    }

    #[test]
    fn test_channel_closes_when_sender_dropped() {
        let (sender, receiver) = create_work_queue();
        sender.send(WorkItem::new(PathBuf::from("a.png"), 1)).unwrap();
        drop(sender);

        assert!(receiver.recv().is_ok());
        assert!(receiver.recv().is_err());
    }
}
