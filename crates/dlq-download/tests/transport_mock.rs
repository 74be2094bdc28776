//! Exact transport interactions, checked with a `mockall` transport.

mod common;

use std::sync::{Arc, Mutex};

use common::url;
use dlq_download::{
    Destination, DownloadError, DownloadManager, TransferId, TransferListener, TransferRequest,
    TransportPort,
};
use mockall::{Sequence, mock};

mock! {
    pub Transport {}

    impl TransportPort for Transport {
        fn start(
            &self,
            request: TransferRequest,
            listener: Arc<dyn TransferListener>,
        ) -> Result<(), DownloadError>;
        fn pause(&self, id: &TransferId);
        fn resume(&self, id: &TransferId);
        fn cancel(&self, id: &TransferId);
    }
}

fn manager(transport: MockTransport) -> DownloadManager {
    let manager = DownloadManager::new(Arc::new(transport));
    manager.create_queue_with_limit("Q", 1).unwrap();
    manager
}

#[test]
fn test_cancelling_pending_item_never_reaches_transport() {
    let mut transport = MockTransport::new();
    transport
        .expect_start()
        .withf(|request, _| request.url == url("a"))
        .times(1)
        .returning(|_, _| Ok(()));
    transport.expect_cancel().never();
    transport.expect_pause().never();
    transport.expect_resume().never();

    let manager = manager(transport);
    let _a = manager
        .download(url("a"), "Q", (), Destination::Memory)
        .unwrap();
    let b = manager
        .download(url("b"), "Q", (), Destination::Memory)
        .unwrap();

    assert!(manager.cancel(&b.handle));
    assert_eq!(b.completion.blocking_wait(), Err(DownloadError::Cancelled));
}

#[test]
fn test_pause_and_resume_target_the_started_transfer() {
    let started: Arc<Mutex<Option<TransferId>>> = Arc::default();
    let mut seq = Sequence::new();
    let mut transport = MockTransport::new();

    let record = Arc::clone(&started);
    transport
        .expect_start()
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |request, _| {
            *record.lock().unwrap() = Some(request.id);
            Ok(())
        });
    let expected = Arc::clone(&started);
    transport
        .expect_pause()
        .withf(move |id| expected.lock().unwrap().as_ref() == Some(id))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    let expected = Arc::clone(&started);
    transport
        .expect_resume()
        .withf(move |id| expected.lock().unwrap().as_ref() == Some(id))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    transport.expect_cancel().times(1).in_sequence(&mut seq).return_const(());

    let manager = manager(transport);
    let a = manager
        .download(url("a"), "Q", (), Destination::File)
        .unwrap();

    assert!(manager.pause(&a.handle));
    assert!(manager.resume(&a.handle));
    assert!(manager.cancel(&a.handle));
}

#[test]
fn test_start_error_fails_the_item() {
    let mut transport = MockTransport::new();
    transport
        .expect_start()
        .times(1)
        .returning(|_, _| Err(DownloadError::network("connection refused")));
    transport.expect_cancel().never();

    let manager = manager(transport);
    let mut a = manager
        .download(url("a"), "Q", (), Destination::Memory)
        .unwrap()
        .completion;

    assert_eq!(
        a.try_result(),
        Some(Err(DownloadError::network("connection refused")))
    );
    assert!(manager.items("Q").unwrap().is_empty());
    assert_eq!(manager.snapshot("Q").unwrap().active_count, 0);
}

#[test]
fn test_start_receives_destination_and_lease() {
    let mut transport = MockTransport::new();
    transport
        .expect_start()
        .withf(|request, _| {
            request.destination == Destination::File
                && request.id.queue() == "Q"
                && request.url == url("report.pdf")
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let manager = manager(transport);
    let ticket = manager
        .download(url("report.pdf"), "Q", (), Destination::File)
        .unwrap();
    assert_eq!(ticket.handle.queue(), "Q");
}
