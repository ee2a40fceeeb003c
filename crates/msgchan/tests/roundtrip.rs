use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use msgchan::{Receiver, Sender};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn unique_name(tag: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("msgchan_test_{tag}_{}_{n}", std::process::id())
}

fn read_to_vec(stream: &mut msgchan::ReceiveStream<'_>) -> Result<Vec<u8>, std::io::Error> {
    let mut out = Vec::new();
    stream.read_to_end(&mut out)?;
    Ok(out)
}

#[test]
fn round_trips_a_short_message() {
    let name = unique_name("short");
    let mut sender = Sender::create_or_open(&name).unwrap();
    let mut receiver = Receiver::create_or_open(&name).unwrap();

    let payload = b"Local\\test".to_vec();
    let send_payload = payload.clone();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            sender
                .send_message::<_, std::io::Error>(|stream| {
                    stream.write_all(&send_payload)?;
                    Ok(())
                })
                .unwrap();
        });

        let received = receiver
            .receive_message::<_, std::io::Error>(|stream| read_to_vec(stream))
            .unwrap()
            .expect("message should not be cancelled");

        assert_eq!(received, payload);
    });
}

#[test]
fn preserves_message_boundaries_across_several_messages() {
    let name = unique_name("boundaries");
    let mut sender = Sender::create_or_open(&name).unwrap();
    let mut receiver = Receiver::create_or_open(&name).unwrap();

    let messages: Vec<Vec<u8>> =
        vec![b"first".to_vec(), b"".to_vec(), b"third message, a bit longer".to_vec()];
    let to_send = messages.clone();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for msg in &to_send {
                let msg = msg.clone();
                sender
                    .send_message::<_, std::io::Error>(|stream| {
                        stream.write_all(&msg)?;
                        Ok(())
                    })
                    .unwrap();
            }
        });

        for expected in &messages {
            let received = receiver
                .receive_message::<_, std::io::Error>(|stream| read_to_vec(stream))
                .unwrap()
                .expect("message should not be cancelled");
            assert_eq!(&received, expected);
        }
    });
}

#[test]
fn chunking_is_transparent_to_the_caller() {
    // A message several times the shared window size must round-trip
    // byte-for-byte regardless of how many chunks it takes to cross.
    let name = unique_name("large");
    let mut sender = Sender::create_or_open(&name).unwrap();
    let mut receiver = Receiver::create_or_open(&name).unwrap();

    // Roughly 2.5 pages' worth: large enough to force several chunk
    // hand-offs through a one-page window no matter the host's page size.
    let payload: Vec<u8> = (0..(256 * 1024)).map(|i| (i % 251) as u8).collect();
    let send_payload = payload.clone();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            sender
                .send_message::<_, std::io::Error>(|stream| {
                    // Write in small, uneven pieces to exercise multiple
                    // writes per chunk as well as multiple chunks per
                    // message.
                    for piece in send_payload.chunks(777) {
                        stream.write_all(piece)?;
                    }
                    Ok(())
                })
                .unwrap();
        });

        let received = receiver
            .receive_message::<_, std::io::Error>(|stream| read_to_vec(stream))
            .unwrap()
            .expect("message should not be cancelled");

        assert_eq!(received, payload);
    });
}

#[test]
fn message_an_exact_multiple_of_the_window_size_ends_cleanly() {
    // Invariant 3 (spec.md §3): when the payload length is an exact
    // multiple of the window size, the message still ends with an empty
    // final chunk rather than leaving the receiver waiting for one more.
    let name = unique_name("exact_multiple");
    let mut sender = Sender::create_or_open(&name).unwrap();
    let mut receiver = Receiver::create_or_open(&name).unwrap();

    // 8 bytes is the repr(C)-padded chunk header size (see region.rs);
    // there's no public accessor for the window length since callers never
    // need to know it.
    let window_len = msgchan_utils::page::page_size() - 8;
    let payload: Vec<u8> = (0..(window_len * 2)).map(|i| (i % 256) as u8).collect();
    let send_payload = payload.clone();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            sender
                .send_message::<_, std::io::Error>(|stream| stream.write_all(&send_payload))
                .unwrap();
        });

        let received = receiver
            .receive_message::<_, std::io::Error>(|stream| read_to_vec(stream))
            .unwrap()
            .expect("message should not be cancelled");

        assert_eq!(received, payload);
    });
}

#[test]
fn empty_message_round_trips() {
    let name = unique_name("empty");
    let mut sender = Sender::create_or_open(&name).unwrap();
    let mut receiver = Receiver::create_or_open(&name).unwrap();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            sender.send_message::<_, std::io::Error>(|_stream| Ok(())).unwrap();
        });

        let received = receiver
            .receive_message::<_, std::io::Error>(|stream| read_to_vec(stream))
            .unwrap()
            .expect("message should not be cancelled");

        assert!(received.is_empty());
    });
}

#[test]
fn disposal_is_idempotent() {
    let name = unique_name("dispose");
    let mut sender = Sender::create_or_open(&name).unwrap();
    let mut receiver = Receiver::create_or_open(&name).unwrap();

    sender.dispose();
    sender.dispose();
    receiver.dispose();
    receiver.dispose();

    let err = sender.send_message::<_, std::io::Error>(|_| Ok(()));
    assert!(matches!(err, Err(msgchan::SendError::Channel(msgchan::ChannelError::UsedAfterRelease))));

    let err = receiver.receive_message::<_, std::io::Error>(|stream| read_to_vec(stream));
    assert!(matches!(
        err,
        Err(msgchan::ReceiveError::Channel(msgchan::ChannelError::UsedAfterRelease))
    ));
}

#[test]
fn disposing_an_idle_receiver_cancels_its_wait() {
    let name = unique_name("cancel");
    // No sender ever opens this channel: the receiver is idling for a
    // message that will never arrive until it is cancelled from another
    // thread.
    let mut receiver = Receiver::create_or_open(&name).unwrap();
    let canceller = receiver.canceller().unwrap();

    std::thread::scope(|scope| {
        let handle = scope.spawn(move || {
            receiver.receive_message::<_, std::io::Error>(|stream| read_to_vec(stream))
        });

        // Give the receiver a moment to actually start its idle wait
        // before cancelling it.
        std::thread::sleep(Duration::from_millis(50));
        canceller.cancel();

        let result = handle.join().unwrap().unwrap();
        assert!(result.is_none(), "cancelling an idle receiver must yield Ok(None)");
    });
}

#[test]
fn sender_callback_failure_yields_an_empty_receive() {
    let name = unique_name("abort");
    let mut sender = Sender::create_or_open(&name).unwrap();
    let mut receiver = Receiver::create_or_open(&name).unwrap();

    #[derive(Debug)]
    struct BoomError;
    impl std::fmt::Display for BoomError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom")
        }
    }

    std::thread::scope(|scope| {
        scope.spawn(|| {
            let result = sender.send_message::<(), BoomError>(|stream| {
                stream.write_all(b"partial").map_err(|_| BoomError)?;
                Err(BoomError)
            });
            assert!(matches!(result, Err(msgchan::SendError::Callback(BoomError))));
        });

        let received = receiver
            .receive_message::<_, std::io::Error>(|stream| read_to_vec(stream))
            .unwrap();

        assert!(received.is_none(), "an aborted send must surface as a cancelled receive");
    });
}

/// A minimal byte-oriented record serializer, standing in for "any
/// byte-oriented serializer" per spec.md §8 scenario 4 — the channel itself
/// is agnostic to payload encoding, so the test supplies its own.
struct Record {
    bar: String,
}

impl Record {
    fn write_to(&self, w: &mut impl Write) -> std::io::Result<()> {
        let bytes = self.bar.as_bytes();
        w.write_all(&(bytes.len() as u32).to_le_bytes())?;
        w.write_all(bytes)
    }

    fn read_from(r: &mut impl Read) -> std::io::Result<Self> {
        let mut len_buf = [0u8; 4];
        r.read_exact(&mut len_buf)?;
        let mut bar_buf = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        r.read_exact(&mut bar_buf)?;
        Ok(Self { bar: String::from_utf8(bar_buf).expect("valid utf-8") })
    }
}

#[test]
fn structured_payload_round_trips_through_the_stream() {
    let name = unique_name("structured");
    let mut sender = Sender::create_or_open(&name).unwrap();
    let mut receiver = Receiver::create_or_open(&name).unwrap();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            sender
                .send_message::<_, std::io::Error>(|stream| {
                    Record { bar: "FooBar".to_string() }.write_to(stream)
                })
                .unwrap();
        });

        let record = receiver
            .receive_message::<_, std::io::Error>(|stream| Record::read_from(stream))
            .unwrap()
            .expect("message should not be cancelled");

        assert_eq!(record.bar, "FooBar");
    });
}

#[test]
fn receiver_callback_failure_after_full_read_does_not_release_the_sender() {
    // spec.md §8 scenario 6 / §7 ReceiverAborted: a receive-side callback
    // that reads the whole message and *then* fails must still leave
    // `MessageRead` unsignalled, exactly as if it had failed before reading
    // anything. The sender's `send_message` call therefore never returns —
    // it stays parked on its final `MessageRead` wait — so it is run on a
    // detached thread rather than one this test joins.
    let name = unique_name("recv_abort");
    let mut sender = Sender::create_or_open(&name).unwrap();
    let mut receiver = Receiver::create_or_open(&name).unwrap();

    std::thread::spawn(move || {
        let _ = sender.send_message::<_, std::io::Error>(|stream| stream.write_all(b"message"));
    });

    #[derive(Debug)]
    struct BoomError;
    impl std::fmt::Display for BoomError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom")
        }
    }

    let result = receiver.receive_message::<(), BoomError>(|stream| {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).map_err(|_| BoomError)?;
        assert_eq!(buf, b"message");
        Err(BoomError)
    });

    assert!(matches!(result, Err(msgchan::ReceiveError::Callback(BoomError))));
}
