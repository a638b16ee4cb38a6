//! Integration tests for the SMTP client.
//!
//! A mock stream plays back canned server replies and records everything the
//! client writes, so whole sessions run without a real server.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use mailforge_smtp::{Address, Client, Credentials, Error};

/// Mock stream that returns predefined replies.
#[derive(Debug)]
struct MockStream {
    /// Replies to return (in order).
    replies: Cursor<Vec<u8>>,
    /// Commands sent by the client, shared with the test.
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStream {
    fn new(replies: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            replies: Cursor::new(replies.to_vec()),
            sent: Arc::clone(&sent),
        };
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.replies.get_ref();
        let pos = usize::try_from(self.replies.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        // One line per read, like a server answering command by command.
        let remaining = &data[pos..];
        let line_end = remaining
            .iter()
            .position(|&b| b == b'\n')
            .map_or(remaining.len(), |i| i + 1);
        let to_read = line_end.min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.replies.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn sent_text(sent: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

#[tokio::test]
async fn test_two_messages_in_one_session() {
    let (stream, sent) = MockStream::new(
        b"220 mx.example.com ESMTP\r\n\
          250-mx.example.com\r\n\
          250-PIPELINING\r\n\
          250-8BITMIME\r\n\
          250 AUTH LOGIN PLAIN\r\n\
          235 OK\r\n\
          250 OK\r\n\
          250 OK\r\n\
          354 Go ahead\r\n\
          250 Queued 1\r\n\
          250 OK\r\n\
          250 OK\r\n\
          354 Go ahead\r\n\
          250 Queued 2\r\n\
          221 Bye\r\n",
    );

    let sender = Address::new("news@acme.test").unwrap();
    let mut client = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("mailforge.local")
        .await
        .unwrap()
        .authenticate(&Credentials::new("news@acme.test", "pw"))
        .await
        .unwrap();
    assert!(client.server_info().supports_pipelining());

    for (to, body) in [
        ("ada@example.com", "Hello Ada\n.\nBye\n"),
        ("bob@example.com", "Hello Bob\r\n"),
    ] {
        client = client
            .mail_from(&sender, None)
            .await
            .unwrap()
            .rcpt_to(&Address::new(to).unwrap())
            .await
            .unwrap()
            .data()
            .await
            .unwrap()
            .send_message(body.as_bytes())
            .await
            .unwrap();
    }
    client.quit().await.unwrap();

    assert_eq!(
        sent_text(&sent),
        "EHLO mailforge.local\r\n\
         AUTH PLAIN AG5ld3NAYWNtZS50ZXN0AHB3\r\n\
         MAIL FROM:<news@acme.test> BODY=8BITMIME\r\n\
         RCPT TO:<ada@example.com>\r\n\
         DATA\r\n\
         Hello Ada\r\n..\r\nBye\r\n.\r\n\
         MAIL FROM:<news@acme.test> BODY=8BITMIME\r\n\
         RCPT TO:<bob@example.com>\r\n\
         DATA\r\n\
         Hello Bob\r\n.\r\n\
         QUIT\r\n"
    );
}

#[tokio::test]
async fn test_auth_failure_is_permanent() {
    let (stream, sent) = MockStream::new(
        b"220 mx.example.com ESMTP\r\n\
          250-mx.example.com\r\n\
          250 AUTH PLAIN\r\n\
          535 5.7.8 Authentication credentials invalid\r\n",
    );

    let err = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("mailforge.local")
        .await
        .unwrap()
        .authenticate(&Credentials::new("news@acme.test", "pw"))
        .await
        .unwrap_err();

    assert!(err.is_permanent());
    assert_eq!(err.reply_code(), Some(535));
    assert!(sent_text(&sent).ends_with("AUTH PLAIN AG5ld3NAYWNtZS50ZXN0AHB3\r\n"));
}

#[tokio::test]
async fn test_transient_rejection_after_data() {
    let (stream, _sent) = MockStream::new(
        b"220 mx.example.com ESMTP\r\n\
          250 mx.example.com\r\n\
          250 OK\r\n\
          250 OK\r\n\
          354 Go ahead\r\n\
          451 4.3.0 Try again later\r\n",
    );

    let err = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("mailforge.local")
        .await
        .unwrap()
        .without_auth()
        .mail_from(&Address::new("news@acme.test").unwrap(), None)
        .await
        .unwrap()
        .rcpt_to(&Address::new("ada@example.com").unwrap())
        .await
        .unwrap()
        .data()
        .await
        .unwrap()
        .send_message(b"Hi\r\n")
        .await
        .unwrap_err();

    assert!(err.is_transient());
}

#[tokio::test]
async fn test_server_hangs_up() {
    let (stream, _sent) = MockStream::new(b"220 mx.example.com ESMTP\r\n");

    let err = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("mailforge.local")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConnectionClosed));
}
