#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

//! End-to-end invocation flow over a scripted in-memory transport.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use dubhe_client::client::Client;
use dubhe_client::config::ClientConfig;
use dubhe_client::transport::ByteTransport;
use dubhe_core::error::{DubheError, ProtocolError, RemoteError, Result};
use dubhe_core::hessian::Value;
use dubhe_core::protocol::{Envelope, Status, SERIALIZATION_FASTJSON};
use dubhe_core::registry::BodyCodec;
use dubhe_core::reply::Reply;

/// Replays pre-scripted frames and records everything the client writes.
struct ScriptedTransport {
    incoming: Vec<u8>,
    outgoing: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedTransport {
    fn with_replies(frames: &[Vec<u8>]) -> (ScriptedTransport, Arc<Mutex<Vec<u8>>>) {
        let outgoing = Arc::new(Mutex::new(Vec::new()));
        let transport = ScriptedTransport {
            incoming: frames.concat(),
            outgoing: Arc::clone(&outgoing),
        };
        (transport, outgoing)
    }
}

#[async_trait]
impl ByteTransport for ScriptedTransport {
    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.outgoing.lock().unwrap().extend_from_slice(buf);
        Ok(())
    }

    async fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        if self.incoming.len() < n {
            return Err(DubheError::Connection("script exhausted".to_owned()));
        }
        let rest = self.incoming.split_off(n);
        let chunk = std::mem::replace(&mut self.incoming, rest);
        Ok(Bytes::from(chunk))
    }
}

fn response_frame(flag: u8, status: u8, request_id: u64, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(16 + payload.len());
    frame.extend_from_slice(&0xdabb_u16.to_be_bytes());
    frame.push(flag);
    frame.push(status);
    frame.extend_from_slice(&request_id.to_be_bytes());
    frame.extend_from_slice(&u32::try_from(payload.len()).unwrap().to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Compact inline string, for payloads shorter than 32 chars.
fn hstr(s: &str) -> Vec<u8> {
    let mut bytes = vec![u8::try_from(s.len()).unwrap()];
    bytes.extend_from_slice(s.as_bytes());
    bytes
}

fn value_payload(s: &str) -> Vec<u8> {
    let mut payload = vec![0x91];
    payload.extend_from_slice(&hstr(s));
    payload
}

fn client_over(frames: &[Vec<u8>]) -> (Client<ScriptedTransport>, Arc<Mutex<Vec<u8>>>) {
    let (transport, outgoing) = ScriptedTransport::with_replies(frames);
    (Client::over(transport, ClientConfig::default()), outgoing)
}

#[tokio::test]
async fn invoke_decodes_a_value_reply() {
    let (mut client, outgoing) =
        client_over(&[response_frame(0x02, 20, 7, &value_payload("pong"))]);

    let value = client
        .service("com.example.EchoService")
        .invoke("echo", vec![serde_json::json!("hello")])
        .await
        .unwrap();
    assert_eq!(value, Value::String("pong".to_owned()));

    // The request on the wire is a two-way text-serialized call.
    let written = outgoing.lock().unwrap().clone();
    let envelope = Envelope::parse(&written).unwrap();
    assert!(envelope.header.is_request());
    assert!(envelope.header.is_two_way());
    assert!(!envelope.is_event());
    assert_eq!(envelope.serialization_id(), SERIALIZATION_FASTJSON);

    let body = String::from_utf8(envelope.payload.to_vec()).unwrap();
    let lines: Vec<&str> = body.split("\r\n").collect();
    assert_eq!(lines[0], "\"2.6.2\"");
    assert_eq!(lines[1], "\"com.example.EchoService\"");
    assert_eq!(lines[2], "\"1.0.0\"");
    assert_eq!(lines[3], "\"$invoke\"");
    assert_eq!(lines[5], "\"echo\"");
    assert_eq!(lines[6], "[\"java.lang.String\"]");
    assert_eq!(lines[7], "[\"hello\"]");
    assert!(lines[8].contains("\"generic\":\"true\""));
    assert!(body.ends_with("\r\n"));
}

#[tokio::test]
async fn invoke_decodes_a_null_reply() {
    let (mut client, _) = client_over(&[response_frame(0x02, 20, 1, &[0x92])]);

    let value = client
        .service("com.example.EchoService")
        .invoke("forget", Vec::new())
        .await
        .unwrap();
    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn service_version_travels_in_the_body() {
    let (mut client, outgoing) = client_over(&[response_frame(0x02, 20, 1, &[0x92])]);

    client
        .service("com.example.EchoService")
        .version("2.3.1")
        .invoke("forget", Vec::new())
        .await
        .unwrap();

    let written = outgoing.lock().unwrap().clone();
    let envelope = Envelope::parse(&written).unwrap();
    let body = String::from_utf8(envelope.payload.to_vec()).unwrap();
    assert!(body.contains("\"2.3.1\"\r\n"));
    assert!(body.contains("\"version\":\"2.3.1\""));
}

#[tokio::test]
async fn invoke_renamed_translates_to_camel_case() {
    let (mut client, outgoing) = client_over(&[response_frame(0x02, 20, 1, &[0x92])]);

    client
        .service("com.example.UserService")
        .invoke_renamed("get_user_by_id", vec![serde_json::json!(5)])
        .await
        .unwrap();

    let written = outgoing.lock().unwrap().clone();
    let envelope = Envelope::parse(&written).unwrap();
    let body = String::from_utf8(envelope.payload.to_vec()).unwrap();
    assert!(body.contains("\"getUserById\"\r\n"));
}

#[tokio::test]
async fn remote_exception_surfaces_as_error() {
    let mut payload = vec![0x90];
    payload.extend_from_slice(&hstr("boom"));
    let (mut client, _) = client_over(&[response_frame(0x02, 20, 1, &payload)]);

    let err = client
        .service("com.example.EchoService")
        .invoke("explode", Vec::new())
        .await
        .unwrap_err();
    match err {
        DubheError::Remote(RemoteError::Exception(e)) => {
            assert_eq!(e.message(), Some("boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn heartbeat_frames_are_skipped() {
    let heartbeat = response_frame(0x22, 20, 0, &[0x4e]);
    let reply = response_frame(0x02, 20, 1, &value_payload("pong"));
    let (mut client, _) = client_over(&[heartbeat, reply]);

    let value = client
        .service("com.example.EchoService")
        .invoke("echo", Vec::new())
        .await
        .unwrap();
    assert_eq!(value, Value::String("pong".to_owned()));
}

#[tokio::test]
async fn non_ok_status_is_a_remote_error() {
    let (mut client, _) = client_over(&[response_frame(0x02, 40, 1, &[0x92])]);

    let err = client
        .service("com.example.EchoService")
        .invoke("echo", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DubheError::Remote(RemoteError::Status(Status::BadRequest))
    ));
}

#[tokio::test]
async fn empty_method_name_is_rejected_before_sending() {
    let (mut client, outgoing) = client_over(&[]);

    let err = client
        .service("com.example.EchoService")
        .invoke("", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DubheError::BadArgument(_)));
    assert!(outgoing.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mismatched_correlation_id_is_accepted() {
    let (mut client, _) = client_over(&[response_frame(0x02, 20, 0x1234, &value_payload("ok"))]);

    let value = client
        .service("com.example.EchoService")
        .invoke("echo", Vec::new())
        .await
        .unwrap();
    assert_eq!(value, Value::String("ok".to_owned()));
}

#[tokio::test]
async fn oversized_payload_poisons_the_connection() {
    let mut config = ClientConfig::default();
    config.client.max_payload_bytes = 1024;

    let mut oversized = response_frame(0x02, 20, 1, &[]);
    // Declared length far beyond the cap; the payload itself never arrives.
    oversized[12..16].copy_from_slice(&2048_u32.to_be_bytes());

    let (transport, _) = ScriptedTransport::with_replies(&[oversized]);
    let mut client = Client::over(transport, config);

    let err = client
        .service("com.example.EchoService")
        .invoke("echo", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DubheError::Protocol(ProtocolError::PayloadTooLarge { size: 2048, max: 1024 })
    ));

    // Later calls refuse the connection outright.
    let err = client
        .service("com.example.EchoService")
        .invoke("echo", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DubheError::Connection(_)));
}

#[tokio::test]
async fn peer_closing_mid_frame_is_a_connection_error() {
    let mut truncated = response_frame(0x02, 20, 1, &[0x92, 0x00, 0x00]);
    truncated.truncate(17);
    let (mut client, _) = client_over(&[truncated]);

    let err = client
        .service("com.example.EchoService")
        .invoke("echo", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DubheError::Connection(_)));
}

#[tokio::test]
async fn request_timeout_poisons_the_connection() {
    /// Holds the first read until the caller gives up, then serves the
    /// abandoned call's reply to whoever reads next.
    struct LateReplyTransport {
        first_read_pends: bool,
        late_reply: Vec<u8>,
    }

    #[async_trait]
    impl ByteTransport for LateReplyTransport {
        async fn write_all(&mut self, _buf: &[u8]) -> Result<()> {
            Ok(())
        }

        async fn read_exact(&mut self, n: usize) -> Result<Bytes> {
            if self.first_read_pends {
                self.first_read_pends = false;
                std::future::pending::<()>().await;
            }
            if self.late_reply.len() < n {
                return Err(DubheError::Connection("script exhausted".to_owned()));
            }
            let rest = self.late_reply.split_off(n);
            Ok(Bytes::from(std::mem::replace(&mut self.late_reply, rest)))
        }
    }

    let mut config = ClientConfig::default();
    config.client.request_timeout_ms = 50;
    let mut client = Client::over(
        LateReplyTransport {
            first_read_pends: true,
            late_reply: response_frame(0x02, 20, 0x7777, &value_payload("late")),
        },
        config,
    );

    let err = client
        .service("com.example.EchoService")
        .invoke("echo", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DubheError::Timeout(50)));

    // The timed-out call's reply is still queued. The next call must refuse
    // the connection rather than take that reply for its own result.
    let err = client
        .service("com.example.EchoService")
        .invoke("echo", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DubheError::Connection(_)));
}

#[tokio::test]
async fn registered_codec_decodes_replies_under_its_id() {
    struct TextCodec;

    impl BodyCodec for TextCodec {
        fn serialization_id(&self) -> u8 {
            7
        }

        fn decode_value(&self, payload: &[u8]) -> Result<Value> {
            Ok(Value::String(String::from_utf8_lossy(payload).into_owned()))
        }

        fn decode_reply(&self, payload: &[u8]) -> Result<Reply> {
            Ok(Reply::Value(self.decode_value(payload)?))
        }
    }

    let (mut client, _) = client_over(&[response_frame(0x07, 20, 1, b"pong")]);
    client.registry().register(Arc::new(TextCodec));

    let value = client
        .service("com.example.EchoService")
        .invoke("echo", Vec::new())
        .await
        .unwrap();
    assert_eq!(value, Value::String("pong".to_owned()));
}
