//! The calling surface: connection, service handles, invocation flow.

use std::time::Duration;

use serde_json::Value as JsonValue;

use dubhe_core::error::{DubheError, Result};
use dubhe_core::hessian::Value;
use dubhe_core::naming::snake_to_camel;
use dubhe_core::protocol::{encode_request, SERIALIZATION_FASTJSON};
use dubhe_core::registry::SerializationRegistry;
use dubhe_core::reply::Reply;

use crate::config::ClientConfig;
use crate::request::{encode_generic_invocation, Invocation};
use crate::transport::{ByteTransport, FrameConn, TcpTransport};

/// One connection to a provider, typed over its transport so tests can
/// substitute an in-memory stream.
pub struct Client<T = TcpTransport> {
    conn: FrameConn<T>,
    registry: SerializationRegistry,
    config: ClientConfig,
}

impl Client<TcpTransport> {
    /// Connect to the configured address.
    pub async fn connect(config: ClientConfig) -> Result<Client<TcpTransport>> {
        let transport = TcpTransport::connect(
            &config.client.address,
            Duration::from_millis(config.client.connect_timeout_ms),
        )
        .await?;
        Ok(Client::over(transport, config))
    }
}

impl<T: ByteTransport> Client<T> {
    /// Build a client over an already-open transport.
    pub fn over(transport: T, config: ClientConfig) -> Client<T> {
        let conn = FrameConn::with_max_payload(transport, config.client.max_payload_bytes);
        Client {
            conn,
            registry: SerializationRegistry::with_defaults(),
            config,
        }
    }

    /// Decoders for response payloads, keyed by serialization id. Open for
    /// registration before the first call.
    pub fn registry(&self) -> &SerializationRegistry {
        &self.registry
    }

    /// A handle on one remote service interface, version `1.0.0` unless
    /// overridden.
    pub fn service(&mut self, interface: impl Into<String>) -> ServiceRef<'_, T> {
        ServiceRef {
            client: self,
            interface: interface.into(),
            version: "1.0.0".to_owned(),
        }
    }

    async fn invoke_raw(&mut self, invocation: &Invocation) -> Result<Value> {
        if invocation.method.is_empty() {
            return Err(DubheError::BadArgument(
                "method name must not be empty".to_owned(),
            ));
        }
        let body = encode_generic_invocation(invocation, &self.config.client.dubbo_version)?;
        let request_id: u64 = rand::random();
        let frame = encode_request(request_id, SERIALIZATION_FASTJSON, &body)?;

        tracing::debug!(
            request_id,
            service = %invocation.service,
            method = %invocation.method,
            payload_len = body.len(),
            "sending invocation"
        );

        let timeout_ms = self.config.client.request_timeout_ms;
        let outcome = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.roundtrip(request_id, &frame),
        )
        .await;
        let reply = match outcome {
            Ok(reply) => reply?,
            Err(_) => {
                // The reply to the abandoned call may still arrive, and the
                // next read would take it for its own. The stream cannot be
                // trusted to sit on a frame boundary anymore.
                self.conn.poison();
                return Err(DubheError::Timeout(timeout_ms));
            }
        };
        reply.into_result()
    }

    async fn roundtrip(&mut self, request_id: u64, frame: &[u8]) -> Result<Reply> {
        self.conn.send_frame(frame).await?;
        let envelope = self.conn.recv_data_frame().await?;
        if envelope.request_id() != request_id {
            // Single in-flight call per connection, so the reply is taken
            // for ours even when the peer echoes a different id.
            tracing::warn!(
                sent = request_id,
                received = envelope.request_id(),
                "correlation id mismatch on reply"
            );
        }
        self.registry.classify_response(&envelope)
    }
}

/// Borrowed handle binding a client to one service interface and version.
pub struct ServiceRef<'c, T> {
    client: &'c mut Client<T>,
    interface: String,
    version: String,
}

impl<'c, T: ByteTransport> ServiceRef<'c, T> {
    /// Override the service version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Call `method` with the given JSON arguments. The name travels
    /// verbatim.
    pub async fn invoke(&mut self, method: &str, arguments: Vec<JsonValue>) -> Result<Value> {
        let invocation = Invocation {
            service: self.interface.clone(),
            service_version: self.version.clone(),
            method: method.to_owned(),
            arguments,
        };
        self.client.invoke_raw(&invocation).await
    }

    /// Call a snake_case method name, translated to camelCase on the wire.
    pub async fn invoke_renamed(
        &mut self,
        method: &str,
        arguments: Vec<JsonValue>,
    ) -> Result<Value> {
        let wire_name = snake_to_camel(method);
        self.invoke(&wire_name, arguments).await
    }
}
