//! Generic-invocation request bodies.
//!
//! A call is carried as a text payload (serialization id 6): nine
//! CRLF-terminated lines naming the protocol version, the target service and
//! method, the inferred Java parameter types, the arguments as JSON, and the
//! attachment map. The remote side routes on the attachments, so their key
//! order is part of the wire shape.

use serde::Serialize;
use serde_json::Value as JsonValue;

use dubhe_core::error::Result;

/// Protocol version announced in every request body.
pub const DUBBO_VERSION: &str = "2.6.2";

/// Method name of the server-side generic entry point.
pub const GENERIC_INVOKE_METHOD: &str = "$invoke";

/// JVM signature of `$invoke(String, String[], Object[])`.
pub const GENERIC_INVOKE_SIGNATURE: &str =
    "Ljava/lang/String;[Ljava/lang/String;[Ljava/lang/Object;";

/// One method call, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Fully qualified service interface, e.g. `com.example.UserService`.
    pub service: String,
    /// Service version as registered on the provider.
    pub service_version: String,
    /// Method name sent verbatim.
    pub method: String,
    /// Arguments as JSON values.
    pub arguments: Vec<JsonValue>,
}

/// Routing attachments. Field order here is serialization order, which is
/// the order remote peers are known to accept.
#[derive(Serialize)]
struct Attachments<'a> {
    path: &'a str,
    interface: &'a str,
    version: &'a str,
    generic: &'a str,
}

/// Encode an invocation into the request payload.
///
/// Nine lines, each terminated by `\r\n`: dubbo version, service name,
/// service version, `$invoke`, its JVM signature, the method name, the
/// parameter-type array, the argument array, and the attachments. All JSON
/// is compact.
pub fn encode_generic_invocation(invocation: &Invocation, dubbo_version: &str) -> Result<Vec<u8>> {
    let parameter_types: Vec<String> = invocation
        .arguments
        .iter()
        .map(parameter_type_of)
        .collect();
    let attachments = Attachments {
        path: &invocation.service,
        interface: &invocation.service,
        version: &invocation.service_version,
        generic: "true",
    };

    let mut body = String::new();
    let mut push_line = |line: String| {
        body.push_str(&line);
        body.push_str("\r\n");
    };
    push_line(serde_json::to_string(dubbo_version)?);
    push_line(serde_json::to_string(&invocation.service)?);
    push_line(serde_json::to_string(&invocation.service_version)?);
    push_line(serde_json::to_string(GENERIC_INVOKE_METHOD)?);
    push_line(serde_json::to_string(GENERIC_INVOKE_SIGNATURE)?);
    push_line(serde_json::to_string(&invocation.method)?);
    push_line(serde_json::to_string(&parameter_types)?);
    push_line(serde_json::to_string(&invocation.arguments)?);
    push_line(serde_json::to_string(&attachments)?);
    Ok(body.into_bytes())
}

/// Infer the Java parameter type for one JSON argument.
///
/// Integers fitting `i32` travel as `java.lang.Integer`, wider ones as
/// `java.lang.Long`. An object may name its own class through a `"class"`
/// member (the member stays in the argument); otherwise it is a plain map.
pub fn parameter_type_of(argument: &JsonValue) -> String {
    match argument {
        JsonValue::Null => "java.lang.Object".to_owned(),
        JsonValue::Bool(_) => "java.lang.Boolean".to_owned(),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) if i32::try_from(i).is_ok() => "java.lang.Integer".to_owned(),
            Some(_) => "java.lang.Long".to_owned(),
            None if n.is_u64() => "java.lang.Long".to_owned(),
            None => "java.lang.Double".to_owned(),
        },
        JsonValue::String(_) => "java.lang.String".to_owned(),
        JsonValue::Array(_) => "java.util.List".to_owned(),
        JsonValue::Object(members) => match members.get("class").and_then(JsonValue::as_str) {
            Some(class) => class.to_owned(),
            None => "java.util.Map".to_owned(),
        },
    }
}
