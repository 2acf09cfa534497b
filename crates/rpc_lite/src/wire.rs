//! Messages exchanged between client and server.
//!
//! Every message is a protobuf message carried in a single length-delimited
//! frame. The types are declared with `prost` derives so no build step is
//! needed.

use std::fmt;

/// A single named call with ordered positional arguments.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CallRequest {
    #[prost(string, tag = "1")]
    pub operation: String,
    #[prost(double, repeated, tag = "2")]
    pub arguments: Vec<f64>,
}

impl CallRequest {
    pub fn new(operation: impl Into<String>, arguments: impl Into<Vec<f64>>) -> Self {
        Self {
            operation: operation.into(),
            arguments: arguments.into(),
        }
    }
}

/// The server's answer to a [`CallRequest`].
///
/// `outcome` is always set by the server. A decoded response without an
/// outcome is a protocol violation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CallResponse {
    #[prost(oneof = "call_response::Outcome", tags = "1, 2")]
    pub outcome: Option<call_response::Outcome>,
}

pub mod call_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Outcome {
        #[prost(double, tag = "1")]
        Result(f64),
        #[prost(message, tag = "2")]
        Fault(super::Fault),
    }
}

impl CallResponse {
    pub fn result(value: f64) -> Self {
        Self {
            outcome: Some(call_response::Outcome::Result(value)),
        }
    }

    pub fn fault(fault: Fault) -> Self {
        Self {
            outcome: Some(call_response::Outcome::Fault(fault)),
        }
    }
}

/// A structured error reported by the server.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Fault {
    #[prost(enumeration = "FaultCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}

impl Fault {
    pub fn new(code: FaultCode, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FaultCode {
    Unspecified = 0,
    MalformedRequest = 1,
    UnknownOperation = 2,
    DomainError = 3,
    ArityMismatch = 4,
    Internal = 5,
}

impl FaultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultCode::Unspecified => "Unspecified",
            FaultCode::MalformedRequest => "MalformedRequest",
            FaultCode::UnknownOperation => "UnknownOperation",
            FaultCode::DomainError => "DomainError",
            FaultCode::ArityMismatch => "ArityMismatch",
            FaultCode::Internal => "Internal",
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use prost::Message;

    #[test]
    fn test_request_keeps_argument_order_and_sign() {
        let request = CallRequest::new("subtract", vec![-2.5, 0.125, 1e-300, -0.0]);
        let decoded = CallRequest::decode(request.encode_to_vec().as_slice()).unwrap();

        assert_eq!(decoded, request);
        assert!(decoded.arguments[3].is_sign_negative());
    }

    #[test]
    fn test_request_without_arguments() {
        let request = CallRequest::new("noop", Vec::new());
        let decoded = CallRequest::decode(request.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.operation, "noop");
        assert!(decoded.arguments.is_empty());
    }

    #[test]
    fn test_non_finite_result_survives() {
        let response = CallResponse::result(f64::NEG_INFINITY);
        let decoded = CallResponse::decode(response.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, response);

        let response = CallResponse::result(f64::NAN);
        let decoded = CallResponse::decode(response.encode_to_vec().as_slice()).unwrap();
        match decoded.outcome {
            Some(call_response::Outcome::Result(v)) => assert!(v.is_nan()),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_fault_response() {
        let response = CallResponse::fault(Fault::new(FaultCode::DomainError, "nope"));
        let decoded = CallResponse::decode(response.encode_to_vec().as_slice()).unwrap();

        match decoded.outcome {
            Some(call_response::Outcome::Fault(fault)) => {
                assert_eq!(fault.code(), FaultCode::DomainError);
                assert_eq!(fault.message, "nope");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_empty_response_has_no_outcome() {
        let decoded = CallResponse::decode(bytes::Bytes::new()).unwrap();
        assert!(decoded.outcome.is_none());
    }

    #[test]
    fn test_unknown_fault_code_falls_back() {
        let fault = Fault {
            code: 99,
            message: String::new(),
        };
        assert_eq!(fault.code(), FaultCode::Unspecified);
        assert!(FaultCode::try_from(99).is_err());
        assert_eq!(FaultCode::try_from(2).ok(), Some(FaultCode::UnknownOperation));
    }

    proptest! {
        #[test]
        fn request_survives_encoding(
            operation in "[a-z_]{0,16}",
            arguments in proptest::collection::vec(-1e12f64..1e12, 0..8),
        ) {
            let request = CallRequest::new(operation, arguments);
            let decoded = CallRequest::decode(request.encode_to_vec().as_slice()).unwrap();
            prop_assert_eq!(decoded, request);
        }
    }
}
