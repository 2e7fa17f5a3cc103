//! Handshake and call-lifecycle state machine.
//!
//! Every fresh gateway connection must complete the
//! challenge → connect → hello-ok exchange before the one application request
//! of the call may be sent. `CallDriver` owns that sequence as a pure state
//! machine: it consumes decoded frames and emits [`Step`] values, and the
//! transport loop in `client` performs the I/O. Keeping the driver socket-free
//! makes every transition unit-testable.
//!
//! Settlement is idempotent: the first terminal outcome wins, and any frame or
//! close event after that is ignored.

use crate::config::ProtocolConfig;
use crate::protocol::Frame;
use crate::{GatewayError, Result};
use serde_json::{json, Value};
use tracing::debug;

/// Call lifecycle phase. One connection carries exactly one application
/// request, so the phases form a straight line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Connection is open; waiting for the gateway's `connect.challenge`.
    AwaitingChallenge,
    /// Connect request sent; waiting for the hello-ok acknowledgement.
    AwaitingHello,
    /// Application request sent; waiting for its response.
    AwaitingResponse,
    /// Terminal. Further frames cannot change the outcome.
    Settled,
}

/// What the transport loop should do after feeding the driver one input.
#[derive(Debug)]
pub enum Step {
    /// Send this frame on the socket.
    Send(Frame),
    /// Nothing to do; keep waiting.
    Ignore,
    /// The call is settled; close the socket and return this outcome.
    Settle(Result<Value>),
}

/// Drives one call through the handshake and the application round trip.
pub struct CallDriver {
    phase: Phase,
    connect: Frame,
    request: Frame,
    connect_id: String,
    request_id: String,
}

impl CallDriver {
    /// Prepare the connect and application requests for one call.
    ///
    /// The credential travels inside the connect body (`auth.token`) in
    /// addition to the connection query parameter added by the transport;
    /// some gateways only inspect one of the two channels.
    pub fn new(method: &str, params: Value, token: Option<&str>) -> Self {
        let connect_params = json!({
            "minProtocolVersion": ProtocolConfig::VERSION_MIN,
            "maxProtocolVersion": ProtocolConfig::VERSION_MAX,
            "client": {
                "id": ProtocolConfig::CLIENT_ID,
                "version": env!("CARGO_PKG_VERSION"),
                "platform": "rust",
                "mode": ProtocolConfig::CLIENT_MODE,
            },
            "role": ProtocolConfig::ROLE,
            "scopes": [],
            "caps": [],
            "auth": { "token": token },
        });

        let connect = Frame::request("connect", connect_params);
        let request = Frame::request(method, params);
        let connect_id = frame_id(&connect);
        let request_id = frame_id(&request);

        Self {
            phase: Phase::AwaitingChallenge,
            connect,
            request,
            connect_id,
            request_id,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True once a terminal outcome has been produced.
    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Settled
    }

    /// Feed one decoded frame to the state machine.
    pub fn on_frame(&mut self, frame: Frame) -> Step {
        match self.phase {
            Phase::AwaitingChallenge => self.on_frame_awaiting_challenge(frame),
            Phase::AwaitingHello => self.on_frame_awaiting_hello(frame),
            Phase::AwaitingResponse => self.on_frame_awaiting_response(frame),
            Phase::Settled => Step::Ignore,
        }
    }

    /// The socket closed. Before settlement this is its own failure kind,
    /// regardless of close code.
    pub fn on_close(&mut self) -> Step {
        if self.is_settled() {
            return Step::Ignore;
        }
        self.settle(Err(GatewayError::Transport(
            "connection closed before response".into(),
        )))
    }

    fn on_frame_awaiting_challenge(&mut self, frame: Frame) -> Step {
        match frame {
            Frame::Event { ref event, .. } if event == ProtocolConfig::CHALLENGE_EVENT => {
                self.phase = Phase::AwaitingHello;
                Step::Send(self.connect.clone())
            }
            other => {
                debug!(phase = ?self.phase, frame = ?other, "dropping frame before challenge");
                Step::Ignore
            }
        }
    }

    fn on_frame_awaiting_hello(&mut self, frame: Frame) -> Step {
        match frame {
            Frame::Response {
                ref id,
                ok,
                ref payload,
                ref error,
            } if *id == self.connect_id => {
                if !ok {
                    let err = error.clone().map(GatewayError::from).unwrap_or_else(|| {
                        GatewayError::Protocol("connect rejected without error detail".into())
                    });
                    return self.settle(Err(err));
                }

                let marker = payload
                    .as_ref()
                    .and_then(|p| p.get("type"))
                    .and_then(Value::as_str);
                if marker != Some(ProtocolConfig::HELLO_OK) {
                    return self.settle(Err(GatewayError::Protocol(format!(
                        "expected {} acknowledgement, got payload type {:?}",
                        ProtocolConfig::HELLO_OK,
                        marker
                    ))));
                }

                self.phase = Phase::AwaitingResponse;
                Step::Send(self.request.clone())
            }
            other => {
                debug!(phase = ?self.phase, frame = ?other, "dropping frame while awaiting hello");
                Step::Ignore
            }
        }
    }

    fn on_frame_awaiting_response(&mut self, frame: Frame) -> Step {
        match frame {
            Frame::Response {
                ref id,
                ok,
                ref payload,
                ref error,
            } if *id == self.request_id => {
                if ok {
                    let result = payload.clone().unwrap_or(Value::Null);
                    self.settle(Ok(result))
                } else {
                    let err = error.clone().map(GatewayError::from).unwrap_or_else(|| {
                        GatewayError::Protocol("request failed without error detail".into())
                    });
                    self.settle(Err(err))
                }
            }
            // Liveness pings and stray responses from the gateway's other
            // activity are expected here.
            other => {
                debug!(phase = ?self.phase, frame = ?other, "dropping frame while awaiting response");
                Step::Ignore
            }
        }
    }

    fn settle(&mut self, outcome: Result<Value>) -> Step {
        self.phase = Phase::Settled;
        Step::Settle(outcome)
    }
}

fn frame_id(frame: &Frame) -> String {
    match frame {
        Frame::Request { id, .. } => id.clone(),
        // Drivers only prepare request frames.
        _ => String::new(),
    }
}
