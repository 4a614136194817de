//! Port connections between sub-components of a composite.

use std::fmt;

use nineml_ir::PortKind;

use crate::namespace::append_namespace;

/// A connection from a send port of one sub-component to a receive port of
/// another, referring to both by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConnection {
    sender: String,
    send_port: String,
    receiver: String,
    receive_port: String,
}

impl PortConnection {
    /// Creates a connection from `send_port` of `sender` to `receive_port`
    /// of `receiver`.
    #[must_use]
    pub fn new(
        sender: impl Into<String>,
        send_port: impl Into<String>,
        receiver: impl Into<String>,
        receive_port: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            send_port: send_port.into(),
            receiver: receiver.into(),
            receive_port: receive_port.into(),
        }
    }

    /// Returns the name of the sending sub-component.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Returns the name of the send port.
    #[must_use]
    pub fn send_port(&self) -> &str {
        &self.send_port
    }

    /// Returns the name of the receiving sub-component.
    #[must_use]
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    /// Returns the name of the receive port.
    #[must_use]
    pub fn receive_port(&self) -> &str {
        &self.receive_port
    }

    /// Returns the send port name as seen from the composite.
    #[must_use]
    pub fn qualified_send_port(&self) -> String {
        append_namespace(&self.send_port, &self.sender)
    }

    /// Returns the receive port name as seen from the composite.
    #[must_use]
    pub fn qualified_receive_port(&self) -> String {
        append_namespace(&self.receive_port, &self.receiver)
    }
}

impl fmt::Display for PortConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' of '{}' -> '{}' of '{}'",
            self.send_port, self.sender, self.receive_port, self.receiver
        )
    }
}

/// How a connection is turned into composite elements, decided by the kind
/// of its receive port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// One writer per receive port; becomes an alias of the receive port.
    Analog,
    /// Any number of senders; each event fires the receiver's on-event.
    Event,
    /// Any number of senders; combined by the port's reduction operator.
    Reduce,
}

impl ConnectionKind {
    /// Returns the kind of a connection between ports of kinds `send` and
    /// `receive`, or `None` if the ports cannot be connected.
    #[must_use]
    pub const fn between(send: PortKind, receive: PortKind) -> Option<Self> {
        match (send, receive) {
            (PortKind::AnalogSend, PortKind::AnalogReceive) => Some(Self::Analog),
            (PortKind::AnalogSend, PortKind::AnalogReduce) => Some(Self::Reduce),
            (PortKind::EventSend, PortKind::EventReceive) => Some(Self::Event),
            (
                PortKind::AnalogSend
                | PortKind::AnalogReceive
                | PortKind::AnalogReduce
                | PortKind::EventSend
                | PortKind::EventReceive,
                _,
            ) => None,
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Analog => "analog",
            Self::Event => "event",
            Self::Reduce => "reduce",
        };
        write!(f, "{name}")
    }
}
