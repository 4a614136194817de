//! Ports through which a component exchanges analog values and events.

use std::fmt;

/// The reduction used to combine the signals arriving at a reduce port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReduceOp {
    /// The incoming signals are added together.
    #[default]
    Sum,
}

impl ReduceOp {
    /// Returns the operator symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Sum => "+",
        }
    }
}

/// The kind of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Publishes an analog value.
    AnalogSend,
    /// Receives a single analog value.
    AnalogReceive,
    /// Receives any number of analog values combined by a [`ReduceOp`].
    AnalogReduce,
    /// Emits events.
    EventSend,
    /// Receives events.
    EventReceive,
}

impl PortKind {
    /// Returns whether the port sends rather than receives.
    #[must_use]
    pub const fn is_send(self) -> bool {
        matches!(self, Self::AnalogSend | Self::EventSend)
    }

    /// Returns whether the port carries analog values.
    #[must_use]
    pub const fn is_analog(self) -> bool {
        matches!(
            self,
            Self::AnalogSend | Self::AnalogReceive | Self::AnalogReduce
        )
    }

    /// Returns the human-readable name of the kind.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AnalogSend => "analog send port",
            Self::AnalogReceive => "analog receive port",
            Self::AnalogReduce => "analog reduce port",
            Self::EventSend => "event send port",
            Self::EventReceive => "event receive port",
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

macro_rules! simple_port {
    ($(#[$doc:meta])* $ty:ident, $kind:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $ty {
            name: String,
        }

        impl $ty {
            /// Creates a new port.
            #[must_use]
            pub fn new(name: impl Into<String>) -> Self {
                Self { name: name.into() }
            }

            /// Returns the port name.
            #[must_use]
            pub fn name(&self) -> &str {
                &self.name
            }

            /// Returns the kind of the port.
            #[must_use]
            pub const fn kind(&self) -> PortKind {
                PortKind::$kind
            }
        }
    };
}

simple_port!(
    /// Publishes the value of a state variable or alias of the same name.
    AnalogSendPort,
    AnalogSend
);
simple_port!(
    /// Receives one analog value.
    AnalogReceivePort,
    AnalogReceive
);
simple_port!(
    /// Emits the events named by output events.
    EventSendPort,
    EventSend
);
simple_port!(
    /// Receives events that trigger on-event transitions.
    EventReceivePort,
    EventReceive
);

/// Receives any number of analog values, combined with a reduction operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalogReducePort {
    name: String,
    operator: ReduceOp,
}

impl AnalogReducePort {
    /// Creates a new reduce port.
    #[must_use]
    pub fn new(name: impl Into<String>, operator: ReduceOp) -> Self {
        Self {
            name: name.into(),
            operator,
        }
    }

    /// Returns the port name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the reduction operator.
    #[must_use]
    pub const fn operator(&self) -> ReduceOp {
        self.operator
    }

    /// Returns the kind of the port.
    #[must_use]
    pub const fn kind(&self) -> PortKind {
        PortKind::AnalogReduce
    }
}

/// A port of any kind, owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Port {
    /// An analog send port
    AnalogSend(AnalogSendPort),
    /// An analog receive port
    AnalogReceive(AnalogReceivePort),
    /// An analog reduce port
    AnalogReduce(AnalogReducePort),
    /// An event send port
    EventSend(EventSendPort),
    /// An event receive port
    EventReceive(EventReceivePort),
}

impl Port {
    /// Returns the port name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.as_port_ref().name()
    }

    /// Returns the kind of the port.
    #[must_use]
    pub fn kind(&self) -> PortKind {
        self.as_port_ref().kind()
    }

    /// Borrows the port.
    #[must_use]
    pub const fn as_port_ref(&self) -> PortRef<'_> {
        match self {
            Self::AnalogSend(port) => PortRef::AnalogSend(port),
            Self::AnalogReceive(port) => PortRef::AnalogReceive(port),
            Self::AnalogReduce(port) => PortRef::AnalogReduce(port),
            Self::EventSend(port) => PortRef::EventSend(port),
            Self::EventReceive(port) => PortRef::EventReceive(port),
        }
    }

    /// Returns a port of the same kind with a different name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        match self {
            Self::AnalogSend(_) => Self::AnalogSend(AnalogSendPort::new(name)),
            Self::AnalogReceive(_) => Self::AnalogReceive(AnalogReceivePort::new(name)),
            Self::AnalogReduce(port) => {
                Self::AnalogReduce(AnalogReducePort::new(name, port.operator()))
            }
            Self::EventSend(_) => Self::EventSend(EventSendPort::new(name)),
            Self::EventReceive(_) => Self::EventReceive(EventReceivePort::new(name)),
        }
    }
}

/// A borrowed port of any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortRef<'a> {
    /// An analog send port
    AnalogSend(&'a AnalogSendPort),
    /// An analog receive port
    AnalogReceive(&'a AnalogReceivePort),
    /// An analog reduce port
    AnalogReduce(&'a AnalogReducePort),
    /// An event send port
    EventSend(&'a EventSendPort),
    /// An event receive port
    EventReceive(&'a EventReceivePort),
}

impl<'a> PortRef<'a> {
    /// Returns the port name.
    #[must_use]
    pub fn name(self) -> &'a str {
        match self {
            Self::AnalogSend(port) => port.name(),
            Self::AnalogReceive(port) => port.name(),
            Self::AnalogReduce(port) => port.name(),
            Self::EventSend(port) => port.name(),
            Self::EventReceive(port) => port.name(),
        }
    }

    /// Returns the kind of the port.
    #[must_use]
    pub const fn kind(self) -> PortKind {
        match self {
            Self::AnalogSend(_) => PortKind::AnalogSend,
            Self::AnalogReceive(_) => PortKind::AnalogReceive,
            Self::AnalogReduce(_) => PortKind::AnalogReduce,
            Self::EventSend(_) => PortKind::EventSend,
            Self::EventReceive(_) => PortKind::EventReceive,
        }
    }

    /// Clones the referenced port.
    #[must_use]
    pub fn to_port(self) -> Port {
        match self {
            Self::AnalogSend(port) => Port::AnalogSend(port.clone()),
            Self::AnalogReceive(port) => Port::AnalogReceive(port.clone()),
            Self::AnalogReduce(port) => Port::AnalogReduce(port.clone()),
            Self::EventSend(port) => Port::EventSend(port.clone()),
            Self::EventReceive(port) => Port::EventReceive(port.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_kinds() {
        assert!(PortKind::AnalogSend.is_send());
        assert!(PortKind::EventSend.is_send());
        assert!(!PortKind::AnalogReduce.is_send());
        assert!(PortKind::AnalogReduce.is_analog());
        assert!(!PortKind::EventReceive.is_analog());
    }

    #[test]
    fn renamed_keeps_kind_and_operator() {
        let port = Port::AnalogReduce(AnalogReducePort::new("Isyn", ReduceOp::Sum));
        let renamed = port.renamed("Isyn_cell");

        assert_eq!(renamed.name(), "Isyn_cell");
        assert_eq!(renamed.kind(), PortKind::AnalogReduce);
        assert_eq!(renamed.as_port_ref().to_port(), renamed);
    }
}
