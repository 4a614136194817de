use crate::Dynamics;

use super::ValidationError;

/// Reports analog send ports that have no alias or state variable of the
/// same name to publish.
#[must_use]
pub fn check_send_ports(dynamics: &Dynamics) -> Vec<ValidationError> {
    dynamics
        .analog_send_ports()
        .keys()
        .filter(|port| {
            !dynamics.aliases().contains_key(*port)
                && !dynamics.state_variables().contains_key(*port)
        })
        .map(|port| ValidationError::UnbackedSendPort { port: port.clone() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_ports_need_a_source() {
        let dynamics = Dynamics::builder("Sender")
            .state_variable("V")
            .alias("I", "V * 2")
            .analog_send_port("V")
            .analog_send_port("I")
            .analog_send_port("g")
            .build_unvalidated()
            .expect("builder should accept the component");

        assert_eq!(
            check_send_ports(&dynamics),
            [ValidationError::UnbackedSendPort {
                port: "g".to_string()
            }]
        );
    }
}
