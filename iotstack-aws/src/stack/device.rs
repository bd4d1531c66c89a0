//! Device identity: thing, certificate, policy and their attachments

use iotstack_core::resource::{Resource, logical_id};
use iotstack_core::stack::{GraphError, ResourceHandle, Stack};

use super::config::CertificateSigningRequest;
use super::policy::PolicyDocument;

pub const THING_NAME: &str = "cdk-ttgo";
pub const POLICY_NAME: &str = "cdk-ttgo-policy";

/// Handles to the declared device identity resources
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    pub thing: ResourceHandle,
    pub certificate: ResourceHandle,
    pub policy: ResourceHandle,
    pub policy_attachment: ResourceHandle,
    pub thing_attachment: ResourceHandle,
}

/// Declare the device identity group
///
/// Thing is created first; certificate and policy depend on it; both
/// attachments depend on everything they bind together.
pub fn declare(
    stack: &mut Stack,
    csr: &CertificateSigningRequest,
    policy_document: &PolicyDocument,
) -> Result<DeviceIdentity, GraphError> {
    let thing = stack.add(
        Resource::new("AWS::IoT::Thing", logical_id("cdk-ttgo"))
            .with_attribute("thing_name", THING_NAME),
    )?;

    let certificate = stack.add(
        Resource::new("AWS::IoT::Certificate", logical_id("cdk-ttgo-certificate"))
            .with_attribute("status", "ACTIVE")
            .with_attribute("certificate_mode", "DEFAULT")
            .with_attribute("certificate_signing_request", csr.as_str())
            .depends_on(thing.logical_id()),
    )?;

    let policy = stack.add(
        Resource::new("AWS::IoT::Policy", logical_id("cdk-ttgo-policy"))
            .with_attribute("policy_name", POLICY_NAME)
            .with_attribute("policy_document", policy_document.to_value())
            .depends_on(thing.logical_id()),
    )?;

    let policy_attachment = stack.add(
        Resource::new(
            "AWS::IoT::PolicyPrincipalAttachment",
            logical_id("cdk-policy-principal-attachment"),
        )
        .with_attribute("policy_name", POLICY_NAME)
        .with_attribute("principal", certificate.attr("Arn"))
        .depends_on(policy.logical_id())
        .depends_on(certificate.logical_id()),
    )?;

    let thing_attachment = stack.add(
        Resource::new(
            "AWS::IoT::ThingPrincipalAttachment",
            logical_id("cdk-ttgo-thing-principal-attachment"),
        )
        .with_attribute("thing_name", THING_NAME)
        .with_attribute("principal", certificate.attr("Arn"))
        .depends_on(thing.logical_id())
        .depends_on(certificate.logical_id()),
    )?;

    Ok(DeviceIdentity {
        thing,
        certificate,
        policy,
        policy_attachment,
        thing_attachment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::config::tests::sample_config;
    use crate::stack::policy::PolicyStatement;
    use iotstack_core::resource::Value;
    use iotstack_core::stack::Stack;

    fn declared() -> (Stack, DeviceIdentity) {
        let config = sample_config();
        let mut stack = Stack::new("IoTStack").unwrap();
        let device = declare(&mut stack, &config.csr, &config.device_policy).unwrap();
        (stack, device)
    }

    #[test]
    fn declares_one_of_each_and_two_attachments() {
        let (stack, _) = declared();
        let counts = stack.type_counts();
        assert_eq!(counts["AWS::IoT::Thing"], 1);
        assert_eq!(counts["AWS::IoT::Certificate"], 1);
        assert_eq!(counts["AWS::IoT::Policy"], 1);
        assert_eq!(counts["AWS::IoT::PolicyPrincipalAttachment"], 1);
        assert_eq!(counts["AWS::IoT::ThingPrincipalAttachment"], 1);
    }

    #[test]
    fn certificate_and_policy_depend_on_thing() {
        let (stack, device) = declared();
        let thing = device.thing.logical_id().to_string();
        assert!(stack.dependencies(device.certificate.logical_id()).contains(&thing));
        assert!(stack.dependencies(device.policy.logical_id()).contains(&thing));
    }

    #[test]
    fn attachments_bind_the_certificate_arn_with_explicit_edges() {
        let (stack, device) = declared();
        let arn = Value::ResourceRef(device.certificate.logical_id().to_string(), "Arn".to_string());

        let policy_attachment = stack.get(device.policy_attachment.logical_id()).unwrap();
        assert_eq!(policy_attachment.attributes.get("principal"), Some(&arn));
        assert!(policy_attachment.depends_on.contains(device.policy.logical_id()));
        assert!(policy_attachment.depends_on.contains(device.certificate.logical_id()));

        let thing_attachment = stack.get(device.thing_attachment.logical_id()).unwrap();
        assert_eq!(thing_attachment.attributes.get("principal"), Some(&arn));
        assert!(thing_attachment.depends_on.contains(device.thing.logical_id()));
        assert!(thing_attachment.depends_on.contains(device.certificate.logical_id()));
    }

    #[test]
    fn certificate_carries_the_signing_request() {
        let (stack, device) = declared();
        let certificate = stack.get(device.certificate.logical_id()).unwrap();
        match certificate.attributes.get("certificate_signing_request") {
            Some(Value::String(pem)) => assert!(pem.contains("CERTIFICATE REQUEST")),
            other => panic!("Expected PEM string, got {:?}", other),
        }
        assert_eq!(
            certificate.attributes.get("status"),
            Some(&Value::from("ACTIVE"))
        );
    }

    #[test]
    fn policy_document_is_parameterizable() {
        let config = sample_config();
        let narrow = PolicyDocument::new(vec![PolicyStatement::allow(
            ["iot:Connect", "iot:Publish"],
            ["arn:aws:iot:*:*:client/cdk-ttgo"],
        )]);
        let mut stack = Stack::new("IoTStack").unwrap();
        let device = declare(&mut stack, &config.csr, &narrow).unwrap();

        let policy = stack.get(device.policy.logical_id()).unwrap();
        assert_eq!(policy.attributes.get("policy_document"), Some(&narrow.to_value()));
    }
}
