use super::*;

#[test]
fn test_assigned_result_yields_assignment() {
    let assignment = RegistrationResult::assigned("h1", "dev-1").into_assignment().unwrap();

    assert_eq!(
        assignment,
        Assignment {
            hub: "h1".into(),
            device_id: "dev-1".into()
        }
    );
}

#[test]
fn test_non_assigned_status_is_rejected() {
    for status in [
        RegistrationStatus::Unassigned,
        RegistrationStatus::Assigning,
        RegistrationStatus::Failed,
        RegistrationStatus::Disabled,
    ] {
        let result = RegistrationResult::rejected(status, 401002, "unauthorized");
        match result.into_assignment() {
            Err(ConnectError::RegistrationRejected {
                status: s,
                code,
                message,
            }) => {
                assert_eq!(s, status);
                assert_eq!(code, 401002);
                assert_eq!(message, "unauthorized");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

#[test]
fn test_assigned_without_hub_is_rejected() {
    let mut result = RegistrationResult::assigned("  ", "dev-1");
    assert!(matches!(
        result.clone().into_assignment(),
        Err(ConnectError::RegistrationRejected { .. })
    ));

    result.assigned_hub = Some("h1".into());
    result.device_id = None;
    assert!(result.into_assignment().is_err());
}

#[test]
fn test_registration_payload_carries_model_id() {
    let identity = DeviceIdentity::new("dev-1", "k").with_model_id("dtmi:com:example:Thermostat;1");

    assert_eq!(
        identity.registration_payload(),
        Some(serde_json::json!({ "modelId": "dtmi:com:example:Thermostat;1" }))
    );
    assert_eq!(DeviceIdentity::new("dev-1", "k").registration_payload(), None);
    assert_eq!(
        DeviceIdentity::new("dev-1", "k").with_model_id(" ").registration_payload(),
        None
    );
}

#[test]
fn test_identity_debug_hides_keys() {
    let identity = DeviceIdentity::new("dev-1", "super-secret");
    let debug = format!("{identity:?}");

    assert!(debug.contains("dev-1"));
    assert!(!debug.contains("super-secret"));
}

#[test]
fn test_status_display_matches_wire_name() {
    assert_eq!(RegistrationStatus::Assigned.to_string(), "assigned");
    assert_eq!(
        serde_json::to_string(&RegistrationStatus::Disabled).unwrap(),
        "\"disabled\""
    );
}
