use taskdesk::error::{exit_codes, Error, JsonError};

#[test]
fn exit_codes_map_correctly() {
    assert_eq!(Error::NotSignedIn.exit_code(), exit_codes::USER_ERROR);
    assert_eq!(
        Error::InvalidArgument("bad".to_string()).exit_code(),
        exit_codes::USER_ERROR
    );
    assert_eq!(
        Error::Auth("Invalid login credentials".to_string()).exit_code(),
        exit_codes::AUTH_FAILED
    );
    assert_eq!(
        Error::Transport("timeout".to_string()).exit_code(),
        exit_codes::OPERATION_FAILED
    );
}

#[test]
fn json_error_includes_code_and_details() {
    let err = Error::Backend {
        status: 403,
        message: "permission denied for table tasks".to_string(),
    };
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::OPERATION_FAILED);
    assert!(json.error.contains("permission denied"));
    assert_eq!(json.details.expect("details")["status"], 403);
}
