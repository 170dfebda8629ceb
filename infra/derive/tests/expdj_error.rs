use expdj_derive::expdj_error;
use std::borrow::Cow;

#[expdj_error]
pub enum LookupError {
    #[http(status = 404)]
    #[error("Record not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[http(status = 403)]
    #[error("Access denied{}: {message}", format_context(.context))]
    Forbidden { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("IO failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read_missing() -> Result<Vec<u8>, std::io::Error> {
    Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
}

#[test]
fn status_attribute_maps_variants() {
    let missing = LookupError::NotFound { message: "battery 7".into(), context: None };
    let denied = LookupError::Forbidden { message: "battery 7".into(), context: None };
    let internal = LookupError::from("broken invariant");

    assert_eq!(missing.status_code(), 404);
    assert_eq!(denied.status_code(), 403);
    assert_eq!(internal.status_code(), 500);
}

#[test]
fn context_is_rendered_in_display() {
    let err = read_missing().context("Loading experiment manifest").unwrap_err();

    assert!(matches!(err, LookupError::Io { .. }));
    assert_eq!(err.to_string(), "IO failure (Loading experiment manifest): gone");
}

#[test]
fn context_can_be_attached_to_own_result() {
    let res: Result<(), LookupError> =
        Err(LookupError::NotFound { message: "template 3".into(), context: None });

    let err = res.context("view_experiment").unwrap_err();
    assert_eq!(err.to_string(), "Record not found (view_experiment): template 3");
}

#[test]
fn string_conversions_target_internal() {
    let err: LookupError = String::from("dangling reference").into();
    assert!(matches!(err, LookupError::Internal { .. }));
    assert_eq!(err.to_string(), "Internal error: dangling reference");
}

#[test]
fn expdj_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/expdj_error_pass.rs");
}
