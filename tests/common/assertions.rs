//! Custom assertion macros and utilities
//!
//! Provides enhanced assertion macros for better test output and
//! more descriptive error messages.

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Assert that a result is an error, optionally of a given shape
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        assert!($result.is_err(), "Expected Err, got Ok");
    };
    ($result:expr, $pattern:pat) => {
        match $result {
            Err($pattern) => {}
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => panic!("Expected different error variant, got: {:?}", e),
        }
    };
}

/// Assert that a string contains a substring
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        match &$haystack {
            haystack => assert!(
                haystack.contains($needle),
                "Expected '{}' to contain '{}'",
                haystack,
                $needle
            ),
        }
    };
}

/// Assert the ids of a list of operations, in order
#[macro_export]
macro_rules! assert_operation_ids {
    ($operations:expr, [$($id:expr),* $(,)?]) => {
        let actual: Vec<&str> = $operations.iter().map(|op| op.id.as_str()).collect();
        let expected: Vec<&str> = vec![$($id),*];
        assert_eq!(actual, expected, "operation ids differ");
    };
}
