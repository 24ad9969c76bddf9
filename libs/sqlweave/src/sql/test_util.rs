#![cfg(test)]

//! Test assertion to check SQL statements and parameters.

/// Assert that the values of the given parameters match the expected ones, in order.
///
/// Expected values are anything convertible into a `SqlValue`. Use `SqlValue::Null` for a
/// parameter whose (default) value was bound as `NULL`.
///
/// # Usage:
/// ```no_run
/// assert_params!(actual_params, expected_param1, expected_param2, ...);
/// ```
macro_rules! assert_params {
    ($actual_params:expr) => {
        assert!($actual_params.is_empty(), "Extra actual parameters");
    };
    ($actual_params:expr, $expected_param:expr $(, $rest:expr)*) => {
        match $actual_params.split_first() {
            Some((actual_head, actual_tail)) => {
                assert_eq!(
                    actual_head.value,
                    $crate::sql::value::SqlValue::from($expected_param),
                    "Parameter mismatch for {}",
                    actual_head.name
                );
                assert_params!(actual_tail $(, $rest)*);
            }
            None => panic!("Missing actual parameters"),
        }
    };
}

/// Assert on a `(sql, parameters)` pair.
macro_rules! assert_binding {
    ($actual:expr, $expected_stmt:expr) => {
        let (actual_stmt, actual_params) = $actual;
        assert_eq!(actual_stmt, $expected_stmt);
        assert_params!(actual_params);
    };
    ($actual:expr, $expected_stmt:expr, $($rest:expr), *) => {
        let (actual_stmt, actual_params) = $actual;
        assert_eq!(actual_stmt, $expected_stmt);
        assert_params!(actual_params, $($rest), *);
    };
}
