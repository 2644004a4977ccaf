/// Storage-level behaviour of the content tables
pub mod crud_tests;

/// Transaction handling on the unit-of-work connection
pub mod transaction_tests;
