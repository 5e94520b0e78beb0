//! Cross-module tests for the session, pipeline and mobile round trips

mod pipeline_tests;
