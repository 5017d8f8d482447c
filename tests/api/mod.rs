//! REST API endpoint tests

mod access_tests;
mod auth_tests;
mod booking_tests;
mod health_tests;
