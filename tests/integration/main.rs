//! Integration tests

mod api_tests;
mod booking_flow;
mod booking_numbers;
mod common;
mod http;
