//! Test suite for expense-sync
//!
//! This module organizes all tests

pub mod property;
