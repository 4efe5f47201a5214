//! Integration tests for chatdrive-drive
//!
//! Uses wiremock to simulate the Drive v3 API and the Google token endpoints
//! and verifies end-to-end behavior of folder provisioning, listings,
//! resumable uploads, and token handling.

mod common;

mod test_auth;
mod test_folders;
mod test_session;
mod test_upload;
