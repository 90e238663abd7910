//! Integration tests for docsync-remote
//!
//! Uses wiremock to simulate the GitHub REST API and verifies end-to-end
//! behavior of the GitHub adapter and of the paced client and tree on top
//! of it.

mod common;

mod test_client;
mod test_contents;
mod test_profile_quota;
