//! Helpers for running the binary against a mock backend.

#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ANON_KEY: &str = "anon-cli-key";
pub const USER_ID: &str = "0b6c7d1e-2f3a-4b5c-8d9e-0a1b2c3d4e5f";
pub const EMAIL: &str = "grace@example.com";
pub const ACCESS_TOKEN: &str = "access-token-0123456789";

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// The binary with an isolated home and the backend pointed at `server`.
pub fn pollr(home: &Path, server: &MockServer) -> Command {
    let mut cmd = cargo_bin_cmd!("pollr");
    cmd.env("POLLR_HOME", home)
        .env("POLLR_SUPABASE_URL", server.uri())
        .env("POLLR_SUPABASE_ANON_KEY", ANON_KEY)
        .env_remove("POLLR_LOG");
    cmd
}

/// The binary with an isolated home and no backend configured.
pub fn offline(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("pollr");
    cmd.env("POLLR_HOME", home)
        .env_remove("POLLR_SUPABASE_URL")
        .env_remove("POLLR_SUPABASE_ANON_KEY")
        .env_remove("POLLR_LOG");
    cmd
}

pub async fn mount_password_grant(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-cli",
            "user": { "id": USER_ID, "email": EMAIL }
        })))
        .mount(server)
        .await;
}

/// Signs in through the binary so later commands find a stored session.
pub async fn sign_in(home: &Path, server: &MockServer) {
    mount_password_grant(server).await;
    pollr(home, server)
        .args(["login", "--email", EMAIL, "--password", "hunter22"])
        .assert()
        .success();
}

pub fn rest_error(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "code": code,
        "message": message,
        "details": null,
        "hint": null
    }))
}
