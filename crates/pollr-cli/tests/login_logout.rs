//! Sign-in, session persistence, and sign-out through the binary.

mod fixtures;

use fixtures::{ACCESS_TOKEN, EMAIL, USER_ID, can_bind_localhost, pollr, sign_in};
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_persists_session_for_later_commands() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;

    sign_in(home.path(), &server).await;
    assert!(home.path().join("session.json").exists());

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": USER_ID, "email": EMAIL })),
        )
        .expect(1)
        .mount(&server)
        .await;

    pollr(home.path(), &server)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains(EMAIL))
        .stdout(predicate::str::contains(USER_ID))
        .stdout(predicate::str::contains("access-token..."))
        .stdout(predicate::str::contains(ACCESS_TOKEN).not());
}

#[tokio::test]
async fn test_whoami_with_revoked_token_removes_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;
    sign_in(home.path(), &server).await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401,
            "error_code": "bad_jwt",
            "msg": "invalid JWT: token has been revoked"
        })))
        .mount(&server)
        .await;

    pollr(home.path(), &server)
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("token has been revoked"))
        .stderr(predicate::str::contains("pollr login"));

    assert!(!home.path().join("session.json").exists());
}

#[tokio::test]
async fn test_whoami_falls_back_to_stored_user_on_server_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;
    sign_in(home.path(), &server).await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    pollr(home.path(), &server)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains(EMAIL))
        .stderr(predicate::str::contains("Could not verify session"));

    assert!(home.path().join("session.json").exists());
}

#[tokio::test]
async fn test_login_with_bad_password_fails() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "error_code": "invalid_credentials",
            "msg": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    pollr(home.path(), &server)
        .args(["login", "--email", EMAIL, "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Sign In Error: Invalid login credentials",
        ));

    assert!(!home.path().join("session.json").exists());
}

#[tokio::test]
async fn test_login_reads_password_from_stdin() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;
    fixtures::mount_password_grant(&server).await;

    pollr(home.path(), &server)
        .args(["login", "--email", EMAIL])
        .write_stdin("hunter22\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Signed in as {EMAIL}")));
}

#[tokio::test]
async fn test_logout_removes_session_even_if_remote_fails() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;
    sign_in(home.path(), &server).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    pollr(home.path(), &server)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out"));

    assert!(!home.path().join("session.json").exists());

    pollr(home.path(), &server)
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not signed in"));
}

#[tokio::test]
async fn test_signup_waiting_for_confirmation() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": USER_ID, "email": EMAIL })),
        )
        .mount(&server)
        .await;

    pollr(home.path(), &server)
        .args(["signup", "--email", EMAIL, "--password", "hunter22"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Please check your email for the confirmation link",
        ));

    assert!(!home.path().join("session.json").exists());
}

#[tokio::test]
async fn test_signup_short_password_makes_no_request() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    pollr(home.path(), &server)
        .args(["signup", "--email", EMAIL, "--password", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Password must be at least 6 characters",
        ));
}

#[tokio::test]
async fn test_reset_password_sends_email() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/recover"))
        .and(body_json(json!({ "email": EMAIL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    pollr(home.path(), &server)
        .args(["reset-password", "--email", EMAIL])
        .assert()
        .success()
        .stdout(predicate::str::contains("Password reset email sent"));
}

#[tokio::test]
async fn test_update_password_uses_session_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;
    sign_in(home.path(), &server).await;

    Mock::given(method("PUT"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .and(body_json(json!({ "password": "n3w-secret" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": USER_ID, "email": EMAIL })),
        )
        .expect(1)
        .mount(&server)
        .await;

    pollr(home.path(), &server)
        .args([
            "update-password",
            "--password",
            "n3w-secret",
            "--confirm",
            "n3w-secret",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Password updated successfully"));
}

#[tokio::test]
async fn test_update_password_mismatch_fails_locally() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = tempdir().unwrap();
    let server = MockServer::start().await;
    sign_in(home.path(), &server).await;

    pollr(home.path(), &server)
        .args(["update-password", "--password", "abcdef", "--confirm", "abcdeg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Passwords do not match"));
}
