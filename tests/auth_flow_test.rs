mod common;

use aura_assign::{
    actions::{
        ActionResult,
        login::{LoginInput, login},
    },
    auth::tokens,
    entities::{
        sea_orm_active_enums::PrincipalKind, two_factor_confirmation, two_factor_token,
        verification_token,
    },
};
use chrono::{Duration, Utc};
use common::{PASSWORD, TestApp};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, IntoActiveModel, PaginatorTrait};

fn input(email: &str, password: &str, code: Option<&str>) -> LoginInput {
    LoginInput {
        email: email.to_string(),
        password: password.to_string(),
        code: code.map(str::to_string),
    }
}

#[tokio::test]
async fn unknown_email_is_rejected() {
    let app = TestApp::spawn().await;
    let mut session = app.session();

    let result = login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("nobody@example.com", PASSWORD, None),
    )
    .await;

    assert_eq!(result, ActionResult::error("Email does not exist"));
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn kinds_do_not_share_accounts() {
    let app = TestApp::spawn().await;
    app.create_principal(PrincipalKind::Organization, "org@example.com", true, false)
        .await;
    let mut session = app.session();

    let result = login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("org@example.com", PASSWORD, None),
    )
    .await;

    assert_eq!(result, ActionResult::error("Email does not exist"));
}

#[tokio::test]
async fn unverified_sign_in_sends_confirmation_instead_of_session() {
    let app = TestApp::spawn().await;
    app.create_principal(PrincipalKind::User, "new@example.com", false, false)
        .await;
    let mut session = app.session();

    let result = login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("new@example.com", PASSWORD, None),
    )
    .await;

    assert_eq!(result, ActionResult::success("Confirmation email sent!"));
    assert!(session.user.is_none());
    let mail = app.mailer.last().unwrap();
    assert_eq!(mail.to, "new@example.com");
    assert_eq!(mail.subject, "Confirm your email");
    assert!(mail.html.contains("/auth/new-verification?token="));
}

#[tokio::test]
async fn repeated_attempts_replace_the_verification_token() {
    let app = TestApp::spawn().await;
    app.create_principal(PrincipalKind::User, "new@example.com", false, false)
        .await;
    let mut session = app.session();

    for _ in 0..2 {
        login(
            &app.state,
            &mut session,
            PrincipalKind::User,
            input("new@example.com", PASSWORD, None),
        )
        .await;
    }

    let rows = verification_token::Entity::find().all(&app.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(app.mailer.sent().len(), 2);
    assert!(app.mailer.last().unwrap().html.contains(&rows[0].token));
}

#[tokio::test]
async fn verified_principal_signs_in() {
    let app = TestApp::spawn().await;
    let org = app
        .create_principal(PrincipalKind::Organization, "org@example.com", true, false)
        .await;
    let mut session = app.session();

    let result = login(
        &app.state,
        &mut session,
        PrincipalKind::Organization,
        input("org@example.com", PASSWORD, None),
    )
    .await;

    assert_eq!(result, ActionResult::success("Successfully logged in!"));
    assert_eq!(session.user.map(|p| p.id), Some(org.id));
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    let app = TestApp::spawn().await;
    app.create_principal(PrincipalKind::User, "jo@example.com", true, false)
        .await;
    let mut session = app.session();

    let result = login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("jo@example.com", "not-the-password", None),
    )
    .await;

    assert_eq!(result, ActionResult::error("Invalid credentials"));
    assert!(session.user.is_none());
}

#[tokio::test]
async fn two_factor_without_code_mails_a_code() {
    let app = TestApp::spawn().await;
    app.create_principal(PrincipalKind::User, "jo@example.com", true, true)
        .await;
    let mut session = app.session();

    let result = login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("jo@example.com", PASSWORD, None),
    )
    .await;

    assert_eq!(result, ActionResult::two_factor());
    assert!(session.user.is_none());
    let token = tokens::find_two_factor_token(&app.db, PrincipalKind::User, "jo@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(token.token.len(), 6);
    let mail = app.mailer.last().unwrap();
    assert_eq!(mail.subject, "2FA Code");
    assert!(mail.html.contains(&token.token));
}

#[tokio::test]
async fn blank_code_counts_as_missing() {
    let app = TestApp::spawn().await;
    app.create_principal(PrincipalKind::User, "jo@example.com", true, true)
        .await;
    let mut session = app.session();

    let result = login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("jo@example.com", PASSWORD, Some("  ")),
    )
    .await;

    assert_eq!(result, ActionResult::two_factor());
}

#[tokio::test]
async fn two_factor_code_completes_sign_in() {
    let app = TestApp::spawn().await;
    let user = app
        .create_principal(PrincipalKind::User, "jo@example.com", true, true)
        .await;
    let mut session = app.session();

    login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("jo@example.com", PASSWORD, None),
    )
    .await;
    let code = tokens::find_two_factor_token(&app.db, PrincipalKind::User, "jo@example.com")
        .await
        .unwrap()
        .unwrap()
        .token;

    let result = login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("jo@example.com", PASSWORD, Some(&code)),
    )
    .await;

    assert_eq!(result, ActionResult::success("Successfully logged in!"));
    assert_eq!(session.user.map(|p| p.id), Some(user.id));
    assert_eq!(two_factor_token::Entity::find().count(&app.db).await.unwrap(), 0);
    // The session consumed the confirmation.
    assert_eq!(
        two_factor_confirmation::Entity::find().count(&app.db).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn accepted_code_leaves_exactly_one_confirmation() {
    let app = TestApp::spawn().await;
    let user = app
        .create_principal(PrincipalKind::User, "jo@example.com", true, true)
        .await;
    let mut session = app.session();

    // Accept two codes in a row, each followed by a failed password check so
    // the confirmation is never consumed.
    for _ in 0..2 {
        login(
            &app.state,
            &mut session,
            PrincipalKind::User,
            input("jo@example.com", PASSWORD, None),
        )
        .await;
        let code = tokens::find_two_factor_token(&app.db, PrincipalKind::User, "jo@example.com")
            .await
            .unwrap()
            .unwrap()
            .token;
        let result = login(
            &app.state,
            &mut session,
            PrincipalKind::User,
            input("jo@example.com", "wrong-password", Some(&code)),
        )
        .await;
        assert_eq!(result, ActionResult::error("Invalid credentials"));
    }

    let confirmations = two_factor_confirmation::Entity::find()
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(confirmations.len(), 1);
    assert_eq!(confirmations[0].principal_id, user.id);
    assert_eq!(two_factor_token::Entity::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn wrong_code_is_rejected() {
    let app = TestApp::spawn().await;
    app.create_principal(PrincipalKind::User, "jo@example.com", true, true)
        .await;
    let mut session = app.session();
    login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("jo@example.com", PASSWORD, None),
    )
    .await;
    let code = tokens::find_two_factor_token(&app.db, PrincipalKind::User, "jo@example.com")
        .await
        .unwrap()
        .unwrap()
        .token;
    let wrong = if code == "123456" { "654321" } else { "123456" };

    let result = login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("jo@example.com", PASSWORD, Some(wrong)),
    )
    .await;

    assert_eq!(result, ActionResult::error("Invalid code"));
    assert!(session.user.is_none());
    assert_eq!(two_factor_token::Entity::find().count(&app.db).await.unwrap(), 1);
}

#[tokio::test]
async fn expired_code_is_rejected_without_confirmation() {
    let app = TestApp::spawn().await;
    app.create_principal(PrincipalKind::User, "jo@example.com", true, true)
        .await;
    let mut session = app.session();
    login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("jo@example.com", PASSWORD, None),
    )
    .await;
    let token = tokens::find_two_factor_token(&app.db, PrincipalKind::User, "jo@example.com")
        .await
        .unwrap()
        .unwrap();
    let code = token.token.clone();
    let mut expired = token.into_active_model();
    expired.expires = Set(Utc::now().naive_utc() - Duration::seconds(1));
    expired.update(&app.db).await.unwrap();

    let result = login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("jo@example.com", PASSWORD, Some(&code)),
    )
    .await;

    assert_eq!(result, ActionResult::error("Code has expired"));
    assert!(session.user.is_none());
    assert_eq!(
        two_factor_confirmation::Entity::find().count(&app.db).await.unwrap(),
        0
    );
    assert_eq!(two_factor_token::Entity::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn mail_failure_is_reported_generically() {
    let app = TestApp::spawn().await;
    app.create_principal(PrincipalKind::User, "jo@example.com", true, true)
        .await;
    let state = app.with_failing_mailer();
    let mut session = app.session();

    let result = login(
        &state,
        &mut session,
        PrincipalKind::User,
        input("jo@example.com", PASSWORD, None),
    )
    .await;

    assert_eq!(result, ActionResult::error("Something went wrong"));
}

#[tokio::test]
async fn malformed_email_fails_validation() {
    let app = TestApp::spawn().await;
    let mut session = app.session();

    let result = login(
        &app.state,
        &mut session,
        PrincipalKind::User,
        input("not-an-email", PASSWORD, None),
    )
    .await;

    match result {
        ActionResult::Error { error, details } => {
            assert_eq!(error, "Invalid fields");
            assert!(details.is_some());
        }
        other => panic!("expected error, got {other:?}"),
    }
}
