mod common;

use aura_assign::{
    actions::{
        ActionResult,
        enrollments::{
            EnrollInput, StatusInput, enroll, list_for_event, list_for_user,
            set_enrollment_status,
        },
        events::{
            EventInput, Location, create_event, delete_event, list_for_organization, update_event,
        },
        profile::{ProfileInput, find_profile, save_profile},
    },
    auth::principal::Principal,
    entities::{
        enrollment, profile,
        sea_orm_active_enums::{EnrollmentStatus, PrincipalKind},
    },
};
use chrono::{NaiveDate, NaiveTime};
use common::TestApp;
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

fn event_input(name: &str) -> EventInput {
    EventInput {
        name: name.to_string(),
        description: Some("Bring gloves".to_string()),
        image_url: None,
        date: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
        time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        location: Some(Location {
            address: Some("Pier 4".to_string()),
            lat: 40.7,
            lng: -74.0,
        }),
    }
}

async fn organization_with_event(app: &TestApp) -> (Principal, Uuid) {
    let org = app
        .create_principal(PrincipalKind::Organization, "org@example.com", true, false)
        .await;
    let result = create_event(&app.state, &org, event_input("Harbor cleanup")).await;
    assert_eq!(result, ActionResult::success("Event created!"));
    let event_id = list_for_organization(&app.db, org.id).await.unwrap()[0].id;
    (org, event_id)
}

async fn user_with_profile(app: &TestApp) -> Principal {
    let user = app
        .create_principal(PrincipalKind::User, "jo@example.com", true, false)
        .await;
    let result = save_profile(
        &app.state,
        &user,
        ProfileInput {
            full_name: "Jo Doe".to_string(),
            phone: None,
            skills: Some("forklift".to_string()),
            bio: None,
        },
    )
    .await;
    assert_eq!(result, ActionResult::success("Profile saved!"));
    user
}

#[tokio::test]
async fn event_round_trip_keeps_location() {
    let app = TestApp::spawn().await;
    let (org, event_id) = organization_with_event(&app).await;

    let mut input = event_input("Harbor cleanup, day two");
    input.location = None;
    let result = update_event(&app.state, &org, event_id, input).await;
    assert_eq!(result, ActionResult::success("Event updated!"));

    let events = list_for_organization(&app.db, org.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "Harbor cleanup, day two");
    assert!(events[0].location.is_none());
}

#[tokio::test]
async fn out_of_range_latitude_is_invalid() {
    let app = TestApp::spawn().await;
    let org = app
        .create_principal(PrincipalKind::Organization, "org@example.com", true, false)
        .await;
    let mut input = event_input("Somewhere");
    input.location = Some(Location {
        address: None,
        lat: 123.0,
        lng: 0.0,
    });

    let result = create_event(&app.state, &org, input).await;

    assert!(matches!(result, ActionResult::Error { ref error, .. } if error == "Invalid fields"));
}

#[tokio::test]
async fn users_cannot_manage_events() {
    let app = TestApp::spawn().await;
    let user = app
        .create_principal(PrincipalKind::User, "jo@example.com", true, false)
        .await;

    let result = create_event(&app.state, &user, event_input("Not mine")).await;

    assert_eq!(result, ActionResult::error("Unauthorized"));
}

#[tokio::test]
async fn other_organizations_events_are_not_found() {
    let app = TestApp::spawn().await;
    let (_, event_id) = organization_with_event(&app).await;
    let rival = app
        .create_principal(PrincipalKind::Organization, "rival@example.com", true, false)
        .await;

    let result = delete_event(&app.state, &rival, event_id).await;

    assert_eq!(result, ActionResult::error("Event not found"));
    assert!(list_for_event(&app.db, &rival, event_id).await.unwrap().is_none());
}

#[tokio::test]
async fn enrolling_requires_a_profile() {
    let app = TestApp::spawn().await;
    let (_, event_id) = organization_with_event(&app).await;
    let user = app
        .create_principal(PrincipalKind::User, "jo@example.com", true, false)
        .await;

    let result = enroll(&app.state, &user, event_id, EnrollInput::default()).await;

    assert_eq!(result, ActionResult::error("Complete your profile first"));
}

#[tokio::test]
async fn enrolling_in_a_missing_event() {
    let app = TestApp::spawn().await;
    let user = user_with_profile(&app).await;

    let result = enroll(&app.state, &user, Uuid::new_v4(), EnrollInput::default()).await;

    assert_eq!(result, ActionResult::error("Event not found"));
}

#[tokio::test]
async fn saving_a_profile_twice_updates_the_same_row() {
    let app = TestApp::spawn().await;
    let user = user_with_profile(&app).await;

    let result = save_profile(
        &app.state,
        &user,
        ProfileInput {
            full_name: "Jo Q. Doe".to_string(),
            phone: Some("555-0100".to_string()),
            skills: None,
            bio: Some("Weekends only".to_string()),
        },
    )
    .await;

    assert_eq!(result, ActionResult::success("Profile saved!"));
    assert_eq!(profile::Entity::find().count(&app.db).await.unwrap(), 1);
    let saved = find_profile(&app.db, user.id).await.unwrap().unwrap();
    assert_eq!(saved.full_name, "Jo Q. Doe");
    assert_eq!(saved.phone.as_deref(), Some("555-0100"));
    assert_eq!(saved.skills, None);
    assert_eq!(saved.bio.as_deref(), Some("Weekends only"));
}

#[tokio::test]
async fn enrolling_twice_updates_the_same_row() {
    let app = TestApp::spawn().await;
    let (_, event_id) = organization_with_event(&app).await;
    let user = user_with_profile(&app).await;

    let first = enroll(&app.state, &user, event_id, EnrollInput::default()).await;
    let second = enroll(
        &app.state,
        &user,
        event_id,
        EnrollInput {
            job_details: Some("Can drive the van".to_string()),
        },
    )
    .await;

    assert_eq!(first, ActionResult::success("Enrollment submitted!"));
    assert_eq!(second, ActionResult::success("Enrollment updated!"));
    assert_eq!(enrollment::Entity::find().count(&app.db).await.unwrap(), 1);

    let mine = list_for_user(&app.db, user.id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status, EnrollmentStatus::Pending);
    assert_eq!(mine[0].job_details.as_deref(), Some("Can drive the van"));
    assert_eq!(mine[0].event.as_ref().map(|e| e.id), Some(event_id));
}

#[tokio::test]
async fn organization_reviews_applicants() {
    let app = TestApp::spawn().await;
    let (org, event_id) = organization_with_event(&app).await;
    let user = user_with_profile(&app).await;
    enroll(&app.state, &user, event_id, EnrollInput::default()).await;

    let applicants = list_for_event(&app.db, &org, event_id).await.unwrap().unwrap();
    assert_eq!(applicants.len(), 1);
    assert_eq!(applicants[0].email.as_deref(), Some("jo@example.com"));
    assert_eq!(
        applicants[0].profile.as_ref().map(|p| p.full_name.as_str()),
        Some("Jo Doe")
    );

    let result = set_enrollment_status(
        &app.state,
        &org,
        applicants[0].id,
        StatusInput {
            status: EnrollmentStatus::Approved,
        },
    )
    .await;

    assert_eq!(result, ActionResult::success("Enrollment approved!"));
    let mine = list_for_user(&app.db, user.id).await.unwrap();
    assert_eq!(mine[0].status, EnrollmentStatus::Approved);
}

#[tokio::test]
async fn rival_organization_cannot_decide_enrollment() {
    let app = TestApp::spawn().await;
    let (_, event_id) = organization_with_event(&app).await;
    let user = user_with_profile(&app).await;
    enroll(&app.state, &user, event_id, EnrollInput::default()).await;
    let enrollment_id = list_for_user(&app.db, user.id).await.unwrap()[0].id;
    let rival = app
        .create_principal(PrincipalKind::Organization, "rival@example.com", true, false)
        .await;

    let result = set_enrollment_status(
        &app.state,
        &rival,
        enrollment_id,
        StatusInput {
            status: EnrollmentStatus::Rejected,
        },
    )
    .await;

    assert_eq!(result, ActionResult::error("Enrollment not found"));
}
